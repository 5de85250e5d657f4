//! # Client Handlers
//!
//! Mounted under both `/api/clients` and `/api/admin/clients`. Web
//! identities only reach their own clients; admin identities reach all
//! of them and may assign an owner through `user_id`.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::form_context;
use super::types::{ListQuery, PaginatedResponse};
use crate::auth::Identity;
use crate::error::{ApiError, not_found};
use crate::locale::Locale;
use crate::models::client;
use crate::permissions;
use crate::repositories::ClientRepository;
use crate::requests::{ClientRequest, resolve_owner};
use crate::server::AppState;
use crate::validation::validate;

/// Client as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClientResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Novák s.r.o.")]
    pub name: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub company_id: Option<String>,
    pub vat_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<client::Model> for ClientResponse {
    fn from(model: client::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            street: model.street,
            city: model.city,
            zip: model.zip,
            country: model.country,
            company_id: model.company_id,
            vat_id: model.vat_id,
            email: model.email,
            phone: model.phone,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

async fn find_owned(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> Result<client::Model, ApiError> {
    let client = ClientRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Client"))?;
    identity.ensure_owns(client.user_id)?;
    Ok(client)
}

/// List clients
#[utoipa::path(
    get,
    path = "/api/clients",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of clients", body = PaginatedResponse<ClientResponse>),
        (status = 400, description = "Invalid limit or cursor", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<ClientResponse>>, ApiError> {
    identity.authorize(permissions::CLIENTS_MANAGE)?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = ClientRepository::new(&state.db)
        .list(identity.owner_scope(query.user_id), limit, cursor)
        .await?;

    Ok(Json(page.map(ClientResponse::from).into()))
}

/// Create a client
#[utoipa::path(
    post,
    path = "/api/clients",
    security(("bearer_auth" = [])),
    request_body = ClientRequest,
    responses(
        (status = 201, description = "Client created", body = ClientResponse),
        (status = 400, description = "Malformed JSON body", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn create_client(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ClientResponse>), ApiError> {
    identity.authorize(permissions::CLIENTS_MANAGE)?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, None);
    validate(&request, &form_context(&state, &identity, None, Some(owner)), locale).await?;

    let client = ClientRepository::new(&state.db)
        .create(owner, &request)
        .await?;
    info!(client_id = %client.id, user_id = %owner, "client created");

    Ok((StatusCode::CREATED, Json(client.into())))
}

/// Get a client by ID
#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Client UUID")),
    responses(
        (status = 200, description = "Client", body = ClientResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Client belongs to another user", body = ApiError),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn get_client(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientResponse>, ApiError> {
    identity.authorize(permissions::CLIENTS_MANAGE)?;
    let client = find_owned(&state, &identity, id).await?;
    Ok(Json(client.into()))
}

/// Replace a client
#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Client UUID")),
    request_body = ClientRequest,
    responses(
        (status = 200, description = "Client updated", body = ClientResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Client belongs to another user", body = ApiError),
        (status = 404, description = "Client not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn update_client(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> Result<Json<ClientResponse>, ApiError> {
    identity.authorize(permissions::CLIENTS_MANAGE)?;
    let existing = find_owned(&state, &identity, id).await?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, Some(existing.user_id));
    validate(&request, &form_context(&state, &identity, Some(id), Some(owner)), locale).await?;

    let client = ClientRepository::new(&state.db)
        .update(existing, owner, &request)
        .await?;
    info!(client_id = %client.id, "client updated");

    Ok(Json(client.into()))
}

/// Delete a client
#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Client UUID")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Client belongs to another user", body = ApiError),
        (status = 404, description = "Client not found", body = ApiError)
    ),
    tag = "clients"
)]
pub async fn delete_client(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::CLIENTS_MANAGE)?;
    let client = find_owned(&state, &identity, id).await?;

    ClientRepository::new(&state.db).delete(client).await?;
    info!(client_id = %id, "client deleted");

    Ok(StatusCode::NO_CONTENT)
}
