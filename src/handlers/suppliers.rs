//! # Supplier Handlers
//!
//! Same access rules as clients. Bank details are checked in pairs:
//! an account number needs a bank code and an IBAN needs a SWIFT code.

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
use crate::models::supplier;
use crate::permissions;
use crate::repositories::SupplierRepository;
use crate::requests::{SupplierRequest, resolve_owner};
use crate::server::AppState;
use crate::validation::validate;

/// Supplier as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SupplierResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Dodavatel a.s.")]
    pub name: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub company_id: Option<String>,
    pub vat_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub account_number: Option<String>,
    pub bank_code: Option<String>,
    pub iban: Option<String>,
    pub swift: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<supplier::Model> for SupplierResponse {
    fn from(model: supplier::Model) -> Self {
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
            account_number: model.account_number,
            bank_code: model.bank_code,
            iban: model.iban,
            swift: model.swift,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

async fn find_owned(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> Result<supplier::Model, ApiError> {
    let supplier = SupplierRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Supplier"))?;
    identity.ensure_owns(supplier.user_id)?;
    Ok(supplier)
}

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/suppliers",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of suppliers", body = PaginatedResponse<SupplierResponse>),
        (status = 400, description = "Invalid limit or cursor", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<SupplierResponse>>, ApiError> {
    identity.authorize(permissions::SUPPLIERS_MANAGE)?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = SupplierRepository::new(&state.db)
        .list(identity.owner_scope(query.user_id), limit, cursor)
        .await?;

    Ok(Json(page.map(SupplierResponse::from).into()))
}

/// Create a supplier
#[utoipa::path(
    post,
    path = "/api/suppliers",
    security(("bearer_auth" = [])),
    request_body = SupplierRequest,
    responses(
        (status = 201, description = "Supplier created", body = SupplierResponse),
        (status = 400, description = "Malformed JSON body", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<SupplierRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SupplierResponse>), ApiError> {
    identity.authorize(permissions::SUPPLIERS_MANAGE)?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, None);
    validate(&request, &form_context(&state, &identity, None, Some(owner)), locale).await?;

    let supplier = SupplierRepository::new(&state.db)
        .create(owner, &request)
        .await?;
    info!(supplier_id = %supplier.id, user_id = %owner, "supplier created");

    Ok((StatusCode::CREATED, Json(supplier.into())))
}

/// Get a supplier by ID
#[utoipa::path(
    get,
    path = "/api/suppliers/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Supplier UUID")),
    responses(
        (status = 200, description = "Supplier", body = SupplierResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Supplier belongs to another user", body = ApiError),
        (status = 404, description = "Supplier not found", body = ApiError)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<SupplierResponse>, ApiError> {
    identity.authorize(permissions::SUPPLIERS_MANAGE)?;
    let supplier = find_owned(&state, &identity, id).await?;
    Ok(Json(supplier.into()))
}

/// Replace a supplier
#[utoipa::path(
    put,
    path = "/api/suppliers/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Supplier UUID")),
    request_body = SupplierRequest,
    responses(
        (status = 200, description = "Supplier updated", body = SupplierResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Supplier belongs to another user", body = ApiError),
        (status = 404, description = "Supplier not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<SupplierRequest>, JsonRejection>,
) -> Result<Json<SupplierResponse>, ApiError> {
    identity.authorize(permissions::SUPPLIERS_MANAGE)?;
    let existing = find_owned(&state, &identity, id).await?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, Some(existing.user_id));
    validate(&request, &form_context(&state, &identity, Some(id), Some(owner)), locale).await?;

    let supplier = SupplierRepository::new(&state.db)
        .update(existing, owner, &request)
        .await?;
    info!(supplier_id = %supplier.id, "supplier updated");

    Ok(Json(supplier.into()))
}

/// Delete a supplier
#[utoipa::path(
    delete,
    path = "/api/suppliers/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Supplier UUID")),
    responses(
        (status = 204, description = "Supplier deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Supplier belongs to another user", body = ApiError),
        (status = 404, description = "Supplier not found", body = ApiError)
    ),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::SUPPLIERS_MANAGE)?;
    let supplier = find_owned(&state, &identity, id).await?;

    SupplierRepository::new(&state.db).delete(supplier).await?;
    info!(supplier_id = %id, "supplier deleted");

    Ok(StatusCode::NO_CONTENT)
}
