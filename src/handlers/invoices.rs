//! # Invoice Handlers
//!
//! A referenced client or supplier must belong to the invoice's owner, so
//! a web identity cannot bill against another user's contacts.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::form_context;
use super::types::{PaginatedResponse, page_params};
use crate::auth::Identity;
use crate::error::{ApiError, not_found, validation_error};
use crate::locale::Locale;
use crate::models::invoice::{self, STATUSES};
use crate::permissions;
use crate::repositories::InvoiceRepository;
use crate::requests::{InvoiceRequest, resolve_owner};
use crate::server::AppState;
use crate::validation::validate;

/// Query parameters for listing invoices
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListInvoicesQuery {
    /// Maximum number of invoices to return (default: 50, max: 100)
    pub limit: Option<u64>,
    /// Opaque cursor for pagination continuation
    pub cursor: Option<String>,
    /// Restrict to one owner; honoured for admin identities only
    pub user_id: Option<Uuid>,
    /// Filter by status
    pub status: Option<String>,
}

/// Invoice as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "2024-0001")]
    pub number: String,
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub client_address: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub supplier_address: Option<String>,
    pub payment_method_id: Option<Uuid>,
    /// Total in minor currency units
    pub amount: i64,
    pub currency: String,
    pub issued_on: NaiveDate,
    pub due_in: i32,
    /// `issued_on` plus `due_in` days
    pub due_on: NaiveDate,
    pub status: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<invoice::Model> for InvoiceResponse {
    fn from(model: invoice::Model) -> Self {
        let due_on = model.due_on();
        Self {
            id: model.id,
            user_id: model.user_id,
            number: model.number,
            client_id: model.client_id,
            client_name: model.client_name,
            client_address: model.client_address,
            supplier_id: model.supplier_id,
            supplier_name: model.supplier_name,
            supplier_address: model.supplier_address,
            payment_method_id: model.payment_method_id,
            amount: model.amount,
            currency: model.currency,
            issued_on: model.issued_on,
            due_in: model.due_in,
            due_on,
            status: model.status,
            note: model.note,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

async fn find_owned(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> Result<invoice::Model, ApiError> {
    let invoice = InvoiceRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Invoice"))?;
    identity.ensure_owns(invoice.user_id)?;
    Ok(invoice)
}

/// List invoices
#[utoipa::path(
    get,
    path = "/api/invoices",
    security(("bearer_auth" = [])),
    params(ListInvoicesQuery),
    responses(
        (status = 200, description = "Page of invoices", body = PaginatedResponse<InvoiceResponse>),
        (status = 400, description = "Invalid limit or cursor", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Unknown status filter", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    query: Result<Query<ListInvoicesQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<InvoiceResponse>>, ApiError> {
    identity.authorize(permissions::INVOICES_MANAGE)?;
    let Query(query) = query?;
    let (limit, cursor) = page_params(query.limit, query.cursor.as_deref())?;

    let status = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if status.is_some_and(|s| !STATUSES.contains(&s)) {
        return Err(validation_error(
            locale.invalid_data(),
            serde_json::json!({ "status": [format!("status must be one of {}", STATUSES.join(", "))] }),
        ));
    }

    let page = InvoiceRepository::new(&state.db)
        .list(identity.owner_scope(query.user_id), status, limit, cursor)
        .await?;

    Ok(Json(page.map(InvoiceResponse::from).into()))
}

/// Create an invoice
#[utoipa::path(
    post,
    path = "/api/invoices",
    security(("bearer_auth" = [])),
    request_body = InvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = InvoiceResponse),
        (status = 400, description = "Malformed JSON body", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<InvoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    identity.authorize(permissions::INVOICES_MANAGE)?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, None);
    validate(&request, &form_context(&state, &identity, None, Some(owner)), locale).await?;

    let invoice = InvoiceRepository::new(&state.db)
        .create(owner, &request)
        .await?;
    info!(invoice_id = %invoice.id, number = %invoice.number, "invoice created");

    Ok((StatusCode::CREATED, Json(invoice.into())))
}

/// Get an invoice by ID
#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice UUID")),
    responses(
        (status = 200, description = "Invoice", body = InvoiceResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Invoice belongs to another user", body = ApiError),
        (status = 404, description = "Invoice not found", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    identity.authorize(permissions::INVOICES_MANAGE)?;
    let invoice = find_owned(&state, &identity, id).await?;
    Ok(Json(invoice.into()))
}

/// Replace an invoice
#[utoipa::path(
    put,
    path = "/api/invoices/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice UUID")),
    request_body = InvoiceRequest,
    responses(
        (status = 200, description = "Invoice updated", body = InvoiceResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Invoice belongs to another user", body = ApiError),
        (status = 404, description = "Invoice not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<InvoiceRequest>, JsonRejection>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    identity.authorize(permissions::INVOICES_MANAGE)?;
    let existing = find_owned(&state, &identity, id).await?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, Some(existing.user_id));
    validate(&request, &form_context(&state, &identity, Some(id), Some(owner)), locale).await?;

    let invoice = InvoiceRepository::new(&state.db)
        .update(existing, owner, &request)
        .await?;
    info!(invoice_id = %invoice.id, status = %invoice.status, "invoice updated");

    Ok(Json(invoice.into()))
}

/// Delete an invoice
#[utoipa::path(
    delete,
    path = "/api/invoices/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice UUID")),
    responses(
        (status = 204, description = "Invoice deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Invoice belongs to another user", body = ApiError),
        (status = 404, description = "Invoice not found", body = ApiError)
    ),
    tag = "invoices"
)]
pub async fn delete_invoice(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::INVOICES_MANAGE)?;
    let invoice = find_owned(&state, &identity, id).await?;

    InvoiceRepository::new(&state.db).delete(invoice).await?;
    info!(invoice_id = %id, "invoice deleted");

    Ok(StatusCode::NO_CONTENT)
}
