//! # Lookup Handlers
//!
//! Taxes, banks and payment methods. Listing is open to any identity with
//! `lookups.view` (or the matching manage permission); writes are admin-only
//! and mounted under `/api/admin`.

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
use crate::models::{bank, payment_method, tax};
use crate::permissions;
use crate::repositories::{BankRepository, PaymentMethodRepository, TaxRepository};
use crate::requests::{BankRequest, PaymentMethodRequest, TaxRequest};
use crate::server::AppState;
use crate::validation::validate;

/// Tax rate as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaxResponse {
    pub id: Uuid,
    pub name: String,
    /// Whole percent
    pub rate: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<tax::Model> for TaxResponse {
    fn from(model: tax::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            rate: model.rate,
            is_default: model.is_default,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Bank as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BankResponse {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "0800")]
    pub code: String,
    pub swift: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<bank::Model> for BankResponse {
    fn from(model: bank::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            swift: model.swift,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Payment method as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentMethodResponse {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "bank_transfer")]
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<payment_method::Model> for PaymentMethodResponse {
    fn from(model: payment_method::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

// Taxes

/// List tax rates
#[utoipa::path(
    get,
    path = "/api/taxes",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of tax rates", body = PaginatedResponse<TaxResponse>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn list_taxes(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<TaxResponse>>, ApiError> {
    identity.authorize_any(&[permissions::LOOKUPS_VIEW, permissions::TAXES_MANAGE])?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = TaxRepository::new(&state.db).list(limit, cursor).await?;
    Ok(Json(page.map(TaxResponse::from).into()))
}

/// Create a tax rate
#[utoipa::path(
    post,
    path = "/api/admin/taxes",
    security(("bearer_auth" = [])),
    request_body = TaxRequest,
    responses(
        (status = 201, description = "Tax rate created", body = TaxResponse),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn create_tax(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<TaxRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaxResponse>), ApiError> {
    identity.authorize(permissions::TAXES_MANAGE)?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, None, None), locale).await?;

    let tax = TaxRepository::new(&state.db).save(None, &request).await?;
    info!(tax_id = %tax.id, rate = tax.rate, "tax rate created");
    Ok((StatusCode::CREATED, Json(tax.into())))
}

/// Get a tax rate
#[utoipa::path(
    get,
    path = "/api/admin/taxes/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tax UUID")),
    responses(
        (status = 200, description = "Tax rate", body = TaxResponse),
        (status = 404, description = "Tax rate not found", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn get_tax(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<TaxResponse>, ApiError> {
    identity.authorize(permissions::TAXES_MANAGE)?;
    let tax = TaxRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Tax"))?;
    Ok(Json(tax.into()))
}

/// Replace a tax rate
#[utoipa::path(
    put,
    path = "/api/admin/taxes/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tax UUID")),
    request_body = TaxRequest,
    responses(
        (status = 200, description = "Tax rate updated", body = TaxResponse),
        (status = 404, description = "Tax rate not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn update_tax(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<TaxRequest>, JsonRejection>,
) -> Result<Json<TaxResponse>, ApiError> {
    identity.authorize(permissions::TAXES_MANAGE)?;
    let repo = TaxRepository::new(&state.db);
    let existing = repo.find_by_id(id).await?.ok_or_else(|| not_found("Tax"))?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, Some(id), None), locale).await?;

    let tax = repo.save(Some(existing), &request).await?;
    Ok(Json(tax.into()))
}

/// Delete a tax rate
#[utoipa::path(
    delete,
    path = "/api/admin/taxes/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Tax UUID")),
    responses(
        (status = 204, description = "Tax rate deleted"),
        (status = 404, description = "Tax rate not found", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn delete_tax(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::TAXES_MANAGE)?;
    let repo = TaxRepository::new(&state.db);
    let tax = repo.find_by_id(id).await?.ok_or_else(|| not_found("Tax"))?;
    repo.delete(tax).await?;
    info!(tax_id = %id, "tax rate deleted");
    Ok(StatusCode::NO_CONTENT)
}

// Banks

/// List banks
#[utoipa::path(
    get,
    path = "/api/banks",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of banks", body = PaginatedResponse<BankResponse>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn list_banks(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<BankResponse>>, ApiError> {
    identity.authorize_any(&[permissions::LOOKUPS_VIEW, permissions::BANKS_MANAGE])?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = BankRepository::new(&state.db).list(limit, cursor).await?;
    Ok(Json(page.map(BankResponse::from).into()))
}

/// Create a bank
#[utoipa::path(
    post,
    path = "/api/admin/banks",
    security(("bearer_auth" = [])),
    request_body = BankRequest,
    responses(
        (status = 201, description = "Bank created", body = BankResponse),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed, e.g. duplicate code", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn create_bank(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<BankRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BankResponse>), ApiError> {
    identity.authorize(permissions::BANKS_MANAGE)?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, None, None), locale).await?;

    let bank = BankRepository::new(&state.db).create(&request).await?;
    info!(bank_id = %bank.id, code = %bank.code, "bank created");
    Ok((StatusCode::CREATED, Json(bank.into())))
}

/// Get a bank
#[utoipa::path(
    get,
    path = "/api/admin/banks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Bank UUID")),
    responses(
        (status = 200, description = "Bank", body = BankResponse),
        (status = 404, description = "Bank not found", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn get_bank(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<BankResponse>, ApiError> {
    identity.authorize(permissions::BANKS_MANAGE)?;
    let bank = BankRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Bank"))?;
    Ok(Json(bank.into()))
}

/// Replace a bank
#[utoipa::path(
    put,
    path = "/api/admin/banks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Bank UUID")),
    request_body = BankRequest,
    responses(
        (status = 200, description = "Bank updated", body = BankResponse),
        (status = 404, description = "Bank not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn update_bank(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<BankRequest>, JsonRejection>,
) -> Result<Json<BankResponse>, ApiError> {
    identity.authorize(permissions::BANKS_MANAGE)?;
    let repo = BankRepository::new(&state.db);
    let existing = repo.find_by_id(id).await?.ok_or_else(|| not_found("Bank"))?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, Some(id), None), locale).await?;

    let bank = repo.update(existing, &request).await?;
    Ok(Json(bank.into()))
}

/// Delete a bank
#[utoipa::path(
    delete,
    path = "/api/admin/banks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Bank UUID")),
    responses(
        (status = 204, description = "Bank deleted"),
        (status = 404, description = "Bank not found", body = ApiError),
        (status = 409, description = "Bank code still used by suppliers", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn delete_bank(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::BANKS_MANAGE)?;
    let repo = BankRepository::new(&state.db);
    let bank = repo.find_by_id(id).await?.ok_or_else(|| not_found("Bank"))?;
    if repo.supplier_count(&bank).await? > 0 {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "BANK_IN_USE",
            format!("Bank {} is still used by suppliers", bank.code),
        ));
    }
    repo.delete(bank).await?;
    info!(bank_id = %id, "bank deleted");
    Ok(StatusCode::NO_CONTENT)
}

// Payment methods

/// List payment methods
#[utoipa::path(
    get,
    path = "/api/payment-methods",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of payment methods", body = PaginatedResponse<PaymentMethodResponse>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn list_payment_methods(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<PaymentMethodResponse>>, ApiError> {
    identity.authorize_any(&[
        permissions::LOOKUPS_VIEW,
        permissions::PAYMENT_METHODS_MANAGE,
    ])?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = PaymentMethodRepository::new(&state.db)
        .list(limit, cursor)
        .await?;
    Ok(Json(page.map(PaymentMethodResponse::from).into()))
}

/// Create a payment method
#[utoipa::path(
    post,
    path = "/api/admin/payment-methods",
    security(("bearer_auth" = [])),
    request_body = PaymentMethodRequest,
    responses(
        (status = 201, description = "Payment method created", body = PaymentMethodResponse),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn create_payment_method(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<PaymentMethodRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentMethodResponse>), ApiError> {
    identity.authorize(permissions::PAYMENT_METHODS_MANAGE)?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, None, None), locale).await?;

    let method = PaymentMethodRepository::new(&state.db)
        .create(&request)
        .await?;
    info!(payment_method_id = %method.id, code = %method.code, "payment method created");
    Ok((StatusCode::CREATED, Json(method.into())))
}

/// Get a payment method
#[utoipa::path(
    get,
    path = "/api/admin/payment-methods/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Payment method UUID")),
    responses(
        (status = 200, description = "Payment method", body = PaymentMethodResponse),
        (status = 404, description = "Payment method not found", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn get_payment_method(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentMethodResponse>, ApiError> {
    identity.authorize(permissions::PAYMENT_METHODS_MANAGE)?;
    let method = PaymentMethodRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Payment method"))?;
    Ok(Json(method.into()))
}

/// Replace a payment method
#[utoipa::path(
    put,
    path = "/api/admin/payment-methods/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Payment method UUID")),
    request_body = PaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method updated", body = PaymentMethodResponse),
        (status = 404, description = "Payment method not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn update_payment_method(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<PaymentMethodRequest>, JsonRejection>,
) -> Result<Json<PaymentMethodResponse>, ApiError> {
    identity.authorize(permissions::PAYMENT_METHODS_MANAGE)?;
    let repo = PaymentMethodRepository::new(&state.db);
    let existing = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Payment method"))?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, Some(id), None), locale).await?;

    let method = repo.update(existing, &request).await?;
    Ok(Json(method.into()))
}

/// Delete a payment method
#[utoipa::path(
    delete,
    path = "/api/admin/payment-methods/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Payment method UUID")),
    responses(
        (status = 204, description = "Payment method deleted"),
        (status = 404, description = "Payment method not found", body = ApiError)
    ),
    tag = "lookups"
)]
pub async fn delete_payment_method(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::PAYMENT_METHODS_MANAGE)?;
    let repo = PaymentMethodRepository::new(&state.db);
    let method = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Payment method"))?;
    repo.delete(method).await?;
    info!(payment_method_id = %id, "payment method deleted");
    Ok(StatusCode::NO_CONTENT)
}
