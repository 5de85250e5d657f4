//! # Expense Handlers

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::form_context;
use super::types::{ListQuery, PaginatedResponse};
use crate::auth::Identity;
use crate::error::{ApiError, not_found};
use crate::locale::Locale;
use crate::models::expense;
use crate::permissions;
use crate::repositories::ExpenseRepository;
use crate::requests::{ExpenseRequest, resolve_owner};
use crate::server::AppState;
use crate::validation::validate;

/// Expense as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub description: String,
    /// Amount in minor currency units
    pub amount: i64,
    #[schema(example = "CZK")]
    pub currency: String,
    pub spent_on: NaiveDate,
    pub tax_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<expense::Model> for ExpenseResponse {
    fn from(model: expense::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            supplier_id: model.supplier_id,
            description: model.description,
            amount: model.amount,
            currency: model.currency,
            spent_on: model.spent_on,
            tax_id: model.tax_id,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

async fn find_owned(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> Result<expense::Model, ApiError> {
    let expense = ExpenseRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Expense"))?;
    identity.ensure_owns(expense.user_id)?;
    Ok(expense)
}

/// List expenses
#[utoipa::path(
    get,
    path = "/api/expenses",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of expenses", body = PaginatedResponse<ExpenseResponse>),
        (status = 400, description = "Invalid limit or cursor", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "expenses"
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<ExpenseResponse>>, ApiError> {
    identity.authorize(permissions::EXPENSES_MANAGE)?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = ExpenseRepository::new(&state.db)
        .list(identity.owner_scope(query.user_id), limit, cursor)
        .await?;

    Ok(Json(page.map(ExpenseResponse::from).into()))
}

/// Create a expense
#[utoipa::path(
    post,
    path = "/api/expenses",
    security(("bearer_auth" = [])),
    request_body = ExpenseRequest,
    responses(
        (status = 201, description = "Expense created", body = ExpenseResponse),
        (status = 400, description = "Malformed JSON body", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "expenses"
)]
pub async fn create_expense(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<ExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    identity.authorize(permissions::EXPENSES_MANAGE)?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, None);
    validate(&request, &form_context(&state, &identity, None, Some(owner)), locale).await?;

    let expense = ExpenseRepository::new(&state.db)
        .create(owner, &request)
        .await?;
    info!(expense_id = %expense.id, user_id = %owner, "expense created");

    Ok((StatusCode::CREATED, Json(expense.into())))
}

/// Get a expense by ID
#[utoipa::path(
    get,
    path = "/api/expenses/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Expense UUID")),
    responses(
        (status = 200, description = "Expense", body = ExpenseResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Expense belongs to another user", body = ApiError),
        (status = 404, description = "Expense not found", body = ApiError)
    ),
    tag = "expenses"
)]
pub async fn get_expense(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    identity.authorize(permissions::EXPENSES_MANAGE)?;
    let expense = find_owned(&state, &identity, id).await?;
    Ok(Json(expense.into()))
}

/// Replace a expense
#[utoipa::path(
    put,
    path = "/api/expenses/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Expense UUID")),
    request_body = ExpenseRequest,
    responses(
        (status = 200, description = "Expense updated", body = ExpenseResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Expense belongs to another user", body = ApiError),
        (status = 404, description = "Expense not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "expenses"
)]
pub async fn update_expense(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<ExpenseRequest>, JsonRejection>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    identity.authorize(permissions::EXPENSES_MANAGE)?;
    let existing = find_owned(&state, &identity, id).await?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, Some(existing.user_id));
    validate(&request, &form_context(&state, &identity, Some(id), Some(owner)), locale).await?;

    let expense = ExpenseRepository::new(&state.db)
        .update(existing, owner, &request)
        .await?;
    info!(expense_id = %expense.id, "expense updated");

    Ok(Json(expense.into()))
}

/// Delete a expense
#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Expense UUID")),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Expense belongs to another user", body = ApiError),
        (status = 404, description = "Expense not found", body = ApiError)
    ),
    tag = "expenses"
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::EXPENSES_MANAGE)?;
    let expense = find_owned(&state, &identity, id).await?;

    ExpenseRepository::new(&state.db).delete(expense).await?;
    info!(expense_id = %id, "expense deleted");

    Ok(StatusCode::NO_CONTENT)
}
