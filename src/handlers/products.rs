//! # Product Handlers

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
use crate::models::product;
use crate::permissions;
use crate::repositories::ProductRepository;
use crate::requests::{ProductRequest, resolve_owner};
use crate::server::AppState;
use crate::validation::validate;

/// Product as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Konzultace")]
    pub name: String,
    pub sku: Option<String>,
    pub unit: Option<String>,
    /// Unit price in minor currency units
    pub price: i64,
    pub tax_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            sku: model.sku,
            unit: model.unit,
            price: model.price,
            tax_id: model.tax_id,
            description: model.description,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

async fn find_owned(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> Result<product::Model, ApiError> {
    let product = ProductRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Product"))?;
    identity.ensure_owns(product.user_id)?;
    Ok(product)
}

/// List products
#[utoipa::path(
    get,
    path = "/api/products",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of products", body = PaginatedResponse<ProductResponse>),
        (status = 400, description = "Invalid limit or cursor", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<ProductResponse>>, ApiError> {
    identity.authorize(permissions::PRODUCTS_MANAGE)?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = ProductRepository::new(&state.db)
        .list(identity.owner_scope(query.user_id), limit, cursor)
        .await?;

    Ok(Json(page.map(ProductResponse::from).into()))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/products",
    security(("bearer_auth" = [])),
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Malformed JSON body", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    identity.authorize(permissions::PRODUCTS_MANAGE)?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, None);
    validate(&request, &form_context(&state, &identity, None, Some(owner)), locale).await?;

    let product = ProductRepository::new(&state.db)
        .create(owner, &request)
        .await?;
    info!(product_id = %product.id, user_id = %owner, "product created");

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Product belongs to another user", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    identity.authorize(permissions::PRODUCTS_MANAGE)?;
    let product = find_owned(&state, &identity, id).await?;
    Ok(Json(product.into()))
}

/// Replace a product
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Product belongs to another user", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    identity.authorize(permissions::PRODUCTS_MANAGE)?;
    let existing = find_owned(&state, &identity, id).await?;
    let Json(request) = payload?;

    let owner = resolve_owner(&identity, request.user_id, Some(existing.user_id));
    validate(&request, &form_context(&state, &identity, Some(id), Some(owner)), locale).await?;

    let product = ProductRepository::new(&state.db)
        .update(existing, owner, &request)
        .await?;
    info!(product_id = %product.id, "product updated");

    Ok(Json(product.into()))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Product belongs to another user", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::PRODUCTS_MANAGE)?;
    let product = find_owned(&state, &identity, id).await?;

    ProductRepository::new(&state.db).delete(product).await?;
    info!(product_id = %id, "product deleted");

    Ok(StatusCode::NO_CONTENT)
}
