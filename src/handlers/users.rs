//! # User Handlers
//!
//! Admin user management. Passwords are hashed before storage and never
//! returned; `roles` and `permissions` replace assignments when present.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::form_context;
use super::types::{ListQuery, PaginatedResponse};
use crate::auth::{Identity, hash_password};
use crate::error::{ApiError, forbidden, not_found};
use crate::locale::Locale;
use crate::models::{role, user};
use crate::permissions;
use crate::repositories::{NewUser, RbacRepository, UserRepository};
use crate::requests::{UserRequest, clean};
use crate::server::AppState;
use crate::validation::validate;

/// Role reference embedded in user responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleRef {
    pub id: Uuid,
    pub name: String,
    pub guard_name: String,
}

impl From<role::Model> for RoleRef {
    fn from(model: role::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            guard_name: model.guard_name,
        }
    }
}

/// User as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub locale: String,
    pub is_active: bool,
    pub roles: Vec<RoleRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(model: user::Model, roles: Vec<role::Model>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            locale: model.locale,
            is_active: model.is_active,
            roles: roles.into_iter().map(RoleRef::from).collect(),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }

    /// Loads the user's roles and builds the response.
    pub async fn load(db: &DatabaseConnection, model: user::Model) -> Result<Self, ApiError> {
        let roles = RbacRepository::new(db).roles_for_user(model.id).await?;
        Ok(Self::new(model, roles))
    }
}

async fn find_user(state: &AppState, id: Uuid) -> Result<user::Model, ApiError> {
    UserRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("User"))
}

async fn sync_assignments(
    state: &AppState,
    user_id: Uuid,
    request: &UserRequest,
) -> Result<(), ApiError> {
    let rbac = RbacRepository::new(&state.db);
    if let Some(roles) = &request.roles {
        rbac.sync_user_roles(user_id, roles).await?;
    }
    if let Some(permissions) = &request.permissions {
        rbac.sync_user_permissions(user_id, permissions).await?;
    }
    Ok(())
}

/// List users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    identity.authorize(permissions::USERS_MANAGE)?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = UserRepository::new(&state.db).list(limit, cursor).await?;

    let mut data = Vec::with_capacity(page.items.len());
    for model in page.items {
        data.push(UserResponse::load(&state.db, model).await?);
    }

    Ok(Json(PaginatedResponse::new(data, page.next_cursor)))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/admin/users",
    security(("bearer_auth" = [])),
    request_body = UserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    identity.authorize(permissions::USERS_MANAGE)?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, None, None), locale).await?;

    let password_hash = hash_password(request.password.as_deref().unwrap_or_default())?;
    let user = UserRepository::new(&state.db)
        .create(NewUser {
            name: clean(&request.name).unwrap_or_default(),
            email: clean(&request.email).unwrap_or_default(),
            password_hash,
            locale: clean(&request.locale).unwrap_or_else(|| state.config.locale().to_string()),
            is_active: request.is_active.unwrap_or(true),
        })
        .await?;
    sync_assignments(&state, user.id, &request).await?;
    info!(user_id = %user.id, created_by = %identity.user.id, "user created");

    Ok((StatusCode::CREATED, Json(UserResponse::load(&state.db, user).await?)))
}

/// Get a user
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    identity.authorize(permissions::USERS_MANAGE)?;
    let user = find_user(&state, id).await?;
    Ok(Json(UserResponse::load(&state.db, user).await?))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User UUID")),
    request_body = UserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    identity.authorize(permissions::USERS_MANAGE)?;
    let existing = find_user(&state, id).await?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, Some(id), None), locale).await?;

    let password_hash = match clean(&request.password) {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };
    let user = UserRepository::new(&state.db)
        .update(existing, &request, password_hash)
        .await?;
    sync_assignments(&state, user.id, &request).await?;
    info!(user_id = %user.id, updated_by = %identity.user.id, "user updated");

    Ok(Json(UserResponse::load(&state.db, user).await?))
}

/// Delete a user
///
/// Their clients, suppliers, products, invoices and expenses are removed
/// with them.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Cannot delete the acting user", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::USERS_MANAGE)?;
    if id == identity.user.id {
        return Err(forbidden(Some("You cannot delete your own account")));
    }
    let user = find_user(&state, id).await?;

    UserRepository::new(&state.db).delete(user).await?;
    info!(user_id = %id, deleted_by = %identity.user.id, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}
