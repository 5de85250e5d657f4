//! # Role and Permission Handlers
//!
//! Admin management of the RBAC tables. Every role and permission belongs
//! to exactly one guard, and a role may only grant permissions of its own
//! guard.

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
use crate::auth::{Guard, Identity};
use crate::error::{ApiError, not_found, validation_error};
use crate::locale::Locale;
use crate::models::{permission, role};
use crate::permissions;
use crate::repositories::RbacRepository;
use crate::requests::{PermissionRequest, RoleRequest, clean};
use crate::server::AppState;
use crate::validation::{Validator, validate};

/// Role as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub id: Uuid,
    #[schema(example = "admin")]
    pub name: String,
    #[schema(example = "backpack")]
    pub guard_name: String,
    /// Ids of the permissions the role grants
    pub permissions: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RoleResponse {
    fn new(model: role::Model, permissions: Vec<Uuid>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            guard_name: model.guard_name,
            permissions,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Permission as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermissionResponse {
    pub id: Uuid,
    #[schema(example = "clients.manage")]
    pub name: String,
    #[schema(example = "web")]
    pub guard_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<permission::Model> for PermissionResponse {
    fn from(model: permission::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            guard_name: model.guard_name,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

// Validation has already rejected unknown guards; this only converts.
fn checked_guard(guard: Option<Guard>, locale: Locale) -> Result<Guard, ApiError> {
    guard.ok_or_else(|| {
        let mut v = Validator::new();
        let names = Guard::ALL.map(Guard::as_str).join(", ");
        v.fail("guard_name", "in", vec![("values", names)]);
        validation_error(
            locale.invalid_data(),
            serde_json::to_value(v.render(locale, &[], &[])).unwrap_or_default(),
        )
    })
}

async fn role_response(state: &AppState, role: role::Model) -> Result<RoleResponse, ApiError> {
    let permissions = RbacRepository::new(&state.db)
        .role_permission_ids(role.id)
        .await?;
    Ok(RoleResponse::new(role, permissions))
}

async fn find_role(state: &AppState, id: Uuid) -> Result<role::Model, ApiError> {
    RbacRepository::new(&state.db)
        .find_role(id)
        .await?
        .ok_or_else(|| not_found("Role"))
}

async fn find_permission(state: &AppState, id: Uuid) -> Result<permission::Model, ApiError> {
    RbacRepository::new(&state.db)
        .find_permission(id)
        .await?
        .ok_or_else(|| not_found("Permission"))
}

/// List roles
#[utoipa::path(
    get,
    path = "/api/admin/roles",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of roles", body = PaginatedResponse<RoleResponse>),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn list_roles(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<RoleResponse>>, ApiError> {
    identity.authorize(permissions::ROLES_MANAGE)?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = RbacRepository::new(&state.db).list_roles(limit, cursor).await?;

    let mut data = Vec::with_capacity(page.items.len());
    for role in page.items {
        data.push(role_response(&state, role).await?);
    }
    Ok(Json(PaginatedResponse::new(data, page.next_cursor)))
}

/// Create a role
#[utoipa::path(
    post,
    path = "/api/admin/roles",
    security(("bearer_auth" = [])),
    request_body = RoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn create_role(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoleResponse>), ApiError> {
    identity.authorize(permissions::ROLES_MANAGE)?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, None, None), locale).await?;
    let guard = checked_guard(request.guard(), locale)?;

    let rbac = RbacRepository::new(&state.db);
    let role = rbac
        .create_role(&clean(&request.name).unwrap_or_default(), guard)
        .await?;
    if let Some(permissions) = &request.permissions {
        rbac.sync_role_permissions(role.id, permissions).await?;
    }
    info!(role_id = %role.id, name = %role.name, guard = %guard, "role created");

    Ok((StatusCode::CREATED, Json(role_response(&state, role).await?)))
}

/// Get a role
#[utoipa::path(
    get,
    path = "/api/admin/roles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role UUID")),
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Role not found", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn get_role(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleResponse>, ApiError> {
    identity.authorize(permissions::ROLES_MANAGE)?;
    let role = find_role(&state, id).await?;
    Ok(Json(role_response(&state, role).await?))
}

/// Update a role
///
/// `permissions` replaces the role's grants when present.
#[utoipa::path(
    put,
    path = "/api/admin/roles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role UUID")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 404, description = "Role not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn update_role(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<Json<RoleResponse>, ApiError> {
    identity.authorize(permissions::ROLES_MANAGE)?;
    let existing = find_role(&state, id).await?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, Some(id), None), locale).await?;
    let guard = checked_guard(request.guard(), locale)?;

    let rbac = RbacRepository::new(&state.db);
    let role = rbac
        .update_role(existing, &clean(&request.name).unwrap_or_default(), guard)
        .await?;
    if let Some(permissions) = &request.permissions {
        rbac.sync_role_permissions(role.id, permissions).await?;
    }
    info!(role_id = %role.id, "role updated");

    Ok(Json(role_response(&state, role).await?))
}

/// Delete a role
#[utoipa::path(
    delete,
    path = "/api/admin/roles/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role UUID")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn delete_role(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::ROLES_MANAGE)?;
    let role = find_role(&state, id).await?;
    RbacRepository::new(&state.db).delete_role(role).await?;
    info!(role_id = %id, "role deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List permissions
#[utoipa::path(
    get,
    path = "/api/admin/permissions",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of permissions", body = PaginatedResponse<PermissionResponse>),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn list_permissions(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<PermissionResponse>>, ApiError> {
    identity.authorize(permissions::PERMISSIONS_MANAGE)?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = RbacRepository::new(&state.db)
        .list_permissions(limit, cursor)
        .await?;
    Ok(Json(page.map(PermissionResponse::from).into()))
}

/// Create a permission
#[utoipa::path(
    post,
    path = "/api/admin/permissions",
    security(("bearer_auth" = [])),
    request_body = PermissionRequest,
    responses(
        (status = 201, description = "Permission created", body = PermissionResponse),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn create_permission(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<PermissionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PermissionResponse>), ApiError> {
    identity.authorize(permissions::PERMISSIONS_MANAGE)?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, None, None), locale).await?;
    let guard = checked_guard(request.guard(), locale)?;

    let permission = RbacRepository::new(&state.db)
        .create_permission(&clean(&request.name).unwrap_or_default(), guard)
        .await?;
    info!(permission_id = %permission.id, name = %permission.name, guard = %guard, "permission created");

    Ok((StatusCode::CREATED, Json(permission.into())))
}

/// Get a permission
#[utoipa::path(
    get,
    path = "/api/admin/permissions/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Permission UUID")),
    responses(
        (status = 200, description = "Permission", body = PermissionResponse),
        (status = 404, description = "Permission not found", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn get_permission(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<PermissionResponse>, ApiError> {
    identity.authorize(permissions::PERMISSIONS_MANAGE)?;
    Ok(Json(find_permission(&state, id).await?.into()))
}

/// Update a permission
#[utoipa::path(
    put,
    path = "/api/admin/permissions/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Permission UUID")),
    request_body = PermissionRequest,
    responses(
        (status = 200, description = "Permission updated", body = PermissionResponse),
        (status = 404, description = "Permission not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn update_permission(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<PermissionRequest>, JsonRejection>,
) -> Result<Json<PermissionResponse>, ApiError> {
    identity.authorize(permissions::PERMISSIONS_MANAGE)?;
    let existing = find_permission(&state, id).await?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, Some(id), None), locale).await?;
    let guard = checked_guard(request.guard(), locale)?;

    let permission = RbacRepository::new(&state.db)
        .update_permission(existing, &clean(&request.name).unwrap_or_default(), guard)
        .await?;
    Ok(Json(permission.into()))
}

/// Delete a permission
#[utoipa::path(
    delete,
    path = "/api/admin/permissions/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Permission UUID")),
    responses(
        (status = 204, description = "Permission deleted"),
        (status = 404, description = "Permission not found", body = ApiError)
    ),
    tag = "rbac"
)]
pub async fn delete_permission(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::PERMISSIONS_MANAGE)?;
    let permission = find_permission(&state, id).await?;
    RbacRepository::new(&state.db)
        .delete_permission(permission)
        .await?;
    info!(permission_id = %id, "permission deleted");
    Ok(StatusCode::NO_CONTENT)
}
