//! # Authentication Handlers
//!
//! Registration and login for the frontend (`web`) guard, login for the
//! admin (`backpack`) guard, and the current identity.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::users::UserResponse;
use crate::auth::{Guard, Identity, hash_password, issue_token, verify_password};
use crate::error::{ApiError, forbidden, unauthorized};
use crate::locale::Locale;
use crate::models::user;
use crate::permissions::CUSTOMER_ROLE;
use crate::repositories::{NewUser, RbacRepository, UserRepository};
use crate::requests::{LoginRequest, RegisterRequest, clean};
use crate::server::AppState;
use crate::validation::{RequestContext, validate};

/// Issued bearer token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    pub guard: Guard,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

/// The authenticated identity
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
    pub guard: Guard,
    /// Permission names held under `guard`, sorted
    pub permissions: Vec<String>,
}

fn guest_context(state: &AppState) -> RequestContext<'_> {
    RequestContext {
        db: &state.db,
        identity: None,
        record_id: None,
        owner_id: None,
        commands: &state.commands,
    }
}

async fn token_for(
    state: &AppState,
    user: user::Model,
    guard: Guard,
) -> Result<TokenResponse, ApiError> {
    let issued = issue_token(&state.config, user.id, guard)?;
    Ok(TokenResponse {
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        guard,
        expires_at: issued.expires_at,
        user: UserResponse::load(&state.db, user).await?,
    })
}

/// Checks credentials; every failure is the same 401.
async fn check_credentials(
    state: &AppState,
    request: &LoginRequest,
) -> Result<user::Model, ApiError> {
    let email = clean(&request.email).unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();

    let user = UserRepository::new(&state.db).find_by_email(&email).await?;
    let Some(user) = user else {
        warn!("login attempt for unknown email");
        return Err(unauthorized(Some("Invalid credentials")));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login attempt with wrong password");
        return Err(unauthorized(Some("Invalid credentials")));
    }
    if !user.is_active {
        warn!(user_id = %user.id, "login attempt for inactive user");
        return Err(unauthorized(Some("Invalid credentials")));
    }

    Ok(user)
}

/// Register a frontend account
///
/// The new user receives the `customer` role and a `web` token.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Malformed JSON body", body = ApiError),
        (status = 422, description = "Validation failed, e.g. email taken", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    locale: Locale,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let Json(request) = payload?;
    validate(&request, &guest_context(&state), locale).await?;

    let password_hash = hash_password(request.password.as_deref().unwrap_or_default())?;
    let user = UserRepository::new(&state.db)
        .create(NewUser {
            name: clean(&request.name).unwrap_or_default(),
            email: clean(&request.email).unwrap_or_default(),
            password_hash,
            locale: clean(&request.locale).unwrap_or_else(|| locale.to_string()),
            is_active: true,
        })
        .await?;

    let rbac = RbacRepository::new(&state.db);
    let role = rbac.find_or_create_role(CUSTOMER_ROLE, Guard::Web).await?;
    rbac.assign_role(user.id, role.id).await?;
    info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(token_for(&state, user, Guard::Web).await?)))
}

/// Log in to the frontend
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Web token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    locale: Locale,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    validate(&request, &guest_context(&state), locale).await?;

    let user = check_credentials(&state, &request).await?;
    info!(user_id = %user.id, guard = %Guard::Web, "user logged in");

    Ok(Json(token_for(&state, user, Guard::Web).await?))
}

/// Log in to the admin surface
///
/// Only users holding at least one `backpack` role may log in here.
#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Backpack token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 403, description = "User has no admin role", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn admin_login(
    State(state): State<AppState>,
    locale: Locale,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    validate(&request, &guest_context(&state), locale).await?;

    let user = check_credentials(&state, &request).await?;
    let allowed = RbacRepository::new(&state.db)
        .has_role_in_guard(user.id, Guard::Backpack)
        .await?;
    if !allowed {
        warn!(user_id = %user.id, "admin login refused: no backpack role");
        return Err(forbidden(Some("Admin access required")));
    }
    info!(user_id = %user.id, guard = %Guard::Backpack, "admin logged in");

    Ok(Json(token_for(&state, user, Guard::Backpack).await?))
}

/// Current identity
#[utoipa::path(
    get,
    path = "/api/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Authenticated user, guard and permissions", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<MeResponse>, ApiError> {
    let mut permissions: Vec<String> = identity.permissions.iter().cloned().collect();
    permissions.sort();

    Ok(Json(MeResponse {
        user: UserResponse::load(&state.db, identity.user).await?,
        guard: identity.guard,
        permissions,
    }))
}
