//! # Authentication and Authorization
//!
//! Bearer-token authentication for the two guards: `backpack` (admin
//! surface) and `web` (frontend surface). Tokens are HS256 JWTs naming
//! the user and the guard they were issued under; the middleware resolves
//! them into an [`Identity`] carrying the permissions held under that guard.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized};
use crate::models::user;
use crate::repositories::{RbacRepository, UserRepository};
use crate::server::AppState;

/// Authentication context a token was issued under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Guard {
    /// Admin surface under `/api/admin`
    Backpack,
    /// Frontend surface under `/api`
    Web,
}

impl Guard {
    pub const ALL: [Guard; 2] = [Guard::Backpack, Guard::Web];

    pub fn as_str(self) -> &'static str {
        match self {
            Guard::Backpack => "backpack",
            Guard::Web => "web",
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Guard {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backpack" => Ok(Guard::Backpack),
            "web" => Ok(Guard::Web),
            other => Err(AuthError::UnknownGuard(other.to_string())),
        }
    }
}

/// Errors raised while issuing or checking credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("unknown guard '{0}'")]
    UnknownGuard(String),
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Token(_) => unauthorized(Some("Invalid or expired token")),
            other => anyhow::Error::new(other).into(),
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub guard: Guard,
    pub iat: i64,
    pub exp: i64,
}

/// A signed token with its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Sign a token for `user_id` under `guard`.
pub fn issue_token(config: &AppConfig, user_id: Uuid, guard: Guard) -> Result<IssuedToken, AuthError> {
    let now = Utc::now();
    let ttl = i64::try_from(config.jwt_ttl_seconds).unwrap_or(i64::MAX / 2);
    let expires_at = now + Duration::seconds(ttl);

    let claims = Claims {
        sub: user_id,
        guard,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok(IssuedToken { token, expires_at })
}

/// Verify signature and expiry and return the claims.
pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Check a password against a stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswordHash(e.to_string())),
    }
}

/// The authenticated user, the guard the request runs under, and the
/// permission names granted under that guard.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: user::Model,
    pub guard: Guard,
    pub permissions: Arc<HashSet<String>>,
}

impl Identity {
    /// Admin-guard identities see every row regardless of owner.
    pub fn is_admin(&self) -> bool {
        self.guard == Guard::Backpack
    }

    pub fn can(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// 403 unless the permission is held under the current guard.
    pub fn authorize(&self, permission: &str) -> Result<(), ApiError> {
        if self.can(permission) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user.id,
                guard = %self.guard,
                permission,
                "permission denied"
            );
            Err(forbidden(Some("Insufficient permissions")))
        }
    }

    /// 403 unless at least one of the permissions is held.
    pub fn authorize_any(&self, permissions: &[&str]) -> Result<(), ApiError> {
        match permissions.iter().find(|p| self.can(p)) {
            Some(_) => Ok(()),
            None => Err(forbidden(Some("Insufficient permissions"))),
        }
    }

    /// Row-level check: web identities may only touch their own rows.
    pub fn ensure_owns(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.is_admin() || self.user.id == owner_id {
            Ok(())
        } else {
            Err(forbidden(Some("This resource belongs to another user")))
        }
    }

    /// Owner filter for list queries: `None` means every owner.
    pub fn owner_scope(&self, requested: Option<Uuid>) -> Option<Uuid> {
        if self.is_admin() {
            requested
        } else {
            Some(self.user.id)
        }
    }
}

/// Authentication middleware resolving the bearer token into an [`Identity`]
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    let claims = decode_token(&state.config, token)?;

    let user = UserRepository::new(&state.db)
        .find_by_id(claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| unauthorized(Some("Unknown or inactive user")))?;

    let permissions = RbacRepository::new(&state.db)
        .permission_names_for_user(user.id, claims.guard)
        .await?;

    tracing::debug!(user_id = %user.id, guard = %claims.guard, "authenticated request");

    request.extensions_mut().insert(Identity {
        user,
        guard: claims.guard,
        permissions: Arc::new(permissions),
    });

    Ok(next.run(request).await)
}

/// Rejects identities that did not authenticate under the `backpack` guard.
pub async fn require_admin_guard(request: Request, next: Next) -> Result<Response, ApiError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| unauthorized(None))?;

    if !identity.is_admin() {
        return Err(forbidden(Some("Admin guard required")));
    }

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| unauthorized(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            ..Default::default()
        }
    }

    fn identity(guard: Guard, permissions: &[&str]) -> Identity {
        let now = Utc::now().into();
        Identity {
            user: user::Model {
                id: Uuid::new_v4(),
                name: "Jana".to_string(),
                email: "jana@example.com".to_string(),
                password_hash: String::new(),
                locale: "cs".to_string(),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            guard,
            permissions: Arc::new(permissions.iter().map(|p| p.to_string()).collect()),
        }
    }

    #[test]
    fn token_round_trip_keeps_guard() {
        let config = config();
        let user_id = Uuid::new_v4();

        let issued = issue_token(&config, user_id, Guard::Backpack).unwrap();
        let claims = decode_token(&config, &issued.token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.guard, Guard::Backpack);
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issued = issue_token(&config(), Uuid::new_v4(), Guard::Web).unwrap();
        let other = AppConfig {
            jwt_secret: "ffffffffffffffffffffffffffffffff".to_string(),
            ..Default::default()
        };

        assert!(decode_token(&other, &issued.token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config();
        let claims = Claims {
            sub: Uuid::new_v4(),
            guard: Guard::Web,
            iat: (Utc::now() - Duration::hours(3)).timestamp(),
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(decode_token(&config, &token).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
        assert!(verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn web_identity_is_limited_to_own_rows() {
        let web = identity(Guard::Web, &["clients.manage"]);

        assert!(web.ensure_owns(web.user.id).is_ok());
        let err = web.ensure_owns(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);
        assert_eq!(web.owner_scope(Some(Uuid::new_v4())), Some(web.user.id));
    }

    #[test]
    fn admin_identity_bypasses_ownership() {
        let admin = identity(Guard::Backpack, &["clients.manage"]);
        let other = Uuid::new_v4();

        assert!(admin.ensure_owns(other).is_ok());
        assert_eq!(admin.owner_scope(Some(other)), Some(other));
        assert_eq!(admin.owner_scope(None), None);
    }

    #[test]
    fn permissions_are_checked_by_name() {
        let web = identity(Guard::Web, &["clients.manage", "lookups.view"]);

        assert!(web.authorize("clients.manage").is_ok());
        assert!(web.authorize("users.manage").is_err());
        assert!(web.authorize_any(&["taxes.manage", "lookups.view"]).is_ok());
        assert!(web.authorize_any(&["taxes.manage"]).is_err());
    }

    #[test]
    fn guard_parses_from_str() {
        assert_eq!("backpack".parse::<Guard>().unwrap(), Guard::Backpack);
        assert_eq!("web".parse::<Guard>().unwrap(), Guard::Web);
        assert!("api".parse::<Guard>().is_err());
    }

    #[test]
    fn bearer_header_is_required() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def");
    }
}
