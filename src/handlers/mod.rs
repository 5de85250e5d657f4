//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the Invoicing API.
//! The frontend (`/api`) and admin (`/api/admin`) surfaces share handlers;
//! what an identity may see is decided by its guard.

pub mod auth;
pub mod clients;
pub mod cron_tasks;
pub mod expenses;
pub mod invoices;
pub mod lookups;
pub mod products;
pub mod rbac;
pub mod suppliers;
pub mod types;
pub mod users;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Identity;
use crate::db;
use crate::models::ServiceInfo;
use crate::server::AppState;
use crate::validation::RequestContext;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Health probe response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "ok")]
    pub database: String,
}

/// Liveness and database reachability
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match db::health_check(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                database: "ok".to_string(),
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded".to_string(),
                    database: "unreachable".to_string(),
                }),
            )
        }
    }
}

/// Validation context for a write by an authenticated identity.
pub(crate) fn form_context<'a>(
    state: &'a AppState,
    identity: &'a Identity,
    record_id: Option<Uuid>,
    owner_id: Option<Uuid>,
) -> RequestContext<'a> {
    RequestContext {
        db: &state.db,
        identity: Some(identity),
        record_id,
        owner_id,
        commands: &state.commands,
    }
}

#[cfg(test)]
mod tests;
