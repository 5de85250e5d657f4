//! # Cron Task Handlers
//!
//! Admin CRUD for scheduled commands, plus an endpoint that runs a task
//! immediately and one that lists the commands tasks may invoke.

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
use crate::commands::CommandInfo;
use crate::cron;
use crate::error::{ApiError, not_found};
use crate::locale::Locale;
use crate::models::cron_task;
use crate::permissions;
use crate::repositories::CronTaskRepository;
use crate::requests::CronTaskRequest;
use crate::scheduler;
use crate::server::AppState;
use crate::validation::validate;

/// Cron task as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CronTaskResponse {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "invoices:mark-overdue")]
    pub base_command: String,
    pub command_params: Option<String>,
    #[schema(example = "daily")]
    pub frequency: String,
    pub custom_expression: Option<String>,
    pub run_at: Option<String>,
    pub day_of_week: Option<i16>,
    pub day_of_month: Option<i16>,
    pub is_active: bool,
    /// Effective five-field expression
    #[schema(example = "0 6 * * *")]
    pub expression: Option<String>,
    /// Next fire time after the last run, in UTC
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    pub last_output: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<cron_task::Model> for CronTaskResponse {
    fn from(model: cron_task::Model) -> Self {
        let expression = cron::expression_for(&model).ok();
        let since = model
            .last_run
            .unwrap_or(model.created_at)
            .with_timezone(&Utc)
            .max(Utc::now());
        let next_run_at = expression
            .as_deref()
            .and_then(|e| cron::next_run_after(e, since).ok().flatten());

        Self {
            id: model.id,
            name: model.name,
            base_command: model.base_command,
            command_params: model.command_params,
            frequency: model.frequency,
            custom_expression: model.custom_expression,
            run_at: model.run_at,
            day_of_week: model.day_of_week,
            day_of_month: model.day_of_month,
            is_active: model.is_active,
            expression,
            next_run_at,
            last_run: model.last_run.map(|t| t.with_timezone(&Utc)),
            last_output: model.last_output,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Result of a manual run
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CronTaskRunResponse {
    pub succeeded: bool,
    pub task: CronTaskResponse,
}

async fn find_task(state: &AppState, id: Uuid) -> Result<cron_task::Model, ApiError> {
    CronTaskRepository::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Cron task"))
}

/// List cron tasks
#[utoipa::path(
    get,
    path = "/api/admin/cron-tasks",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of cron tasks", body = PaginatedResponse<CronTaskResponse>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "cron-tasks"
)]
pub async fn list_cron_tasks(
    State(state): State<AppState>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<CronTaskResponse>>, ApiError> {
    identity.authorize(permissions::CRON_TASKS_MANAGE)?;
    let Query(query) = query?;
    let (limit, cursor) = query.page()?;

    let page = CronTaskRepository::new(&state.db).list(limit, cursor).await?;
    Ok(Json(page.map(CronTaskResponse::from).into()))
}

/// List commands a cron task may run
#[utoipa::path(
    get,
    path = "/api/admin/cron-tasks/commands",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registered commands", body = [CommandInfo]),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "cron-tasks"
)]
pub async fn list_commands(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<CommandInfo>>, ApiError> {
    identity.authorize(permissions::CRON_TASKS_MANAGE)?;
    Ok(Json(state.commands.list()))
}

/// Create a cron task
#[utoipa::path(
    post,
    path = "/api/admin/cron-tasks",
    security(("bearer_auth" = [])),
    request_body = CronTaskRequest,
    responses(
        (status = 201, description = "Cron task created", body = CronTaskResponse),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 422, description = "Validation failed, e.g. malformed custom expression", body = ApiError)
    ),
    tag = "cron-tasks"
)]
pub async fn create_cron_task(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    payload: Result<Json<CronTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CronTaskResponse>), ApiError> {
    identity.authorize(permissions::CRON_TASKS_MANAGE)?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, None, None), locale).await?;

    let task = CronTaskRepository::new(&state.db).create(&request).await?;
    info!(task_id = %task.id, command = %task.base_command, frequency = %task.frequency, "cron task created");
    Ok((StatusCode::CREATED, Json(task.into())))
}

/// Get a cron task
#[utoipa::path(
    get,
    path = "/api/admin/cron-tasks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Cron task UUID")),
    responses(
        (status = 200, description = "Cron task", body = CronTaskResponse),
        (status = 404, description = "Cron task not found", body = ApiError)
    ),
    tag = "cron-tasks"
)]
pub async fn get_cron_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<CronTaskResponse>, ApiError> {
    identity.authorize(permissions::CRON_TASKS_MANAGE)?;
    Ok(Json(find_task(&state, id).await?.into()))
}

/// Replace a cron task
#[utoipa::path(
    put,
    path = "/api/admin/cron-tasks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Cron task UUID")),
    request_body = CronTaskRequest,
    responses(
        (status = 200, description = "Cron task updated", body = CronTaskResponse),
        (status = 404, description = "Cron task not found", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    ),
    tag = "cron-tasks"
)]
pub async fn update_cron_task(
    State(state): State<AppState>,
    identity: Identity,
    locale: Locale,
    Path(id): Path<Uuid>,
    payload: Result<Json<CronTaskRequest>, JsonRejection>,
) -> Result<Json<CronTaskResponse>, ApiError> {
    identity.authorize(permissions::CRON_TASKS_MANAGE)?;
    let existing = find_task(&state, id).await?;
    let Json(request) = payload?;
    validate(&request, &form_context(&state, &identity, Some(id), None), locale).await?;

    let task = CronTaskRepository::new(&state.db)
        .update(existing, &request)
        .await?;
    info!(task_id = %task.id, "cron task updated");
    Ok(Json(task.into()))
}

/// Delete a cron task
#[utoipa::path(
    delete,
    path = "/api/admin/cron-tasks/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Cron task UUID")),
    responses(
        (status = 204, description = "Cron task deleted"),
        (status = 404, description = "Cron task not found", body = ApiError)
    ),
    tag = "cron-tasks"
)]
pub async fn delete_cron_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    identity.authorize(permissions::CRON_TASKS_MANAGE)?;
    let task = find_task(&state, id).await?;
    CronTaskRepository::new(&state.db).delete(task).await?;
    info!(task_id = %id, "cron task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Run a cron task now
///
/// Runs regardless of schedule or `is_active`. A failing command still
/// answers 200 with `succeeded: false` and the error in `last_output`.
#[utoipa::path(
    post,
    path = "/api/admin/cron-tasks/{id}/run",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Cron task UUID")),
    responses(
        (status = 200, description = "Task executed", body = CronTaskRunResponse),
        (status = 404, description = "Cron task not found", body = ApiError)
    ),
    tag = "cron-tasks"
)]
pub async fn run_cron_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<CronTaskRunResponse>, ApiError> {
    identity.authorize(permissions::CRON_TASKS_MANAGE)?;
    let task = find_task(&state, id).await?;

    info!(task_id = %id, user_id = %identity.user.id, "manual cron task run");
    let outcome = scheduler::run_task(&state.db, &state.commands, task).await?;

    Ok(Json(CronTaskRunResponse {
        succeeded: outcome.succeeded,
        task: outcome.task.into(),
    }))
}
