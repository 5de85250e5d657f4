//! # Tests for Handlers
//!
//! Handler-level tests that call handlers directly with a seeded in-memory
//! database; routing and middleware are covered under `tests/`.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{Guard, Identity, hash_password};
use crate::commands::CommandRegistry;
use crate::config::AppConfig;
use crate::handlers::{health, root};
use crate::models::{ServiceInfo, user};
use crate::permissions;
use crate::repositories::test_support::setup_db;
use crate::repositories::{NewUser, UserRepository};
use crate::server::AppState;

async fn state() -> AppState {
    AppState {
        config: Arc::new(AppConfig {
            jwt_secret: "handler-tests-secret-0123456789abcdef".to_string(),
            ..Default::default()
        }),
        db: setup_db().await,
        commands: Arc::new(CommandRegistry::with_builtins()),
    }
}

async fn identity(state: &AppState, guard: Guard, granted: &[&str]) -> Identity {
    let user = UserRepository::new(&state.db)
        .create(NewUser {
            name: "Petr".to_string(),
            email: format!("{}@example.cz", Uuid::new_v4()),
            password_hash: hash_password("password123").unwrap(),
            locale: "cs".to_string(),
            is_active: true,
        })
        .await
        .unwrap();

    Identity {
        user,
        guard,
        permissions: Arc::new(granted.iter().map(|p| p.to_string()).collect::<HashSet<_>>()),
    }
}

#[tokio::test]
async fn test_root_handler_returns_expected_service_info() {
    let Json(info) = root().await;

    assert_eq!(info.service, "invoicing");
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_service_info_default() {
    let info = ServiceInfo::default();
    assert_eq!(info.service, "invoicing");
    assert!(!info.version.is_empty());
}

#[tokio::test]
async fn test_health_reports_database_ok() {
    let state = state().await;

    let (status, Json(body)) = health(State(state)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.status, "ok");
    assert_eq!(body.database, "ok");
}

#[tokio::test]
async fn test_me_lists_sorted_permissions_for_guard() {
    let state = state().await;
    let identity = identity(
        &state,
        Guard::Web,
        &[permissions::LOOKUPS_VIEW, permissions::CLIENTS_MANAGE],
    )
    .await;
    let user_id = identity.user.id;

    let Json(me) = super::auth::me(State(state), identity).await.unwrap();

    assert_eq!(me.user.id, user_id);
    assert_eq!(me.guard, Guard::Web);
    assert_eq!(me.permissions, vec!["clients.manage", "lookups.view"]);
}

#[tokio::test]
async fn test_cron_task_response_carries_expression_and_next_run() {
    let now = Utc::now();
    let task = crate::models::cron_task::Model {
        id: Uuid::new_v4(),
        name: "weekly report".to_string(),
        base_command: "system:ping".to_string(),
        command_params: None,
        frequency: "weekly".to_string(),
        custom_expression: None,
        run_at: Some("07:30".to_string()),
        day_of_week: Some(1),
        day_of_month: None,
        is_active: true,
        last_run: None,
        last_output: None,
        created_at: now.into(),
        updated_at: now.into(),
    };

    let response = super::cron_tasks::CronTaskResponse::from(task);

    assert_eq!(response.expression.as_deref(), Some("30 7 * * 1"));
    let next = response.next_run_at.unwrap();
    assert!(next > now);
    assert_eq!(next.format("%a %H:%M").to_string(), "Mon 07:30");
}

#[tokio::test]
async fn test_deleting_self_is_forbidden() {
    let state = state().await;
    let identity = identity(&state, Guard::Backpack, &[permissions::USERS_MANAGE]).await;
    let id = identity.user.id;

    let err = super::users::delete_user(State(state), identity, axum::extract::Path(id))
        .await
        .unwrap_err();

    assert_eq!(err.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_response_includes_roles() {
    let state = state().await;
    let identity = identity(&state, Guard::Backpack, &[]).await;
    let rbac = crate::repositories::RbacRepository::new(&state.db);
    let role = rbac
        .find_or_create_role(permissions::ADMIN_ROLE, Guard::Backpack)
        .await
        .unwrap();
    rbac.assign_role(identity.user.id, role.id).await.unwrap();

    let user: user::Model = identity.user;
    let response = super::users::UserResponse::load(&state.db, user).await.unwrap();

    assert_eq!(response.roles.len(), 1);
    assert_eq!(response.roles[0].name, "admin");
    assert_eq!(response.roles[0].guard_name, "backpack");
}
