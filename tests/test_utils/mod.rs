//! Test utilities for router-level integration tests.
//!
//! Builds the full application over an in-memory SQLite database with
//! migrations and RBAC seeds applied, plus users holding tokens for either
//! guard.

#![allow(dead_code)]

use std::sync::OnceLock;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use invoicing::{
    auth::{Guard, hash_password, issue_token},
    config::AppConfig,
    models::user,
    permissions::{ADMIN_ROLE, CUSTOMER_ROLE},
    repositories::{NewUser, RbacRepository, UserRepository},
    seeds::seed_roles_and_permissions,
    server::{AppState, create_app},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "password123";

// Argon2 is slow in debug builds; hash the shared password once.
fn test_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(TEST_PASSWORD).unwrap())
        .clone()
}

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// One pooled connection only: every SQLite `:memory:` connection is its
/// own database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = ON".to_string(),
    ))
    .await?;
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// A fully wired application over a fresh database
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

/// A user with a bearer token for one guard
pub struct TestUser {
    pub user: user::Model,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let db = setup_test_db().await?;
        seed_roles_and_permissions(&db).await?;

        let config = AppConfig {
            jwt_secret: "integration-test-secret-0123456789abcdef".to_string(),
            scheduler: invoicing::config::SchedulerConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let state = AppState::new(config, db);
        let router = create_app(state.clone());

        Ok(Self { state, router })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    /// Creates an active user holding `role` under `guard` and a token for it.
    pub async fn user_with_role(&self, role: &str, guard: Guard) -> Result<TestUser> {
        let user = UserRepository::new(self.db())
            .create(NewUser {
                name: "Test User".to_string(),
                email: format!("{}@example.cz", Uuid::new_v4()),
                password_hash: test_password_hash(),
                locale: "en".to_string(),
                is_active: true,
            })
            .await?;

        let rbac = RbacRepository::new(self.db());
        let role = rbac.find_or_create_role(role, guard).await?;
        rbac.assign_role(user.id, role.id).await?;

        let token = issue_token(&self.state.config, user.id, guard)?.token;
        Ok(TestUser { user, token })
    }

    /// Frontend user with the `customer` role and a `web` token
    pub async fn web_user(&self) -> Result<TestUser> {
        self.user_with_role(CUSTOMER_ROLE, Guard::Web).await
    }

    /// Administrator with the `admin` role and a `backpack` token
    pub async fn admin(&self) -> Result<TestUser> {
        self.user_with_role(ADMIN_ROLE, Guard::Backpack).await
    }

    /// Sends a request through the router and returns status and JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT_LANGUAGE, "en");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }
}
