//! # Server Configuration
//!
//! Router assembly for the Invoicing API. Three layers of routes:
//!
//! - public: service info, health, registration and both logins;
//! - frontend under `/api`: any authenticated identity, rows scoped to the
//!   owner for `web` identities;
//! - admin under `/api/admin`: `backpack` identities only.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{authenticate, require_admin_guard};
use crate::commands::CommandRegistry;
use crate::config::AppConfig;
use crate::handlers::{
    self, auth, clients, cron_tasks, expenses, invoices, lookups, products, rbac, suppliers, users,
};
use crate::scheduler::CronScheduler;
use crate::telemetry::trace_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub commands: Arc<CommandRegistry>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        Self {
            config: Arc::new(config),
            db,
            commands: Arc::new(CommandRegistry::with_builtins()),
        }
    }
}

/// CRUD routes for the five owned entities, mounted on both surfaces.
fn owned_entity_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/{id}",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/suppliers",
            get(suppliers::list_suppliers).post(suppliers::create_supplier),
        )
        .route(
            "/suppliers/{id}",
            get(suppliers::get_supplier)
                .put(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/invoices/{id}",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route(
            "/expenses",
            get(expenses::list_expenses).post(expenses::create_expense),
        )
        .route(
            "/expenses/{id}",
            get(expenses::get_expense)
                .put(expenses::update_expense)
                .delete(expenses::delete_expense),
        )
}

fn frontend_routes() -> Router<AppState> {
    owned_entity_routes()
        .route("/me", get(auth::me))
        .route("/taxes", get(lookups::list_taxes))
        .route("/banks", get(lookups::list_banks))
        .route("/payment-methods", get(lookups::list_payment_methods))
}

fn admin_routes() -> Router<AppState> {
    owned_entity_routes()
        .route("/taxes", get(lookups::list_taxes).post(lookups::create_tax))
        .route(
            "/taxes/{id}",
            get(lookups::get_tax)
                .put(lookups::update_tax)
                .delete(lookups::delete_tax),
        )
        .route("/banks", get(lookups::list_banks).post(lookups::create_bank))
        .route(
            "/banks/{id}",
            get(lookups::get_bank)
                .put(lookups::update_bank)
                .delete(lookups::delete_bank),
        )
        .route(
            "/payment-methods",
            get(lookups::list_payment_methods).post(lookups::create_payment_method),
        )
        .route(
            "/payment-methods/{id}",
            get(lookups::get_payment_method)
                .put(lookups::update_payment_method)
                .delete(lookups::delete_payment_method),
        )
        .route(
            "/cron-tasks",
            get(cron_tasks::list_cron_tasks).post(cron_tasks::create_cron_task),
        )
        .route("/cron-tasks/commands", get(cron_tasks::list_commands))
        .route(
            "/cron-tasks/{id}",
            get(cron_tasks::get_cron_task)
                .put(cron_tasks::update_cron_task)
                .delete(cron_tasks::delete_cron_task),
        )
        .route("/cron-tasks/{id}/run", post(cron_tasks::run_cron_task))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/roles", get(rbac::list_roles).post(rbac::create_role))
        .route(
            "/roles/{id}",
            get(rbac::get_role)
                .put(rbac::update_role)
                .delete(rbac::delete_role),
        )
        .route(
            "/permissions",
            get(rbac::list_permissions).post(rbac::create_permission),
        )
        .route(
            "/permissions/{id}",
            get(rbac::get_permission)
                .put(rbac::update_permission)
                .delete(rbac::delete_permission),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT_LANGUAGE])
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/admin/login", post(auth::admin_login));

    // Layers wrap outward: `authenticate` runs before the guard check.
    let admin = admin_routes()
        .route_layer(from_fn(require_admin_guard))
        .route_layer(from_fn_with_state(state.clone(), authenticate));
    let frontend =
        frontend_routes().route_layer(from_fn_with_state(state.clone(), authenticate));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public)
        .nest("/api", frontend)
        .nest("/api/admin", admin)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(trace_middleware))
        .layer(cors)
}

/// Starts the server with the given configuration
///
/// Runs the cron scheduler alongside the HTTP server when enabled. Both
/// stop on Ctrl+C or SIGTERM.
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(config, db);
    let config = state.config.clone();

    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(forward_shutdown_signal(shutdown.clone()));

    let scheduler = if config.scheduler.enabled {
        let scheduler =
            CronScheduler::new(config.clone(), state.db.clone(), state.commands.clone());
        Some(tokio::spawn(scheduler.run(shutdown.clone())))
    } else {
        info!("Cron scheduler disabled");
        None
    };

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, profile = %config.profile, "Server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler {
        if let Err(err) = handle.await {
            warn!(error = %err, "Cron scheduler task ended abnormally");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn forward_shutdown_signal(token: CancellationToken) {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
        _ = token.cancelled() => return,
    }

    token.cancel();
}

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::admin_login,
        crate::handlers::auth::me,
        crate::handlers::clients::list_clients,
        crate::handlers::clients::create_client,
        crate::handlers::clients::get_client,
        crate::handlers::clients::update_client,
        crate::handlers::clients::delete_client,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,
        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::invoices::list_invoices,
        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::get_invoice,
        crate::handlers::invoices::update_invoice,
        crate::handlers::invoices::delete_invoice,
        crate::handlers::expenses::list_expenses,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::get_expense,
        crate::handlers::expenses::update_expense,
        crate::handlers::expenses::delete_expense,
        crate::handlers::lookups::list_taxes,
        crate::handlers::lookups::create_tax,
        crate::handlers::lookups::get_tax,
        crate::handlers::lookups::update_tax,
        crate::handlers::lookups::delete_tax,
        crate::handlers::lookups::list_banks,
        crate::handlers::lookups::create_bank,
        crate::handlers::lookups::get_bank,
        crate::handlers::lookups::update_bank,
        crate::handlers::lookups::delete_bank,
        crate::handlers::lookups::list_payment_methods,
        crate::handlers::lookups::create_payment_method,
        crate::handlers::lookups::get_payment_method,
        crate::handlers::lookups::update_payment_method,
        crate::handlers::lookups::delete_payment_method,
        crate::handlers::cron_tasks::list_cron_tasks,
        crate::handlers::cron_tasks::list_commands,
        crate::handlers::cron_tasks::create_cron_task,
        crate::handlers::cron_tasks::get_cron_task,
        crate::handlers::cron_tasks::update_cron_task,
        crate::handlers::cron_tasks::delete_cron_task,
        crate::handlers::cron_tasks::run_cron_task,
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::rbac::list_roles,
        crate::handlers::rbac::create_role,
        crate::handlers::rbac::get_role,
        crate::handlers::rbac::update_role,
        crate::handlers::rbac::delete_role,
        crate::handlers::rbac::list_permissions,
        crate::handlers::rbac::create_permission,
        crate::handlers::rbac::get_permission,
        crate::handlers::rbac::update_permission,
        crate::handlers::rbac::delete_permission,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::auth::Guard,
            crate::locale::Locale,
            crate::cron::CronFrequency,
            crate::commands::CommandInfo,
            crate::handlers::HealthResponse,
            crate::handlers::auth::TokenResponse,
            crate::handlers::auth::MeResponse,
            crate::handlers::users::UserResponse,
            crate::handlers::users::RoleRef,
            crate::handlers::clients::ClientResponse,
            crate::handlers::suppliers::SupplierResponse,
            crate::handlers::products::ProductResponse,
            crate::handlers::invoices::InvoiceResponse,
            crate::handlers::expenses::ExpenseResponse,
            crate::handlers::lookups::TaxResponse,
            crate::handlers::lookups::BankResponse,
            crate::handlers::lookups::PaymentMethodResponse,
            crate::handlers::cron_tasks::CronTaskResponse,
            crate::handlers::cron_tasks::CronTaskRunResponse,
            crate::handlers::rbac::RoleResponse,
            crate::handlers::rbac::PermissionResponse,
            crate::requests::RegisterRequest,
            crate::requests::LoginRequest,
            crate::requests::ClientRequest,
            crate::requests::SupplierRequest,
            crate::requests::ProductRequest,
            crate::requests::InvoiceRequest,
            crate::requests::ExpenseRequest,
            crate::requests::TaxRequest,
            crate::requests::BankRequest,
            crate::requests::PaymentMethodRequest,
            crate::requests::CronTaskRequest,
            crate::requests::UserRequest,
            crate::requests::RoleRequest,
            crate::requests::PermissionRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "auth", description = "Registration, login and the current identity"),
        (name = "clients", description = "Invoice recipients"),
        (name = "suppliers", description = "Invoice issuers and their bank details"),
        (name = "products", description = "Billable items"),
        (name = "invoices", description = "Invoices"),
        (name = "expenses", description = "Recorded expenses"),
        (name = "lookups", description = "Taxes, banks and payment methods"),
        (name = "cron-tasks", description = "Scheduled commands"),
        (name = "users", description = "User administration"),
        (name = "rbac", description = "Roles and permissions per guard"),
    ),
    info(
        title = "Invoicing API",
        description = "Multi-tenant invoicing with a frontend and an admin surface",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_registers_bearer_scheme_and_both_surfaces() {
        let doc = ApiDoc::openapi();

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/clients/{id}"));
        assert!(doc.paths.paths.contains_key("/api/admin/cron-tasks/{id}/run"));
        assert!(doc.paths.paths.contains_key("/api/admin/login"));
    }

    #[test]
    fn invalid_cors_origins_are_skipped() {
        let config = AppConfig {
            cors_allowed_origins: vec![
                "https://app.example.cz".to_string(),
                "bad\norigin".to_string(),
            ],
            ..Default::default()
        };

        // Construction must not panic on the invalid entry.
        let _ = cors_layer(&config);
    }
}
