//! Database seeding functionality
//!
//! Seeds the guard-scoped roles and permissions the API checks, a handful
//! of common lookup rows, and optionally a bootstrap administrator. Every
//! seeder is idempotent and safe to run on each deploy.

pub mod lookups;
pub mod rbac;

use anyhow::Result;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

pub use lookups::seed_lookups;
pub use rbac::{seed_admin, seed_roles_and_permissions};

/// Runs every seeder in dependency order.
pub async fn seed_all(db: &DatabaseConnection, config: &AppConfig) -> Result<()> {
    seed_roles_and_permissions(db).await?;
    seed_lookups(db).await?;
    seed_admin(db, config).await?;
    log::info!("Database seeding completed successfully");
    Ok(())
}
