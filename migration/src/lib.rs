//! Database migrations for the Invoicing API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2024_01_01_000001_create_users;
mod m2024_01_01_000002_create_roles_and_permissions;
mod m2024_01_01_000003_create_lookups;
mod m2024_01_01_000004_create_clients_and_suppliers;
mod m2024_01_01_000005_create_products;
mod m2024_01_01_000006_create_invoices;
mod m2024_01_01_000007_create_expenses;
mod m2024_01_01_000008_create_cron_tasks;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_01_01_000001_create_users::Migration),
            Box::new(m2024_01_01_000002_create_roles_and_permissions::Migration),
            Box::new(m2024_01_01_000003_create_lookups::Migration),
            Box::new(m2024_01_01_000004_create_clients_and_suppliers::Migration),
            Box::new(m2024_01_01_000005_create_products::Migration),
            Box::new(m2024_01_01_000006_create_invoices::Migration),
            Box::new(m2024_01_01_000007_create_expenses::Migration),
            Box::new(m2024_01_01_000008_create_cron_tasks::Migration),
        ]
    }
}
