//! # Data Models
//!
//! This module contains all the data models used throughout the Invoicing API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod bank;
pub mod client;
pub mod cron_task;
pub mod expense;
pub mod invoice;
pub mod payment_method;
pub mod permission;
pub mod product;
pub mod role;
pub mod role_permission;
pub mod supplier;
pub mod tax;
pub mod user;
pub mod user_permission;
pub mod user_role;

pub use bank::Entity as Bank;
pub use client::Entity as Client;
pub use cron_task::Entity as CronTask;
pub use expense::Entity as Expense;
pub use invoice::Entity as Invoice;
pub use payment_method::Entity as PaymentMethod;
pub use permission::Entity as Permission;
pub use product::Entity as Product;
pub use role::Entity as Role;
pub use supplier::Entity as Supplier;
pub use tax::Entity as Tax;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "invoicing".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Joins the present address parts as `street, zip city, country`, falling
/// back to `name` when the party has no address on file.
pub(crate) fn postal_address(
    name: &str,
    street: Option<&str>,
    zip: Option<&str>,
    city: Option<&str>,
    country: Option<&str>,
) -> String {
    let locality = [zip, city].into_iter().flatten().collect::<Vec<_>>().join(" ");
    let parts: Vec<&str> = [street, Some(locality.as_str()), country]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        name.to_string()
    } else {
        parts.join(", ")
    }
}
