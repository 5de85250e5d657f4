//! Permission and role names seeded for both guards.

pub const CLIENTS_MANAGE: &str = "clients.manage";
pub const SUPPLIERS_MANAGE: &str = "suppliers.manage";
pub const PRODUCTS_MANAGE: &str = "products.manage";
pub const INVOICES_MANAGE: &str = "invoices.manage";
pub const EXPENSES_MANAGE: &str = "expenses.manage";
pub const LOOKUPS_VIEW: &str = "lookups.view";
pub const TAXES_MANAGE: &str = "taxes.manage";
pub const BANKS_MANAGE: &str = "banks.manage";
pub const PAYMENT_METHODS_MANAGE: &str = "payment_methods.manage";
pub const CRON_TASKS_MANAGE: &str = "cron_tasks.manage";
pub const USERS_MANAGE: &str = "users.manage";
pub const ROLES_MANAGE: &str = "roles.manage";
pub const PERMISSIONS_MANAGE: &str = "permissions.manage";

/// Every permission, granted to the `admin` role under the `backpack` guard.
pub const ALL: [&str; 13] = [
    CLIENTS_MANAGE,
    SUPPLIERS_MANAGE,
    PRODUCTS_MANAGE,
    INVOICES_MANAGE,
    EXPENSES_MANAGE,
    LOOKUPS_VIEW,
    TAXES_MANAGE,
    BANKS_MANAGE,
    PAYMENT_METHODS_MANAGE,
    CRON_TASKS_MANAGE,
    USERS_MANAGE,
    ROLES_MANAGE,
    PERMISSIONS_MANAGE,
];

/// Frontend set, granted to the `customer` role under the `web` guard.
pub const FRONTEND: [&str; 6] = [
    CLIENTS_MANAGE,
    SUPPLIERS_MANAGE,
    PRODUCTS_MANAGE,
    INVOICES_MANAGE,
    EXPENSES_MANAGE,
    LOOKUPS_VIEW,
];

pub const ADMIN_ROLE: &str = "admin";
pub const CUSTOMER_ROLE: &str = "customer";
