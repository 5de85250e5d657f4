//! Validated request payloads, one per entity.
//!
//! The admin and frontend surfaces share these types; what differs is
//! driven by the acting guard through [`RequestContext`].

pub mod auth;
pub mod cron_task;
pub mod expense;
pub mod invoice;
pub mod lookups;
pub mod party;
pub mod product;
pub mod rbac;
pub mod user;

use std::sync::LazyLock;

use regex::Regex;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::auth::Identity;
use crate::models::user as user_model;
use crate::validation::{RequestContext, Validator};

pub use auth::{LoginRequest, RegisterRequest};
pub use cron_task::CronTaskRequest;
pub use expense::ExpenseRequest;
pub use invoice::InvoiceRequest;
pub use lookups::{BankRequest, PaymentMethodRequest, TaxRequest};
pub use party::{ClientRequest, PartyFields, SupplierRequest};
pub use product::ProductRequest;
pub use rbac::{PermissionRequest, RoleRequest};
pub use user::UserRequest;

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("request field pattern is a valid regex")
}

pub(crate) static COMPANY_ID: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\d{8}$"));
pub(crate) static VAT_ID: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[A-Z]{2}[0-9A-Z]{2,12}$"));
pub(crate) static COUNTRY: LazyLock<Regex> = LazyLock::new(|| pattern(r"^[A-Z]{2}$"));
pub(crate) static PHONE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\+?[0-9 ]{6,20}$"));
pub(crate) static ACCOUNT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^(\d{1,6}-)?\d{2,10}$"));
pub(crate) static BANK_CODE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\d{4}$"));
pub(crate) static IBAN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^[A-Z]{2}\d{2}[A-Z0-9]{11,30}$"));
pub(crate) static SWIFT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^[A-Z]{6}[A-Z0-9]{2}([A-Z0-9]{3})?$"));
pub(crate) static SLUG: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^[a-z0-9]+(?:[-_][a-z0-9]+)*$"));
pub(crate) static PERMISSION_NAME: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^[a-z_]+(?:\.[a-z_]+)*$"));

/// Trimmed value, with blank strings treated as absent.
pub fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Owner of an owned row. Web identities always own what they write; admin
/// identities may pick `user_id`, falling back to the existing owner and
/// then to themselves.
pub fn resolve_owner(identity: &Identity, requested: Option<Uuid>, existing: Option<Uuid>) -> Uuid {
    if identity.is_admin() {
        requested.or(existing).unwrap_or(identity.user.id)
    } else {
        identity.user.id
    }
}

/// An admin-supplied `user_id` must reference a user.
pub(crate) async fn owner_rules(
    ctx: &RequestContext<'_>,
    v: &mut Validator,
    user_id: Option<Uuid>,
) -> Result<(), DbErr> {
    if !ctx.is_admin() {
        return Ok(());
    }
    v.exists::<user_model::Entity, Uuid>(ctx.db, "user_id", user_model::Column::Id, user_id, None)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_trims_and_drops_blank() {
        assert_eq!(clean(&Some("  Praha ".to_string())), Some("Praha".to_string()));
        assert_eq!(clean(&Some("   ".to_string())), None);
        assert_eq!(clean(&None), None);
    }

    #[test]
    fn field_patterns() {
        assert!(COMPANY_ID.is_match("27082440"));
        assert!(!COMPANY_ID.is_match("2708244"));
        assert!(VAT_ID.is_match("CZ27082440"));
        assert!(ACCOUNT_NUMBER.is_match("19-2000145399"));
        assert!(ACCOUNT_NUMBER.is_match("2000145399"));
        assert!(!ACCOUNT_NUMBER.is_match("abc"));
        assert!(BANK_CODE.is_match("0800"));
        assert!(!BANK_CODE.is_match("800"));
        assert!(IBAN.is_match("CZ6508000000192000145399"));
        assert!(SWIFT.is_match("GIBACZPX"));
        assert!(SWIFT.is_match("GIBACZPXXXX"));
        assert!(!SWIFT.is_match("GIBA"));
        assert!(SLUG.is_match("bank_transfer"));
        assert!(!SLUG.is_match("Bank Transfer"));
        assert!(PERMISSION_NAME.is_match("clients.manage"));
    }
}
