//! Invoice entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{Date, DateTimeWithTimeZone};

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_ISSUED: &str = "issued";
pub const STATUS_OVERDUE: &str = "overdue";

/// Accepted values of `status`.
pub const STATUSES: [&str; 5] = ["draft", "issued", "paid", "overdue", "cancelled"];

/// Accepted values of `currency`, shared with expenses.
pub const CURRENCIES: [&str; 3] = ["CZK", "EUR", "USD"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    /// Invoice number, unique per owner
    pub number: String,

    pub client_id: Option<Uuid>,
    /// Inline client name used when `client_id` is absent
    pub client_name: Option<String>,
    pub client_address: Option<String>,

    pub supplier_id: Option<Uuid>,
    /// Inline supplier name used when `supplier_id` is absent
    pub supplier_name: Option<String>,
    pub supplier_address: Option<String>,

    pub payment_method_id: Option<Uuid>,

    /// Total in minor currency units
    pub amount: i64,

    /// ISO 4217 code
    pub currency: String,

    pub issued_on: Date,

    /// Payment term in days counted from `issued_on`
    pub due_in: i32,

    /// One of `draft`, `issued`, `paid`, `overdue`, `cancelled`
    pub status: String,

    pub note: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Last day the invoice may be paid without becoming overdue.
    pub fn due_on(&self) -> Date {
        self.issued_on + chrono::Duration::days(i64::from(self.due_in))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
