//! Supplier entity model
//!
//! Same shape as a client plus banking details.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub name: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub company_id: Option<String>,
    pub vat_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,

    /// Domestic account number; requires `bank_code`
    pub account_number: Option<String>,

    /// Four-digit code of a row in `banks`
    pub bank_code: Option<String>,

    /// International account number; requires `swift`
    pub iban: Option<String>,

    pub swift: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Model {
    /// Single-line address copied onto invoices that outlive this supplier.
    pub fn postal_address(&self) -> String {
        super::postal_address(
            &self.name,
            self.street.as_deref(),
            self.zip.as_deref(),
            self.city.as_deref(),
            self.country.as_deref(),
        )
    }
}

impl ActiveModelBehavior for ActiveModel {}
