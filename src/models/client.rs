//! Client entity model
//!
//! Clients are owned by a user; web-guard identities only ever see the
//! rows whose `user_id` matches their own id.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    pub name: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,

    /// Company registration number (IČO)
    pub company_id: Option<String>,

    /// VAT identifier (DIČ)
    pub vat_id: Option<String>,

    pub email: Option<String>,
    pub phone: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Model {
    /// Single-line address copied onto invoices that outlive this client.
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
