//! User entity model
//!
//! Users authenticate under the `web` guard or, when they hold a
//! `backpack` role, under the admin guard.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Login identifier, unique across all users
    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    /// Preferred locale for validation messages (`cs`, `sk`, `en`)
    pub locale: String,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
