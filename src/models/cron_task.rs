//! CronTask entity model
//!
//! Stores the editable frequency of a scheduled command. The effective
//! CRON expression is derived with [`crate::cron::expression_for`].

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cron_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Name of a registered command, e.g. `invoices:mark-overdue`
    pub base_command: String,

    /// Free-form arguments handed to the command
    pub command_params: Option<String>,

    /// One of `daily`, `weekly`, `monthly`, `custom`
    pub frequency: String,

    /// Raw five-field expression, only set for `custom`
    pub custom_expression: Option<String>,

    /// Time of day as `HH:MM`
    pub run_at: Option<String>,

    /// 0 = Sunday
    pub day_of_week: Option<i16>,

    pub day_of_month: Option<i16>,

    pub is_active: bool,

    pub last_run: Option<DateTimeWithTimeZone>,

    pub last_output: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
