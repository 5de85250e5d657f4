//! Built-in scheduled commands.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};

use super::{CommandContext, CommandError, ScheduledCommand};
use crate::models::invoice::{self, Entity as Invoice, STATUS_ISSUED, STATUS_OVERDUE};

/// Flags issued invoices whose payment term has elapsed as overdue.
pub struct MarkOverdueInvoices;

#[async_trait]
impl ScheduledCommand for MarkOverdueInvoices {
    fn name(&self) -> &'static str {
        "invoices:mark-overdue"
    }

    fn description(&self) -> &'static str {
        "Mark issued invoices past their due date as overdue"
    }

    async fn run(&self, ctx: &CommandContext, _params: Option<&str>) -> Result<String, CommandError> {
        let today = Utc::now().date_naive();

        let issued = Invoice::find()
            .filter(invoice::Column::Status.eq(STATUS_ISSUED))
            .all(&ctx.db)
            .await?;

        let mut marked = 0usize;
        for row in issued.into_iter().filter(|row| row.due_on() < today) {
            let id = row.id;
            let mut active = row.into_active_model();
            active.status = Set(STATUS_OVERDUE.to_string());
            active.updated_at = Set(Utc::now().into());
            active.update(&ctx.db).await?;
            tracing::debug!(invoice_id = %id, "invoice marked overdue");
            marked += 1;
        }

        Ok(format!("marked {marked} invoice(s) overdue"))
    }
}

/// Liveness probe for the scheduler; echoes its parameters.
pub struct Ping;

#[async_trait]
impl ScheduledCommand for Ping {
    fn name(&self) -> &'static str {
        "system:ping"
    }

    fn description(&self) -> &'static str {
        "Reply with pong"
    }

    async fn run(&self, _ctx: &CommandContext, params: Option<&str>) -> Result<String, CommandError> {
        match params.map(str::trim).filter(|p| !p.is_empty()) {
            Some(params) => Ok(format!("pong {params}")),
            None => Ok("pong".to_string()),
        }
    }
}
