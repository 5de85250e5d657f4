use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::is_present;
use crate::cron::{CronFrequency, parse_run_at};
use crate::locale::Locale;
use crate::models::cron_task;
use crate::permissions;
use crate::validation::{FormRequest, RequestContext, Validator};

/// Cron task payload
///
/// `run_at` is required for daily, weekly and monthly tasks, `day_of_week`
/// for weekly and `day_of_month` for monthly ones. `custom_expression` is
/// required, and must be a five-field CRON expression, iff the frequency
/// is `custom`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CronTaskRequest {
    #[schema(example = "Mark overdue invoices")]
    pub name: Option<String>,
    /// Registered command name
    #[schema(example = "invoices:mark-overdue")]
    pub base_command: Option<String>,
    pub command_params: Option<String>,
    #[schema(example = "daily")]
    pub frequency: Option<String>,
    #[schema(example = "*/15 * * * *")]
    pub custom_expression: Option<String>,
    /// `HH:MM`
    #[schema(example = "06:00")]
    pub run_at: Option<String>,
    /// 0 = Sunday
    pub day_of_week: Option<i16>,
    pub day_of_month: Option<i16>,
    pub is_active: Option<bool>,
}

impl CronTaskRequest {
    pub fn frequency(&self) -> Option<CronFrequency> {
        self.frequency.as_deref().and_then(|f| f.trim().parse().ok())
    }
}

#[async_trait]
impl FormRequest for CronTaskRequest {
    const PERMISSION: &'static str = permissions::CRON_TASKS_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        if v.required("name", self.name.as_deref()) {
            v.max_len("name", self.name.as_deref(), 255);
        }
        v.unique::<cron_task::Entity>(
            ctx.db,
            "name",
            self.name.as_deref().map(str::trim),
            cron_task::Column::Name,
            ctx.record_id.map(|id| (cron_task::Column::Id, id)),
            None,
        )
        .await?;

        if v.required("base_command", self.base_command.as_deref()) {
            v.registered_command(
                "base_command",
                self.base_command.as_deref().map(str::trim),
                ctx.commands,
            );
        }
        v.max_len("command_params", self.command_params.as_deref(), 1000);

        let frequencies = CronFrequency::ALL.map(CronFrequency::as_str);
        if v.required("frequency", self.frequency.as_deref()) {
            v.one_of(
                "frequency",
                self.frequency.as_deref().map(str::trim),
                &frequencies,
            );
        }
        let frequency = self.frequency();
        let frequency_name = frequency.map(CronFrequency::as_str).unwrap_or_default();

        let is_custom = frequency == Some(CronFrequency::Custom);
        v.required_if(
            "custom_expression",
            is_present(&self.custom_expression),
            "frequency",
            CronFrequency::Custom.as_str(),
            is_custom,
        );
        if is_custom {
            v.cron("custom_expression", self.custom_expression.as_deref());
        }

        let needs_time = frequency.is_some_and(|f| f != CronFrequency::Custom);
        v.required_if(
            "run_at",
            is_present(&self.run_at),
            "frequency",
            frequency_name,
            needs_time,
        );
        let bad_run_at = self
            .run_at
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .is_some_and(|r| parse_run_at(r).is_err());
        if bad_run_at && !v.has_error("run_at") {
            v.fail("run_at", "date_format", vec![("format", "HH:MM".to_string())]);
        }

        v.required_if(
            "day_of_week",
            self.day_of_week.is_some(),
            "frequency",
            frequency_name,
            frequency == Some(CronFrequency::Weekly),
        );
        v.between("day_of_week", self.day_of_week, 0, 6);

        v.required_if(
            "day_of_month",
            self.day_of_month.is_some(),
            "frequency",
            frequency_name,
            frequency == Some(CronFrequency::Monthly),
        );
        v.between("day_of_month", self.day_of_month, 1, 31);

        Ok(())
    }

    fn messages(&self, locale: Locale) -> Vec<(&'static str, &'static str)> {
        let hint = match locale {
            Locale::Cs => {
                "Pole :attribute musí mít tvar „minuta hodina den měsíc den_v_týdnu“, např. */15 * * * *."
            }
            Locale::Sk => {
                "Pole :attribute musí mať tvar „minúta hodina deň mesiac deň_v_týždni“, napr. */15 * * * *."
            }
            Locale::En => {
                "The :attribute must look like \"minute hour day month weekday\", e.g. */15 * * * *."
            }
        };
        vec![("custom_expression.cron", hint)]
    }
}
