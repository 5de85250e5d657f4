//! # Cron Expressions
//!
//! Translates a task's human-editable frequency into a five-field CRON
//! expression, validates custom expressions, and computes upcoming run
//! times with the `cron` crate.
//!
//! The `cron` crate expects a leading seconds field and numbers weekdays
//! from 1 (Sunday). Expressions are stored in the conventional five-field
//! form with `0`/`7` as Sunday, so [`to_schedule`] prepends `0` seconds and
//! rewrites the day-of-week field to weekday names before parsing.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use cron::Schedule;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::cron_task;

/// How often a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CronFrequency {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl CronFrequency {
    pub const ALL: [CronFrequency; 4] = [
        CronFrequency::Daily,
        CronFrequency::Weekly,
        CronFrequency::Monthly,
        CronFrequency::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CronFrequency::Daily => "daily",
            CronFrequency::Weekly => "weekly",
            CronFrequency::Monthly => "monthly",
            CronFrequency::Custom => "custom",
        }
    }
}

impl FromStr for CronFrequency {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(CronFrequency::Daily),
            "weekly" => Ok(CronFrequency::Weekly),
            "monthly" => Ok(CronFrequency::Monthly),
            "custom" => Ok(CronFrequency::Custom),
            other => Err(CronError::UnknownFrequency(other.to_string())),
        }
    }
}

/// Errors produced while building or evaluating a task schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("unknown frequency '{0}'")]
    UnknownFrequency(String),
    #[error("'{0}' is required for this frequency")]
    MissingField(&'static str),
    #[error("run time '{0}' must be HH:MM")]
    InvalidRunAt(String),
    #[error("{field} {value} is out of range")]
    OutOfRange { field: &'static str, value: i16 },
    #[error("'{0}' is not a valid five-field CRON expression")]
    InvalidExpression(String),
}

fn field_pattern(number: &str) -> String {
    let atom = format!(r"(?:\*|(?:{number})(?:-(?:{number}))?)(?:/[1-9]\d*)?");
    format!("{atom}(?:,{atom})*")
}

/// Five-field grammar: minute, hour, day of month, month, day of week.
/// Each field is `*`, a number or a range, with an optional `/step`, or a
/// comma list of those.
pub static CRON_EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"^{}\s+{}\s+{}\s+{}\s+{}$",
        field_pattern(r"[0-5]?\d"),
        field_pattern(r"[01]?\d|2[0-3]"),
        field_pattern(r"0?[1-9]|[12]\d|3[01]"),
        field_pattern(r"0?[1-9]|1[0-2]"),
        field_pattern(r"0?[0-7]"),
    );
    Regex::new(&pattern).expect("cron grammar is a valid regex")
});

static RUN_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]?\d|2[0-3]):([0-5]\d)$").expect("run time grammar is a valid regex")
});

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Returns true when `expression` matches the five-field grammar and
/// describes a schedule that can actually fire. `0 0 31 2 *` parses but
/// never fires, so it is rejected.
pub fn is_valid_expression(expression: &str) -> bool {
    CRON_EXPRESSION.is_match(expression.trim())
        && to_schedule(expression).is_ok_and(|schedule| schedule.upcoming(Utc).next().is_some())
}

/// Parses `HH:MM` into `(hour, minute)`.
pub fn parse_run_at(run_at: &str) -> Result<(u32, u32), CronError> {
    let captures = RUN_AT
        .captures(run_at.trim())
        .ok_or_else(|| CronError::InvalidRunAt(run_at.to_string()))?;

    let hour = captures[1]
        .parse()
        .map_err(|_| CronError::InvalidRunAt(run_at.to_string()))?;
    let minute = captures[2]
        .parse()
        .map_err(|_| CronError::InvalidRunAt(run_at.to_string()))?;

    Ok((hour, minute))
}

/// Builds the five-field expression for a frequency and its parameters.
pub fn build_expression(
    frequency: CronFrequency,
    run_at: Option<&str>,
    day_of_week: Option<i16>,
    day_of_month: Option<i16>,
    custom_expression: Option<&str>,
) -> Result<String, CronError> {
    let time = || parse_run_at(run_at.ok_or(CronError::MissingField("run_at"))?);

    match frequency {
        CronFrequency::Custom => {
            let expression = custom_expression
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .ok_or(CronError::MissingField("custom_expression"))?;
            if !is_valid_expression(expression) {
                return Err(CronError::InvalidExpression(expression.to_string()));
            }
            Ok(expression.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        CronFrequency::Daily => {
            let (hour, minute) = time()?;
            Ok(format!("{minute} {hour} * * *"))
        }
        CronFrequency::Weekly => {
            let (hour, minute) = time()?;
            let day = day_of_week.ok_or(CronError::MissingField("day_of_week"))?;
            if !(0..=6).contains(&day) {
                return Err(CronError::OutOfRange {
                    field: "day_of_week",
                    value: day,
                });
            }
            Ok(format!("{minute} {hour} * * {day}"))
        }
        CronFrequency::Monthly => {
            let (hour, minute) = time()?;
            let day = day_of_month.ok_or(CronError::MissingField("day_of_month"))?;
            if !(1..=31).contains(&day) {
                return Err(CronError::OutOfRange {
                    field: "day_of_month",
                    value: day,
                });
            }
            Ok(format!("{minute} {hour} {day} * *"))
        }
    }
}

/// Expression for a stored task.
pub fn expression_for(task: &cron_task::Model) -> Result<String, CronError> {
    let frequency: CronFrequency = task.frequency.parse()?;
    build_expression(
        frequency,
        task.run_at.as_deref(),
        task.day_of_week,
        task.day_of_month,
        task.custom_expression.as_deref(),
    )
}

/// Parses a five-field expression into a `cron` crate schedule.
pub fn to_schedule(expression: &str) -> Result<Schedule, CronError> {
    let invalid = || CronError::InvalidExpression(expression.to_string());

    let fields: Vec<&str> = expression.split_whitespace().collect();
    let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
        return Err(invalid());
    };

    let weekdays = weekday_names(day_of_week).ok_or_else(invalid)?;
    let six_field = format!("0 {minute} {hour} {day_of_month} {month} {weekdays}");

    Schedule::from_str(&six_field).map_err(|_| invalid())
}

/// Next run strictly after `after`, or `None` if the schedule never fires again.
pub fn next_run_after(
    expression: &str,
    after: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, CronError> {
    Ok(to_schedule(expression)?.after(&after).next())
}

/// Expands a day-of-week field (0 and 7 both Sunday) to weekday names.
fn weekday_names(field: &str) -> Option<String> {
    if field == "*" {
        return Some("*".to_string());
    }

    let mut days = BTreeSet::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, step.parse::<usize>().ok().filter(|s| *s > 0)?),
            None => (item, 1),
        };

        let (start, end) = match range {
            "*" => (0, 6),
            _ => match range.split_once('-') {
                Some((a, b)) => (a.parse::<usize>().ok()?, b.parse::<usize>().ok()?),
                // `N/step` runs from N to the end of the week
                None if item.contains('/') => (range.parse::<usize>().ok()?, 6),
                None => {
                    let day = range.parse::<usize>().ok()?;
                    (day, day)
                }
            },
        };

        if start > end || end > 7 {
            return None;
        }
        days.extend((start..=end).step_by(step).map(|day| day % 7));
    }

    if days.len() == 7 {
        return Some("*".to_string());
    }

    Some(
        days.into_iter()
            .map(|day| WEEKDAYS[day])
            .collect::<Vec<_>>()
            .join(","),
    )
}
