//! # Cron Scheduler
//!
//! Background task that wakes every `tick_interval_seconds`, loads active
//! cron tasks and runs the ones whose next fire time since their last run
//! has passed. Due tasks run one after another; failures are recorded as
//! the task's output and never retried before the next scheduled time.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::commands::{CommandContext, CommandRegistry};
use crate::config::AppConfig;
use crate::cron::{self, CronError};
use crate::error::ApiError;
use crate::models::cron_task::Model as CronTaskModel;
use crate::repositories::CronTaskRepository;

/// Background scheduler service.
pub struct CronScheduler {
    config: Arc<AppConfig>,
    db: DatabaseConnection,
    commands: Arc<CommandRegistry>,
}

#[derive(Debug, Default)]
struct TickStats {
    tasks_polled: u64,
    tasks_run: u64,
    tasks_failed: u64,
    tasks_invalid: u64,
}

impl CronScheduler {
    pub fn new(
        config: Arc<AppConfig>,
        db: DatabaseConnection,
        commands: Arc<CommandRegistry>,
    ) -> Self {
        Self {
            config,
            db,
            commands,
        }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            tick_interval_seconds = self.config.scheduler.tick_interval_seconds,
            "Starting cron scheduler"
        );
        let tick_interval = TokioDuration::from_secs(self.config.scheduler.tick_interval_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Cron scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = Instant::now();
                    if let Err(err) = self.tick(Utc::now()).await {
                        error!(error = ?err, "Scheduler tick failed");
                    }
                    histogram!("cron_scheduler_tick_duration_ms")
                        .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Cron scheduler stopped");
    }

    /// Runs every active task that is due at `now`.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<(), ApiError> {
        let mut stats = TickStats::default();
        let tasks = CronTaskRepository::new(&self.db).list_active().await?;

        for task in tasks {
            stats.tasks_polled += 1;

            match is_due(&task, now) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    stats.tasks_invalid += 1;
                    warn!(task_id = %task.id, error = %err, "Skipping cron task with invalid schedule");
                    continue;
                }
            }

            let task_id = task.id;
            match run_task(&self.db, &self.commands, task).await {
                Ok(outcome) if outcome.succeeded => stats.tasks_run += 1,
                Ok(_) => stats.tasks_failed += 1,
                Err(err) => {
                    stats.tasks_failed += 1;
                    error!(error = ?err, task_id = %task_id, "Failed to record cron task run");
                }
            }
        }

        debug!(
            polled = stats.tasks_polled,
            run = stats.tasks_run,
            failed = stats.tasks_failed,
            invalid = stats.tasks_invalid,
            "Scheduler tick completed"
        );

        Ok(())
    }
}

/// Result of executing one task.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub task: CronTaskModel,
    pub succeeded: bool,
}

/// Whether the first fire time after the task's last run (or creation)
/// is at or before `now`.
pub fn is_due(task: &CronTaskModel, now: DateTime<Utc>) -> Result<bool, CronError> {
    let expression = cron::expression_for(task)?;
    let since = task
        .last_run
        .unwrap_or(task.created_at)
        .with_timezone(&Utc);

    Ok(cron::next_run_after(&expression, since)?.is_some_and(|next| next <= now))
}

/// Executes a task's command and records `last_run` and `last_output`.
///
/// Command failures are not errors here: they are stored as output
/// prefixed with `error:`. Only failing to persist the run is.
pub async fn run_task(
    db: &DatabaseConnection,
    commands: &CommandRegistry,
    task: CronTaskModel,
) -> Result<RunOutcome, ApiError> {
    let started_at = Utc::now();
    let started = Instant::now();
    let command_name = task.base_command.clone();

    let result = match commands.get(&command_name) {
        Ok(command) => {
            let ctx = CommandContext { db: db.clone() };
            command.run(&ctx, task.command_params.as_deref()).await
        }
        Err(err) => Err(err),
    };

    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
    let (succeeded, output) = match result {
        Ok(output) => (true, output),
        Err(err) => (false, format!("error: {err}")),
    };
    let outcome_label = if succeeded { "success" } else { "failure" };

    let metric_labels = vec![
        ("command", command_name.clone()),
        ("outcome", outcome_label.to_string()),
    ];
    counter!("cron_task_runs_total", &metric_labels).increment(1);
    histogram!("cron_task_duration_ms", &metric_labels).record(elapsed_ms);

    if succeeded {
        info!(task_id = %task.id, command = %command_name, elapsed_ms, "Cron task completed");
    } else {
        warn!(task_id = %task.id, command = %command_name, output = %output, "Cron task failed");
    }

    let task = CronTaskRepository::new(db)
        .record_run(task, started_at, &output)
        .await?;

    Ok(RunOutcome { task, succeeded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_db;
    use crate::requests::CronTaskRequest;
    use chrono::{Duration, TimeZone};

    fn task(frequency: &str, custom: Option<&str>) -> CronTaskModel {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        CronTaskModel {
            id: uuid::Uuid::new_v4(),
            name: "t".to_string(),
            base_command: "system:ping".to_string(),
            command_params: None,
            frequency: frequency.to_string(),
            custom_expression: custom.map(str::to_string),
            run_at: Some("06:00".to_string()),
            day_of_week: None,
            day_of_month: None,
            is_active: true,
            last_run: None,
            last_output: None,
            created_at: created.into(),
            updated_at: created.into(),
        }
    }

    #[test]
    fn daily_task_is_due_after_its_time() {
        let task = task("daily", None);
        let before = Utc.with_ymd_and_hms(2024, 3, 1, 5, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();

        assert!(!is_due(&task, before).unwrap());
        assert!(is_due(&task, after).unwrap());
    }

    #[test]
    fn last_run_pushes_next_fire_forward() {
        let mut task = task("daily", None);
        let ran = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        task.last_run = Some(ran.into());

        assert!(!is_due(&task, ran + Duration::hours(12)).unwrap());
        assert!(is_due(&task, ran + Duration::days(1)).unwrap());
    }

    #[test]
    fn invalid_schedule_is_an_error() {
        let task = task("custom", Some("61 * * * *"));
        assert!(is_due(&task, Utc::now()).is_err());
    }

    #[tokio::test]
    async fn run_task_records_success_and_failure() {
        let db = setup_db().await;
        let commands = CommandRegistry::with_builtins();
        let repo = CronTaskRepository::new(&db);

        let ping = repo
            .create(&CronTaskRequest {
                name: Some("ping".to_string()),
                base_command: Some("system:ping".to_string()),
                command_params: Some("hello".to_string()),
                frequency: Some("custom".to_string()),
                custom_expression: Some("*/5 * * * *".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let outcome = run_task(&db, &commands, ping).await.unwrap();
        assert!(outcome.succeeded);
        assert_eq!(outcome.task.last_output.as_deref(), Some("pong hello"));
        assert!(outcome.task.last_run.is_some());

        let mut ghost = outcome.task.clone();
        ghost.base_command = "missing:command".to_string();
        let outcome = run_task(&db, &commands, ghost).await.unwrap();
        assert!(!outcome.succeeded);
        assert!(
            outcome
                .task
                .last_output
                .unwrap_or_default()
                .starts_with("error:")
        );
    }

    #[tokio::test]
    async fn tick_runs_only_due_tasks() {
        let db = setup_db().await;
        let config = Arc::new(AppConfig::default());
        let commands = Arc::new(CommandRegistry::with_builtins());
        let repo = CronTaskRepository::new(&db);

        let every_minute = repo
            .create(&CronTaskRequest {
                name: Some("every minute".to_string()),
                base_command: Some("system:ping".to_string()),
                frequency: Some("custom".to_string()),
                custom_expression: Some("* * * * *".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let yearly = repo
            .create(&CronTaskRequest {
                name: Some("new year".to_string()),
                base_command: Some("system:ping".to_string()),
                frequency: Some("custom".to_string()),
                custom_expression: Some("0 0 1 1 *".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let scheduler = CronScheduler::new(config, db.clone(), commands);
        scheduler
            .tick(Utc::now() + Duration::minutes(2))
            .await
            .unwrap();

        let every_minute = repo.find_by_id(every_minute.id).await.unwrap().unwrap();
        let yearly = repo.find_by_id(yearly.id).await.unwrap().unwrap();
        assert_eq!(every_minute.last_output.as_deref(), Some("pong"));
        assert!(yearly.last_run.is_none());
    }
}
