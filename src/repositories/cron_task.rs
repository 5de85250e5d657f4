//! # Cron Task Repository

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::{Page, paginate};
use crate::cron::CronFrequency;
use crate::cursor::CursorData;
use crate::error::RepositoryError;
use crate::models::cron_task::{
    self, ActiveModel as CronTaskActiveModel, Entity as CronTask, Model as CronTaskModel,
};
use crate::requests::{CronTaskRequest, clean};

/// Longest output kept in `last_output`, in characters
pub const MAX_OUTPUT_CHARS: usize = 4000;

/// Repository for CronTask database operations
pub struct CronTaskRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CronTaskRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CronTaskModel>, RepositoryError> {
        CronTask::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<CronTaskModel>, RepositoryError> {
        paginate(
            self.db,
            CronTask::find(),
            (cron_task::Column::CreatedAt, cron_task::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    /// Active tasks in creation order, as the scheduler walks them.
    pub async fn list_active(&self) -> Result<Vec<CronTaskModel>, RepositoryError> {
        CronTask::find()
            .filter(cron_task::Column::IsActive.eq(true))
            .order_by_asc(cron_task::Column::CreatedAt)
            .order_by_asc(cron_task::Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(&self, request: &CronTaskRequest) -> Result<CronTaskModel, RepositoryError> {
        let now = Utc::now();
        let mut active = CronTaskActiveModel {
            id: Set(Uuid::new_v4()),
            is_active: Set(true),
            last_run: Set(None),
            last_output: Set(None),
            created_at: Set(now.into()),
            ..Default::default()
        };
        apply(&mut active, request)?;
        active.updated_at = Set(now.into());

        active
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        task: CronTaskModel,
        request: &CronTaskRequest,
    ) -> Result<CronTaskModel, RepositoryError> {
        let mut active = task.into_active_model();
        apply(&mut active, request)?;
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Stores the outcome of a run, truncating long output.
    pub async fn record_run(
        &self,
        task: CronTaskModel,
        ran_at: DateTime<Utc>,
        output: &str,
    ) -> Result<CronTaskModel, RepositoryError> {
        let output: String = output.chars().take(MAX_OUTPUT_CHARS).collect();

        let mut active = task.into_active_model();
        active.last_run = Set(Some(ran_at.into()));
        active.last_output = Set(Some(output));
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, task: CronTaskModel) -> Result<(), RepositoryError> {
        task.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

/// Copies the request onto the row, keeping only the fields the chosen
/// frequency uses.
fn apply(active: &mut CronTaskActiveModel, request: &CronTaskRequest) -> Result<(), RepositoryError> {
    let name = clean(&request.name).ok_or_else(|| RepositoryError::validation_error("name is required"))?;
    let base_command = clean(&request.base_command)
        .ok_or_else(|| RepositoryError::validation_error("base_command is required"))?;
    let frequency = request
        .frequency()
        .ok_or_else(|| RepositoryError::validation_error("frequency is invalid"))?;

    let custom_expression = match frequency {
        CronFrequency::Custom => clean(&request.custom_expression)
            .map(|e| e.split_whitespace().collect::<Vec<_>>().join(" ")),
        _ => None,
    };
    let run_at = match frequency {
        CronFrequency::Custom => None,
        _ => clean(&request.run_at),
    };

    active.name = Set(name);
    active.base_command = Set(base_command);
    active.command_params = Set(clean(&request.command_params));
    active.frequency = Set(frequency.as_str().to_string());
    active.custom_expression = Set(custom_expression);
    active.run_at = Set(run_at);
    active.day_of_week = Set(match frequency {
        CronFrequency::Weekly => request.day_of_week,
        _ => None,
    });
    active.day_of_month = Set(match frequency {
        CronFrequency::Monthly => request.day_of_month,
        _ => None,
    });
    if let Some(is_active) = request.is_active {
        active.is_active = Set(is_active);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_db;

    fn weekly() -> CronTaskRequest {
        CronTaskRequest {
            name: Some("Weekly ping".to_string()),
            base_command: Some("system:ping".to_string()),
            frequency: Some("weekly".to_string()),
            run_at: Some("06:30".to_string()),
            day_of_week: Some(1),
            day_of_month: Some(15),
            custom_expression: Some("* * * * *".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_drops_fields_unused_by_frequency() {
        let db = setup_db().await;
        let task = CronTaskRepository::new(&db).create(&weekly()).await.unwrap();

        assert_eq!(task.frequency, "weekly");
        assert_eq!(task.day_of_week, Some(1));
        assert_eq!(task.day_of_month, None);
        assert_eq!(task.custom_expression, None);
        assert!(task.is_active);
        assert_eq!(
            crate::cron::expression_for(&task).unwrap(),
            "30 6 * * 1".to_string()
        );
    }

    #[tokio::test]
    async fn record_run_truncates_output() {
        let db = setup_db().await;
        let repo = CronTaskRepository::new(&db);
        let task = repo.create(&weekly()).await.unwrap();

        let long = "x".repeat(MAX_OUTPUT_CHARS + 10);
        let updated = repo.record_run(task, Utc::now(), &long).await.unwrap();

        assert!(updated.last_run.is_some());
        assert_eq!(
            updated.last_output.map(|o| o.chars().count()),
            Some(MAX_OUTPUT_CHARS)
        );
    }
}
