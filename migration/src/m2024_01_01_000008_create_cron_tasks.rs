//! Migration to create the cron_tasks table.
//!
//! A cron task stores the human-editable frequency; the CRON expression
//! is derived from it at read time, except for `custom` frequencies where
//! the raw expression is stored in `custom_expression`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CronTasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CronTasks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CronTasks::Name).text().not_null())
                    .col(ColumnDef::new(CronTasks::BaseCommand).text().not_null())
                    .col(ColumnDef::new(CronTasks::CommandParams).text().null())
                    .col(ColumnDef::new(CronTasks::Frequency).text().not_null())
                    .col(ColumnDef::new(CronTasks::CustomExpression).text().null())
                    .col(ColumnDef::new(CronTasks::RunAt).text().null())
                    .col(ColumnDef::new(CronTasks::DayOfWeek).small_integer().null())
                    .col(ColumnDef::new(CronTasks::DayOfMonth).small_integer().null())
                    .col(
                        ColumnDef::new(CronTasks::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(CronTasks::LastRun)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(CronTasks::LastOutput).text().null())
                    .col(
                        ColumnDef::new(CronTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CronTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cron_tasks_name_unique")
                    .table(CronTasks::Table)
                    .col(CronTasks::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CronTasks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CronTasks {
    Table,
    Id,
    Name,
    BaseCommand,
    CommandParams,
    Frequency,
    CustomExpression,
    RunAt,
    DayOfWeek,
    DayOfMonth,
    IsActive,
    LastRun,
    LastOutput,
    CreatedAt,
    UpdatedAt,
}
