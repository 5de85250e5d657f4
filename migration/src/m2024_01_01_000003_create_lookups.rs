//! Migration to create the shared lookup tables: taxes, banks and
//! payment methods. These rows are global and only editable by admins.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Taxes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Taxes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Taxes::Name).text().not_null())
                    .col(ColumnDef::new(Taxes::Rate).integer().not_null())
                    .col(
                        ColumnDef::new(Taxes::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Taxes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Taxes::UpdatedAt)
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
                    .name("idx_taxes_name_unique")
                    .table(Taxes::Table)
                    .col(Taxes::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Banks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Banks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Banks::Name).text().not_null())
                    .col(ColumnDef::new(Banks::Code).text().not_null())
                    .col(ColumnDef::new(Banks::Swift).text().null())
                    .col(
                        ColumnDef::new(Banks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Banks::UpdatedAt)
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
                    .name("idx_banks_code_unique")
                    .table(Banks::Table)
                    .col(Banks::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentMethods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentMethods::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentMethods::Name).text().not_null())
                    .col(ColumnDef::new(PaymentMethods::Code).text().not_null())
                    .col(
                        ColumnDef::new(PaymentMethods::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::UpdatedAt)
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
                    .name("idx_payment_methods_code_unique")
                    .table(PaymentMethods::Table)
                    .col(PaymentMethods::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_methods_name_unique")
                    .table(PaymentMethods::Table)
                    .col(PaymentMethods::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentMethods::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Banks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Taxes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Taxes {
    Table,
    Id,
    Name,
    Rate,
    IsDefault,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Banks {
    Table,
    Id,
    Name,
    Code,
    Swift,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PaymentMethods {
    Table,
    Id,
    Name,
    Code,
    CreatedAt,
    UpdatedAt,
}
