//! Migration to create the invoices table.
//!
//! Client and supplier references are optional; when a reference is
//! absent the inline `*_name`/`*_address` columns hold the party details.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Invoices::UserId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::Number).text().not_null())
                    .col(ColumnDef::new(Invoices::ClientId).uuid().null())
                    .col(ColumnDef::new(Invoices::ClientName).text().null())
                    .col(ColumnDef::new(Invoices::ClientAddress).text().null())
                    .col(ColumnDef::new(Invoices::SupplierId).uuid().null())
                    .col(ColumnDef::new(Invoices::SupplierName).text().null())
                    .col(ColumnDef::new(Invoices::SupplierAddress).text().null())
                    .col(ColumnDef::new(Invoices::PaymentMethodId).uuid().null())
                    .col(ColumnDef::new(Invoices::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Invoices::Currency).text().not_null())
                    .col(ColumnDef::new(Invoices::IssuedOn).date().not_null())
                    .col(ColumnDef::new(Invoices::DueIn).integer().not_null())
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .text()
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Invoices::Note).text().null())
                    .col(
                        ColumnDef::new(Invoices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Invoices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_user_id")
                            .from(Invoices::Table, Invoices::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_client_id")
                            .from(Invoices::Table, Invoices::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_supplier_id")
                            .from(Invoices::Table, Invoices::SupplierId)
                            .to(Suppliers::Table, Suppliers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_payment_method_id")
                            .from(Invoices::Table, Invoices::PaymentMethodId)
                            .to(PaymentMethods::Table, PaymentMethods::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_user_number_unique")
                    .table(Invoices::Table)
                    .col(Invoices::UserId)
                    .col(Invoices::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_status")
                    .table(Invoices::Table)
                    .col(Invoices::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    UserId,
    Number,
    ClientId,
    ClientName,
    ClientAddress,
    SupplierId,
    SupplierName,
    SupplierAddress,
    PaymentMethodId,
    Amount,
    Currency,
    IssuedOn,
    DueIn,
    Status,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Suppliers {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PaymentMethods {
    Table,
    Id,
}
