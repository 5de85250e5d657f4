//! Migration to create the clients and suppliers tables.
//!
//! Both tables are owned by a user and share the same address and tax
//! identifier shape; suppliers additionally carry banking details.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn party_columns<T>(table: &mut TableCreateStatement, id: T, user_id: T) -> &mut TableCreateStatement
where
    T: IntoIden + 'static,
{
    table
        .col(ColumnDef::new(id).uuid().not_null().primary_key())
        .col(ColumnDef::new(user_id).uuid().not_null())
        .col(ColumnDef::new(Party::Name).text().not_null())
        .col(ColumnDef::new(Party::Street).text().null())
        .col(ColumnDef::new(Party::City).text().null())
        .col(ColumnDef::new(Party::Zip).text().null())
        .col(ColumnDef::new(Party::Country).text().null())
        .col(ColumnDef::new(Party::CompanyId).text().null())
        .col(ColumnDef::new(Party::VatId).text().null())
        .col(ColumnDef::new(Party::Email).text().null())
        .col(ColumnDef::new(Party::Phone).text().null())
}

fn timestamps(table: &mut TableCreateStatement) -> &mut TableCreateStatement {
    table
        .col(
            ColumnDef::new(Party::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(
            ColumnDef::new(Party::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut clients = Table::create();
        clients.table(Clients::Table).if_not_exists();
        party_columns(&mut clients, Clients::Id, Clients::UserId);
        timestamps(&mut clients);
        clients.foreign_key(
            ForeignKey::create()
                .name("fk_clients_user_id")
                .from(Clients::Table, Clients::UserId)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::Cascade),
        );
        manager.create_table(clients.to_owned()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_clients_user_id")
                    .table(Clients::Table)
                    .col(Clients::UserId)
                    .to_owned(),
            )
            .await?;

        let mut suppliers = Table::create();
        suppliers.table(Suppliers::Table).if_not_exists();
        party_columns(&mut suppliers, Suppliers::Id, Suppliers::UserId);
        suppliers
            .col(ColumnDef::new(Suppliers::AccountNumber).text().null())
            .col(ColumnDef::new(Suppliers::BankCode).text().null())
            .col(ColumnDef::new(Suppliers::Iban).text().null())
            .col(ColumnDef::new(Suppliers::Swift).text().null());
        timestamps(&mut suppliers);
        suppliers.foreign_key(
            ForeignKey::create()
                .name("fk_suppliers_user_id")
                .from(Suppliers::Table, Suppliers::UserId)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::Cascade),
        );
        manager.create_table(suppliers.to_owned()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_suppliers_user_id")
                    .table(Suppliers::Table)
                    .col(Suppliers::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Suppliers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Party {
    Name,
    Street,
    City,
    Zip,
    Country,
    CompanyId,
    VatId,
    Email,
    Phone,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
    UserId,
}

#[derive(DeriveIden)]
enum Suppliers {
    Table,
    Id,
    UserId,
    AccountNumber,
    BankCode,
    Iban,
    Swift,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
