//! Migration to create the guard-partitioned RBAC tables.
//!
//! Roles and permissions are unique per `(name, guard_name)`, so the same
//! permission name can exist once for the `backpack` guard and once for
//! the `web` guard.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Permissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Permissions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Permissions::Name).text().not_null())
                    .col(ColumnDef::new(Permissions::GuardName).text().not_null())
                    .col(
                        ColumnDef::new(Permissions::CreatedAt)
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
                    .name("idx_permissions_name_guard_unique")
                    .table(Permissions::Table)
                    .col(Permissions::Name)
                    .col(Permissions::GuardName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Roles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Roles::Name).text().not_null())
                    .col(ColumnDef::new(Roles::GuardName).text().not_null())
                    .col(
                        ColumnDef::new(Roles::CreatedAt)
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
                    .name("idx_roles_name_guard_unique")
                    .table(Roles::Table)
                    .col(Roles::Name)
                    .col(Roles::GuardName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoleHasPermissions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RoleHasPermissions::RoleId).uuid().not_null())
                    .col(
                        ColumnDef::new(RoleHasPermissions::PermissionId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(RoleHasPermissions::RoleId)
                            .col(RoleHasPermissions::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_has_permissions_role_id")
                            .from(RoleHasPermissions::Table, RoleHasPermissions::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_has_permissions_permission_id")
                            .from(
                                RoleHasPermissions::Table,
                                RoleHasPermissions::PermissionId,
                            )
                            .to(Permissions::Table, Permissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ModelHasRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ModelHasRoles::UserId).uuid().not_null())
                    .col(ColumnDef::new(ModelHasRoles::RoleId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(ModelHasRoles::UserId)
                            .col(ModelHasRoles::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_model_has_roles_user_id")
                            .from(ModelHasRoles::Table, ModelHasRoles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_model_has_roles_role_id")
                            .from(ModelHasRoles::Table, ModelHasRoles::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ModelHasPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModelHasPermissions::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModelHasPermissions::PermissionId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ModelHasPermissions::UserId)
                            .col(ModelHasPermissions::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_model_has_permissions_user_id")
                            .from(ModelHasPermissions::Table, ModelHasPermissions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_model_has_permissions_permission_id")
                            .from(
                                ModelHasPermissions::Table,
                                ModelHasPermissions::PermissionId,
                            )
                            .to(Permissions::Table, Permissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModelHasPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ModelHasRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoleHasPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Permissions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Permissions {
    Table,
    Id,
    Name,
    GuardName,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Id,
    Name,
    GuardName,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RoleHasPermissions {
    Table,
    RoleId,
    PermissionId,
}

#[derive(DeriveIden)]
enum ModelHasRoles {
    Table,
    UserId,
    RoleId,
}

#[derive(DeriveIden)]
enum ModelHasPermissions {
    Table,
    UserId,
    PermissionId,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
