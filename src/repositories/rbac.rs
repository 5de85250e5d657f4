//! # RBAC Repository
//!
//! Roles, permissions and their assignments. Everything is partitioned by
//! guard: a user's effective permissions under a guard are the union of
//! direct grants and the grants of their roles, restricted to that guard.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::{Page, paginate};
use crate::auth::Guard;
use crate::cursor::CursorData;
use crate::error::RepositoryError;
use crate::models::{permission, role, role_permission, user_permission, user_role};

/// Repository for roles, permissions and their pivots
pub struct RbacRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> RbacRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Effective permission names of a user under `guard`.
    pub async fn permission_names_for_user(
        &self,
        user_id: Uuid,
        guard: Guard,
    ) -> Result<HashSet<String>, RepositoryError> {
        let role_ids: Vec<Uuid> = self
            .roles_for_user(user_id)
            .await?
            .into_iter()
            .filter(|r| r.guard_name == guard.as_str())
            .map(|r| r.id)
            .collect();

        let mut permission_ids: Vec<Uuid> = user_permission::Entity::find()
            .filter(user_permission::Column::UserId.eq(user_id))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|p| p.permission_id)
            .collect();

        if !role_ids.is_empty() {
            let granted = role_permission::Entity::find()
                .filter(role_permission::Column::RoleId.is_in(role_ids))
                .all(self.db)
                .await
                .map_err(RepositoryError::database_error)?;
            permission_ids.extend(granted.into_iter().map(|g| g.permission_id));
        }

        if permission_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let names = permission::Entity::find()
            .filter(permission::Column::Id.is_in(permission_ids))
            .filter(permission::Column::GuardName.eq(guard.as_str()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|p| p.name)
            .collect();

        Ok(names)
    }

    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<role::Model>, RepositoryError> {
        let role_ids: Vec<Uuid> = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|r| r.role_id)
            .collect();

        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        role::Entity::find()
            .filter(role::Column::Id.is_in(role_ids))
            .order_by_asc(role::Column::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Whether the user may log in under `guard`.
    pub async fn has_role_in_guard(
        &self,
        user_id: Uuid,
        guard: Guard,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .roles_for_user(user_id)
            .await?
            .iter()
            .any(|r| r.guard_name == guard.as_str()))
    }

    pub async fn direct_permission_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        Ok(user_permission::Entity::find()
            .filter(user_permission::Column::UserId.eq(user_id))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|p| p.permission_id)
            .collect())
    }

    pub async fn role_permission_ids(&self, role_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        Ok(role_permission::Entity::find()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|p| p.permission_id)
            .collect())
    }

    /// Idempotent single role assignment.
    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), RepositoryError> {
        let existing = user_role::Entity::find_by_id((user_id, role_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if existing.is_some() {
            return Ok(());
        }

        user_role::Entity::insert(user_role::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role_id),
        })
        .exec_without_returning(self.db)
        .await
        .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    /// Replaces the user's roles with `role_ids`.
    pub async fn sync_user_roles(
        &self,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        let rows: Vec<_> = dedup(role_ids)
            .into_iter()
            .map(|role_id| user_role::ActiveModel {
                user_id: Set(user_id),
                role_id: Set(role_id),
            })
            .collect();
        if !rows.is_empty() {
            user_role::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await
                .map_err(RepositoryError::database_error)?;
        }

        txn.commit().await.map_err(RepositoryError::database_error)
    }

    /// Replaces the user's direct permission grants.
    pub async fn sync_user_permissions(
        &self,
        user_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        user_permission::Entity::delete_many()
            .filter(user_permission::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        let rows: Vec<_> = dedup(permission_ids)
            .into_iter()
            .map(|permission_id| user_permission::ActiveModel {
                user_id: Set(user_id),
                permission_id: Set(permission_id),
            })
            .collect();
        if !rows.is_empty() {
            user_permission::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await
                .map_err(RepositoryError::database_error)?;
        }

        txn.commit().await.map_err(RepositoryError::database_error)
    }

    /// Replaces the permissions granted by a role.
    pub async fn sync_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        role_permission::Entity::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        let rows: Vec<_> = dedup(permission_ids)
            .into_iter()
            .map(|permission_id| role_permission::ActiveModel {
                role_id: Set(role_id),
                permission_id: Set(permission_id),
            })
            .collect();
        if !rows.is_empty() {
            role_permission::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await
                .map_err(RepositoryError::database_error)?;
        }

        txn.commit().await.map_err(RepositoryError::database_error)
    }

    pub async fn find_role(&self, id: Uuid) -> Result<Option<role::Model>, RepositoryError> {
        role::Entity::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_role_by_name(
        &self,
        name: &str,
        guard: Guard,
    ) -> Result<Option<role::Model>, RepositoryError> {
        role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .filter(role::Column::GuardName.eq(guard.as_str()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list_roles(
        &self,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<role::Model>, RepositoryError> {
        paginate(
            self.db,
            role::Entity::find(),
            (role::Column::CreatedAt, role::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    pub async fn create_role(&self, name: &str, guard: Guard) -> Result<role::Model, RepositoryError> {
        role::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            guard_name: Set(guard.as_str().to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn update_role(
        &self,
        role: role::Model,
        name: &str,
        guard: Guard,
    ) -> Result<role::Model, RepositoryError> {
        let mut active = role.into_active_model();
        active.name = Set(name.trim().to_string());
        active.guard_name = Set(guard.as_str().to_string());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete_role(&self, role: role::Model) -> Result<(), RepositoryError> {
        role.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    pub async fn find_or_create_role(
        &self,
        name: &str,
        guard: Guard,
    ) -> Result<role::Model, RepositoryError> {
        match self.find_role_by_name(name, guard).await? {
            Some(role) => Ok(role),
            None => self.create_role(name, guard).await,
        }
    }

    pub async fn find_permission(
        &self,
        id: Uuid,
    ) -> Result<Option<permission::Model>, RepositoryError> {
        permission::Entity::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list_permissions(
        &self,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<permission::Model>, RepositoryError> {
        paginate(
            self.db,
            permission::Entity::find(),
            (permission::Column::CreatedAt, permission::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    /// Permissions of one guard, by name.
    pub async fn permissions_in_guard(
        &self,
        guard: Guard,
    ) -> Result<Vec<permission::Model>, RepositoryError> {
        permission::Entity::find()
            .filter(permission::Column::GuardName.eq(guard.as_str()))
            .order_by_asc(permission::Column::Name)
            .limit(1000)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create_permission(
        &self,
        name: &str,
        guard: Guard,
    ) -> Result<permission::Model, RepositoryError> {
        permission::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            guard_name: Set(guard.as_str().to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn update_permission(
        &self,
        permission: permission::Model,
        name: &str,
        guard: Guard,
    ) -> Result<permission::Model, RepositoryError> {
        let mut active = permission.into_active_model();
        active.name = Set(name.trim().to_string());
        active.guard_name = Set(guard.as_str().to_string());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete_permission(
        &self,
        permission: permission::Model,
    ) -> Result<(), RepositoryError> {
        permission
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    pub async fn find_or_create_permission(
        &self,
        name: &str,
        guard: Guard,
    ) -> Result<permission::Model, RepositoryError> {
        let existing = permission::Entity::find()
            .filter(permission::Column::Name.eq(name))
            .filter(permission::Column::GuardName.eq(guard.as_str()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        match existing {
            Some(permission) => Ok(permission),
            None => self.create_permission(name, guard).await,
        }
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_db;
    use crate::repositories::user::{NewUser, UserRepository};

    async fn user(db: &DatabaseConnection) -> Uuid {
        UserRepository::new(db)
            .create(NewUser {
                name: "Eva".to_string(),
                email: format!("{}@example.cz", Uuid::new_v4()),
                password_hash: "hash".to_string(),
                locale: "cs".to_string(),
                is_active: true,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn permissions_are_partitioned_by_guard() {
        let db = setup_db().await;
        let repo = RbacRepository::new(&db);
        let user_id = user(&db).await;

        let admin = repo.create_role("admin", Guard::Backpack).await.unwrap();
        let manage_backpack = repo
            .create_permission("clients.manage", Guard::Backpack)
            .await
            .unwrap();
        let manage_web = repo
            .create_permission("clients.manage", Guard::Web)
            .await
            .unwrap();
        repo.sync_role_permissions(admin.id, &[manage_backpack.id])
            .await
            .unwrap();
        repo.assign_role(user_id, admin.id).await.unwrap();

        let backpack = repo
            .permission_names_for_user(user_id, Guard::Backpack)
            .await
            .unwrap();
        assert!(backpack.contains("clients.manage"));
        assert!(
            repo.permission_names_for_user(user_id, Guard::Web)
                .await
                .unwrap()
                .is_empty()
        );

        repo.sync_user_permissions(user_id, &[manage_web.id])
            .await
            .unwrap();
        let web = repo
            .permission_names_for_user(user_id, Guard::Web)
            .await
            .unwrap();
        assert!(web.contains("clients.manage"));

        assert!(repo.has_role_in_guard(user_id, Guard::Backpack).await.unwrap());
        assert!(!repo.has_role_in_guard(user_id, Guard::Web).await.unwrap());
    }

    #[tokio::test]
    async fn sync_replaces_assignments() {
        let db = setup_db().await;
        let repo = RbacRepository::new(&db);
        let user_id = user(&db).await;

        let a = repo.create_role("a", Guard::Web).await.unwrap();
        let b = repo.create_role("b", Guard::Web).await.unwrap();

        repo.sync_user_roles(user_id, &[a.id, a.id]).await.unwrap();
        repo.sync_user_roles(user_id, &[b.id]).await.unwrap();

        let names: Vec<_> = repo
            .roles_for_user(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let db = setup_db().await;
        let repo = RbacRepository::new(&db);

        let first = repo.find_or_create_role("customer", Guard::Web).await.unwrap();
        let second = repo.find_or_create_role("customer", Guard::Web).await.unwrap();
        assert_eq!(first.id, second.id);

        let other_guard = repo
            .find_or_create_role("customer", Guard::Backpack)
            .await
            .unwrap();
        assert_ne!(first.id, other_guard.id);
    }
}
