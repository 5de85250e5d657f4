//! # User Repository
//!
//! CRUD for users. Emails are stored trimmed and lowercased so lookups at
//! login are case-insensitive.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use super::{Page, paginate};
use crate::cursor::CursorData;
use crate::error::RepositoryError;
use crate::models::user::{self, ActiveModel as UserActiveModel, Entity as User, Model as UserModel};
use crate::requests::{UserRequest, clean};

/// Data for inserting a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Already hashed with Argon2
    pub password_hash: String,
    pub locale: String,
    pub is_active: bool,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Repository for User database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, RepositoryError> {
        User::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<UserModel>, RepositoryError> {
        paginate(
            self.db,
            User::find(),
            (user::Column::CreatedAt, user::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    pub async fn create(&self, new_user: NewUser) -> Result<UserModel, RepositoryError> {
        let now = Utc::now();

        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_user.name.trim().to_string()),
            email: Set(normalize_email(&new_user.email)),
            password_hash: Set(new_user.password_hash),
            locale: Set(new_user.locale),
            is_active: Set(new_user.is_active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        user.insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Applies an admin edit. Absent optional fields keep their value.
    pub async fn update(
        &self,
        user: UserModel,
        request: &UserRequest,
        password_hash: Option<String>,
    ) -> Result<UserModel, RepositoryError> {
        let mut active = user.into_active_model();

        if let Some(name) = clean(&request.name) {
            active.name = Set(name);
        }
        if let Some(email) = clean(&request.email) {
            active.email = Set(normalize_email(&email));
        }
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(locale) = clean(&request.locale) {
            active.locale = Set(locale);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, user: UserModel) -> Result<(), RepositoryError> {
        user.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_db;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Jana".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            locale: "cs".to_string(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);

        let created = repo.create(new_user(" Jana@Example.CZ ")).await.unwrap();
        assert_eq!(created.email, "jana@example.cz");

        let found = repo.find_by_email("JANA@example.cz").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(created.id));
    }

    #[tokio::test]
    async fn update_keeps_absent_fields() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);
        let created = repo.create(new_user("petr@example.cz")).await.unwrap();

        let request = UserRequest {
            locale: Some("sk".to_string()),
            ..Default::default()
        };
        let updated = repo.update(created.clone(), &request, None).await.unwrap();

        assert_eq!(updated.locale, "sk");
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.password_hash, "hash");
    }

    #[tokio::test]
    async fn list_pages_newest_first() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);
        for n in 0..3 {
            repo.create(new_user(&format!("user{n}@example.cz"))).await.unwrap();
        }

        let first = repo.list(2, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let cursor = first.next_cursor.expect("second page exists");

        let decoded = crate::cursor::decode_cursor(&cursor).unwrap();
        let second = repo.list(2, Some(decoded)).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_cursor.is_none());

        let mut seen: Vec<_> = first.items.iter().chain(&second.items).map(|u| u.id).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 3);
    }
}
