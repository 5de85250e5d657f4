//! # Lookup Repositories
//!
//! Shared reference data that every user reads and only admins edit.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{Page, paginate};
use crate::cursor::CursorData;
use crate::error::RepositoryError;
use crate::models::{bank, payment_method, supplier, tax};
use crate::requests::{BankRequest, PaymentMethodRequest, TaxRequest, clean};

fn required(value: &Option<String>, field: &str) -> Result<String, RepositoryError> {
    clean(value).ok_or_else(|| RepositoryError::validation_error(format!("{field} is required")))
}

/// Repository for tax rates
pub struct TaxRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TaxRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<tax::Model>, RepositoryError> {
        tax::Entity::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<tax::Model>, RepositoryError> {
        paginate(
            self.db,
            tax::Entity::find(),
            (tax::Column::CreatedAt, tax::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    /// Creates or updates a rate. At most one rate is the default: marking
    /// one clears the flag on every other row in the same transaction.
    pub async fn save(
        &self,
        existing: Option<tax::Model>,
        request: &TaxRequest,
    ) -> Result<tax::Model, RepositoryError> {
        let name = required(&request.name, "name")?;
        let rate = request
            .rate
            .ok_or_else(|| RepositoryError::validation_error("rate is required"))?;
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let (mut active, id, is_new) = match existing {
            Some(model) => {
                let id = model.id;
                (model.into_active_model(), id, false)
            }
            None => {
                let id = Uuid::new_v4();
                let active = tax::ActiveModel {
                    id: Set(id),
                    is_default: Set(false),
                    created_at: Set(now.into()),
                    ..Default::default()
                };
                (active, id, true)
            }
        };

        if let Some(is_default) = request.is_default {
            if is_default {
                tax::Entity::update_many()
                    .col_expr(tax::Column::IsDefault, Expr::value(false))
                    .filter(tax::Column::Id.ne(id))
                    .exec(&txn)
                    .await
                    .map_err(RepositoryError::database_error)?;
            }
            active.is_default = Set(is_default);
        }
        active.name = Set(name);
        active.rate = Set(rate);
        active.updated_at = Set(now.into());

        let saved = if is_new {
            active.insert(&txn).await
        } else {
            active.update(&txn).await
        }
        .map_err(RepositoryError::database_error)?;
        txn.commit().await.map_err(RepositoryError::database_error)?;

        Ok(saved)
    }

    pub async fn delete(&self, tax: tax::Model) -> Result<(), RepositoryError> {
        tax.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

/// Repository for banks
pub struct BankRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> BankRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<bank::Model>, RepositoryError> {
        bank::Entity::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<bank::Model>, RepositoryError> {
        paginate(
            self.db,
            bank::Entity::find(),
            (bank::Column::CreatedAt, bank::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    pub async fn create(&self, request: &BankRequest) -> Result<bank::Model, RepositoryError> {
        let now = Utc::now();
        bank::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(required(&request.name, "name")?),
            code: Set(required(&request.code, "code")?),
            swift: Set(clean(&request.swift)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        bank: bank::Model,
        request: &BankRequest,
    ) -> Result<bank::Model, RepositoryError> {
        let mut active = bank.into_active_model();
        active.name = Set(required(&request.name, "name")?);
        active.code = Set(required(&request.code, "code")?);
        active.swift = Set(clean(&request.swift));
        active.updated_at = Set(Utc::now().into());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Number of suppliers whose `bank_code` names this bank.
    pub async fn supplier_count(&self, bank: &bank::Model) -> Result<u64, RepositoryError> {
        supplier::Entity::find()
            .filter(supplier::Column::BankCode.eq(bank.code.as_str()))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, bank: bank::Model) -> Result<(), RepositoryError> {
        bank.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

/// Repository for payment methods
pub struct PaymentMethodRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> PaymentMethodRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<payment_method::Model>, RepositoryError> {
        payment_method::Entity::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<payment_method::Model>, RepositoryError> {
        paginate(
            self.db,
            payment_method::Entity::find(),
            (payment_method::Column::CreatedAt, payment_method::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    pub async fn create(
        &self,
        request: &PaymentMethodRequest,
    ) -> Result<payment_method::Model, RepositoryError> {
        let now = Utc::now();
        payment_method::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(required(&request.name, "name")?),
            code: Set(required(&request.code, "code")?),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        method: payment_method::Model,
        request: &PaymentMethodRequest,
    ) -> Result<payment_method::Model, RepositoryError> {
        let mut active = method.into_active_model();
        active.name = Set(required(&request.name, "name")?);
        active.code = Set(required(&request.code, "code")?);
        active.updated_at = Set(Utc::now().into());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, method: payment_method::Model) -> Result<(), RepositoryError> {
        method
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_db;

    fn tax_request(name: &str, rate: i32, is_default: bool) -> TaxRequest {
        TaxRequest {
            name: Some(name.to_string()),
            rate: Some(rate),
            is_default: Some(is_default),
        }
    }

    #[tokio::test]
    async fn only_one_default_tax() {
        let db = setup_db().await;
        let repo = TaxRepository::new(&db);

        let standard = repo.save(None, &tax_request("Základní", 21, true)).await.unwrap();
        let reduced = repo.save(None, &tax_request("Snížená", 12, true)).await.unwrap();

        let standard = repo.find_by_id(standard.id).await.unwrap().unwrap();
        assert!(!standard.is_default);
        assert!(reduced.is_default);
    }

    #[tokio::test]
    async fn duplicate_bank_code_is_a_database_conflict() {
        let db = setup_db().await;
        let repo = BankRepository::new(&db);
        let request = BankRequest {
            name: Some("Česká spořitelna".to_string()),
            code: Some("0800".to_string()),
            swift: None,
        };

        repo.create(&request).await.unwrap();
        let err = repo.create(&request).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
