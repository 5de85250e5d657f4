//! # Expense Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use super::{Page, paginate, parse_date};
use crate::cursor::CursorData;
use crate::error::RepositoryError;
use crate::models::expense::{
    self, ActiveModel as ExpenseActiveModel, Entity as Expense, Model as ExpenseModel,
};
use crate::requests::{ExpenseRequest, clean};

/// Repository for Expense database operations
pub struct ExpenseRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ExpenseRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ExpenseModel>, RepositoryError> {
        Expense::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        owner: Option<Uuid>,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<ExpenseModel>, RepositoryError> {
        let mut query = Expense::find();
        if let Some(owner) = owner {
            query = query.filter(expense::Column::UserId.eq(owner));
        }
        paginate(
            self.db,
            query,
            (expense::Column::CreatedAt, expense::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    pub async fn create(
        &self,
        owner: Uuid,
        request: &ExpenseRequest,
    ) -> Result<ExpenseModel, RepositoryError> {
        let now = Utc::now();
        let mut active = ExpenseActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now.into()),
            ..Default::default()
        };
        apply(&mut active, owner, request)?;
        active.updated_at = Set(now.into());

        active
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        expense: ExpenseModel,
        owner: Uuid,
        request: &ExpenseRequest,
    ) -> Result<ExpenseModel, RepositoryError> {
        let mut active = expense.into_active_model();
        apply(&mut active, owner, request)?;
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, expense: ExpenseModel) -> Result<(), RepositoryError> {
        expense
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

fn apply(
    active: &mut ExpenseActiveModel,
    owner: Uuid,
    request: &ExpenseRequest,
) -> Result<(), RepositoryError> {
    let description = clean(&request.description)
        .ok_or_else(|| RepositoryError::validation_error("description is required"))?;
    let currency = clean(&request.currency)
        .ok_or_else(|| RepositoryError::validation_error("currency is required"))?;
    let amount = request
        .amount
        .ok_or_else(|| RepositoryError::validation_error("amount is required"))?;

    active.user_id = Set(owner);
    active.supplier_id = Set(request.supplier_id);
    active.description = Set(description);
    active.amount = Set(amount);
    active.currency = Set(currency);
    active.spent_on = Set(parse_date("spent_on", request.spent_on.as_deref())?);
    active.tax_id = Set(request.tax_id);
    Ok(())
}
