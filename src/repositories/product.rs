//! # Product Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use super::{Page, paginate};
use crate::cursor::CursorData;
use crate::error::RepositoryError;
use crate::models::product::{
    self, ActiveModel as ProductActiveModel, Entity as Product, Model as ProductModel,
};
use crate::requests::{ProductRequest, clean};

/// Repository for Product database operations
pub struct ProductRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ProductRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductModel>, RepositoryError> {
        Product::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        owner: Option<Uuid>,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<ProductModel>, RepositoryError> {
        let mut query = Product::find();
        if let Some(owner) = owner {
            query = query.filter(product::Column::UserId.eq(owner));
        }
        paginate(
            self.db,
            query,
            (product::Column::CreatedAt, product::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    pub async fn create(
        &self,
        owner: Uuid,
        request: &ProductRequest,
    ) -> Result<ProductModel, RepositoryError> {
        let now = Utc::now();
        let mut active = ProductActiveModel {
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
        product: ProductModel,
        owner: Uuid,
        request: &ProductRequest,
    ) -> Result<ProductModel, RepositoryError> {
        let mut active = product.into_active_model();
        apply(&mut active, owner, request)?;
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, product: ProductModel) -> Result<(), RepositoryError> {
        product
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

fn apply(
    active: &mut ProductActiveModel,
    owner: Uuid,
    request: &ProductRequest,
) -> Result<(), RepositoryError> {
    let name = clean(&request.name).ok_or_else(|| RepositoryError::validation_error("name is required"))?;
    let price = request
        .price
        .ok_or_else(|| RepositoryError::validation_error("price is required"))?;

    active.user_id = Set(owner);
    active.name = Set(name);
    active.sku = Set(clean(&request.sku));
    active.unit = Set(clean(&request.unit));
    active.price = Set(price);
    active.tax_id = Set(request.tax_id);
    active.description = Set(clean(&request.description));
    Ok(())
}
