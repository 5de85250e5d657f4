//! # Supplier Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{Page, paginate};
use crate::cursor::CursorData;
use crate::error::RepositoryError;
use crate::models::invoice;
use crate::models::supplier::{
    self, ActiveModel as SupplierActiveModel, Entity as Supplier, Model as SupplierModel,
};
use crate::requests::{SupplierRequest, clean};

/// Repository for Supplier database operations
pub struct SupplierRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SupplierRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SupplierModel>, RepositoryError> {
        Supplier::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        owner: Option<Uuid>,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<SupplierModel>, RepositoryError> {
        let mut query = Supplier::find();
        if let Some(owner) = owner {
            query = query.filter(supplier::Column::UserId.eq(owner));
        }
        paginate(
            self.db,
            query,
            (supplier::Column::CreatedAt, supplier::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    pub async fn create(
        &self,
        owner: Uuid,
        request: &SupplierRequest,
    ) -> Result<SupplierModel, RepositoryError> {
        let now = Utc::now();
        let mut active = SupplierActiveModel {
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
        supplier: SupplierModel,
        owner: Uuid,
        request: &SupplierRequest,
    ) -> Result<SupplierModel, RepositoryError> {
        let mut active = supplier.into_active_model();
        apply(&mut active, owner, request)?;
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Deletes the supplier. Invoices referencing it keep the party inline:
    /// its name and address are copied over and the reference is cleared.
    pub async fn delete(&self, supplier: SupplierModel) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        invoice::Entity::update_many()
            .col_expr(invoice::Column::SupplierName, Expr::value(supplier.name.clone()))
            .col_expr(invoice::Column::SupplierAddress, Expr::value(supplier.postal_address()))
            .col_expr(invoice::Column::SupplierId, Expr::value(Option::<Uuid>::None))
            .filter(invoice::Column::SupplierId.eq(supplier.id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        supplier
            .delete(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        txn.commit().await.map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

fn apply(
    active: &mut SupplierActiveModel,
    owner: Uuid,
    request: &SupplierRequest,
) -> Result<(), RepositoryError> {
    let party = &request.party;
    let name = clean(&party.name).ok_or_else(|| RepositoryError::validation_error("name is required"))?;

    active.user_id = Set(owner);
    active.name = Set(name);
    active.street = Set(clean(&party.street));
    active.city = Set(clean(&party.city));
    active.zip = Set(clean(&party.zip));
    active.country = Set(clean(&party.country));
    active.company_id = Set(clean(&party.company_id));
    active.vat_id = Set(clean(&party.vat_id));
    active.email = Set(clean(&party.email));
    active.phone = Set(clean(&party.phone));
    active.account_number = Set(clean(&request.account_number));
    active.bank_code = Set(clean(&request.bank_code));
    active.iban = Set(clean(&request.iban).map(|iban| iban.replace(' ', "")));
    active.swift = Set(clean(&request.swift));
    Ok(())
}
