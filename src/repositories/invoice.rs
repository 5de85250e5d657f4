//! # Invoice Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use super::{Page, paginate, parse_date};
use crate::cursor::CursorData;
use crate::error::RepositoryError;
use crate::models::invoice::{
    self, ActiveModel as InvoiceActiveModel, Entity as Invoice, Model as InvoiceModel,
    STATUS_DRAFT,
};
use crate::requests::{InvoiceRequest, clean};

/// Repository for Invoice database operations
pub struct InvoiceRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> InvoiceRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<InvoiceModel>, RepositoryError> {
        Invoice::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Lists invoices for an owner (or all owners), optionally by status.
    pub async fn list(
        &self,
        owner: Option<Uuid>,
        status: Option<&str>,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<InvoiceModel>, RepositoryError> {
        let mut query = Invoice::find();
        if let Some(owner) = owner {
            query = query.filter(invoice::Column::UserId.eq(owner));
        }
        if let Some(status) = status {
            query = query.filter(invoice::Column::Status.eq(status));
        }
        paginate(
            self.db,
            query,
            (invoice::Column::CreatedAt, invoice::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    pub async fn create(
        &self,
        owner: Uuid,
        request: &InvoiceRequest,
    ) -> Result<InvoiceModel, RepositoryError> {
        let now = Utc::now();
        let mut active = InvoiceActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now.into()),
            ..Default::default()
        };
        apply(&mut active, owner, request, STATUS_DRAFT)?;
        active.updated_at = Set(now.into());

        active
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Replaces the invoice's fields; an omitted status keeps the current one.
    pub async fn update(
        &self,
        invoice: InvoiceModel,
        owner: Uuid,
        request: &InvoiceRequest,
    ) -> Result<InvoiceModel, RepositoryError> {
        let current_status = invoice.status.clone();
        let mut active = invoice.into_active_model();
        apply(&mut active, owner, request, &current_status)?;
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, invoice: InvoiceModel) -> Result<(), RepositoryError> {
        invoice
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

fn apply(
    active: &mut InvoiceActiveModel,
    owner: Uuid,
    request: &InvoiceRequest,
    fallback_status: &str,
) -> Result<(), RepositoryError> {
    let number =
        clean(&request.number).ok_or_else(|| RepositoryError::validation_error("number is required"))?;
    let currency = clean(&request.currency)
        .ok_or_else(|| RepositoryError::validation_error("currency is required"))?;
    let amount = request
        .amount
        .ok_or_else(|| RepositoryError::validation_error("amount is required"))?;
    let due_in = request
        .due_in
        .ok_or_else(|| RepositoryError::validation_error("due_in is required"))?;
    let issued_on = parse_date("issued_on", request.issued_on.as_deref())?;

    active.user_id = Set(owner);
    active.number = Set(number);
    active.client_id = Set(request.client_id);
    active.client_name = Set(clean(&request.client_name));
    active.client_address = Set(clean(&request.client_address));
    active.supplier_id = Set(request.supplier_id);
    active.supplier_name = Set(clean(&request.supplier_name));
    active.supplier_address = Set(clean(&request.supplier_address));
    active.payment_method_id = Set(request.payment_method_id);
    active.amount = Set(amount);
    active.currency = Set(currency);
    active.issued_on = Set(issued_on);
    active.due_in = Set(due_in);
    active.status = Set(clean(&request.status).unwrap_or_else(|| fallback_status.to_string()));
    active.note = Set(clean(&request.note));
    Ok(())
}
