use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{is_present, owner_rules};
use crate::models::invoice::{self, CURRENCIES, STATUSES};
use crate::models::{client, payment_method, supplier};
use crate::permissions;
use crate::validation::{FormRequest, RequestContext, Validator};

/// Invoice payload for create and update
///
/// A referenced client or supplier must belong to the invoice owner; when
/// no reference is given the inline name and address are required instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InvoiceRequest {
    /// Owner; honoured for admin identities only
    pub user_id: Option<Uuid>,
    /// Unique among the owner's invoices
    #[schema(example = "2024-0001")]
    pub number: Option<String>,
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub client_address: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub supplier_address: Option<String>,
    pub payment_method_id: Option<Uuid>,
    /// Total in minor currency units
    #[schema(example = 1210000)]
    pub amount: Option<i64>,
    #[schema(example = "CZK")]
    pub currency: Option<String>,
    /// `YYYY-MM-DD`
    #[schema(example = "2024-03-01")]
    pub issued_on: Option<String>,
    /// Payment term in days, 0 to 365
    #[schema(example = 14)]
    pub due_in: Option<i32>,
    /// Defaults to `draft`
    #[schema(example = "issued")]
    pub status: Option<String>,
    pub note: Option<String>,
}

#[async_trait]
impl FormRequest for InvoiceRequest {
    const PERMISSION: &'static str = permissions::INVOICES_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        owner_rules(ctx, v, self.user_id).await?;

        if v.required("number", self.number.as_deref()) {
            v.max_len("number", self.number.as_deref(), 32);
        }
        v.unique::<invoice::Entity>(
            ctx.db,
            "number",
            self.number.as_deref().map(str::trim),
            invoice::Column::Number,
            ctx.record_id.map(|id| (invoice::Column::Id, id)),
            ctx.owner_id
                .map(|owner| (invoice::Column::UserId, owner.into())),
        )
        .await?;

        v.owned::<client::Entity>(
            ctx.db,
            "client_id",
            client::Column::Id,
            self.client_id,
            client::Column::UserId,
            ctx.owner_id,
        )
        .await?;
        let has_client = self.client_id.is_some();
        v.required_without("client_name", is_present(&self.client_name), "client_id", has_client);
        v.max_len("client_name", self.client_name.as_deref(), 255);
        v.required_without(
            "client_address",
            is_present(&self.client_address),
            "client_id",
            has_client,
        );
        v.max_len("client_address", self.client_address.as_deref(), 500);

        v.owned::<supplier::Entity>(
            ctx.db,
            "supplier_id",
            supplier::Column::Id,
            self.supplier_id,
            supplier::Column::UserId,
            ctx.owner_id,
        )
        .await?;
        let has_supplier = self.supplier_id.is_some();
        v.required_without(
            "supplier_name",
            is_present(&self.supplier_name),
            "supplier_id",
            has_supplier,
        );
        v.max_len("supplier_name", self.supplier_name.as_deref(), 255);
        v.required_without(
            "supplier_address",
            is_present(&self.supplier_address),
            "supplier_id",
            has_supplier,
        );
        v.max_len("supplier_address", self.supplier_address.as_deref(), 500);

        v.exists::<payment_method::Entity, Uuid>(
            ctx.db,
            "payment_method_id",
            payment_method::Column::Id,
            self.payment_method_id,
            None,
        )
        .await?;

        if v.required_value("amount", self.amount.as_ref()) {
            v.min_value("amount", self.amount, 0);
        }
        if v.required("currency", self.currency.as_deref()) {
            v.one_of("currency", self.currency.as_deref(), &CURRENCIES);
        }
        if v.required("issued_on", self.issued_on.as_deref()) {
            v.date("issued_on", self.issued_on.as_deref());
        }
        if v.required_value("due_in", self.due_in.as_ref()) {
            v.between("due_in", self.due_in, 0, 365);
        }
        v.one_of("status", self.status.as_deref(), &STATUSES);
        v.max_len("note", self.note.as_deref(), 2000);

        Ok(())
    }
}
