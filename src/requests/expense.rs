use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::owner_rules;
use crate::models::invoice::CURRENCIES;
use crate::models::{supplier, tax};
use crate::permissions;
use crate::validation::{FormRequest, RequestContext, Validator};

/// Expense payload for create and update
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ExpenseRequest {
    /// Owner; honoured for admin identities only
    pub user_id: Option<Uuid>,
    /// Must belong to the expense owner
    pub supplier_id: Option<Uuid>,
    #[schema(example = "Office rent, March")]
    pub description: Option<String>,
    /// Amount in minor currency units, greater than zero
    #[schema(example = 1500000)]
    pub amount: Option<i64>,
    #[schema(example = "CZK")]
    pub currency: Option<String>,
    /// `YYYY-MM-DD`
    pub spent_on: Option<String>,
    pub tax_id: Option<Uuid>,
}

#[async_trait]
impl FormRequest for ExpenseRequest {
    const PERMISSION: &'static str = permissions::EXPENSES_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        owner_rules(ctx, v, self.user_id).await?;

        v.owned::<supplier::Entity>(
            ctx.db,
            "supplier_id",
            supplier::Column::Id,
            self.supplier_id,
            supplier::Column::UserId,
            ctx.owner_id,
        )
        .await?;

        if v.required("description", self.description.as_deref()) {
            v.max_len("description", self.description.as_deref(), 500);
        }
        if v.required_value("amount", self.amount.as_ref()) {
            v.min_value("amount", self.amount, 1);
        }
        if v.required("currency", self.currency.as_deref()) {
            v.one_of("currency", self.currency.as_deref(), &CURRENCIES);
        }
        if v.required("spent_on", self.spent_on.as_deref()) {
            v.date("spent_on", self.spent_on.as_deref());
        }
        v.exists::<tax::Entity, Uuid>(ctx.db, "tax_id", tax::Column::Id, self.tax_id, None)
            .await?;

        Ok(())
    }
}
