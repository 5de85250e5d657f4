use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::owner_rules;
use crate::models::{product, tax};
use crate::permissions;
use crate::validation::{FormRequest, RequestContext, Validator};

/// Product payload for create and update
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductRequest {
    /// Owner; honoured for admin identities only
    pub user_id: Option<Uuid>,
    #[schema(example = "Konzultace")]
    pub name: Option<String>,
    /// Unique among the owner's products when present
    pub sku: Option<String>,
    #[schema(example = "hod")]
    pub unit: Option<String>,
    /// Unit price in minor currency units
    #[schema(example = 150000)]
    pub price: Option<i64>,
    pub tax_id: Option<Uuid>,
    pub description: Option<String>,
}

#[async_trait]
impl FormRequest for ProductRequest {
    const PERMISSION: &'static str = permissions::PRODUCTS_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        owner_rules(ctx, v, self.user_id).await?;

        if v.required("name", self.name.as_deref()) {
            v.max_len("name", self.name.as_deref(), 255);
        }
        v.max_len("sku", self.sku.as_deref(), 64);
        v.unique::<product::Entity>(
            ctx.db,
            "sku",
            self.sku.as_deref().map(str::trim),
            product::Column::Sku,
            ctx.record_id.map(|id| (product::Column::Id, id)),
            ctx.owner_id
                .map(|owner| (product::Column::UserId, owner.into())),
        )
        .await?;
        v.max_len("unit", self.unit.as_deref(), 16);

        if v.required_value("price", self.price.as_ref()) {
            v.min_value("price", self.price, 0);
        }
        v.exists::<tax::Entity, Uuid>(ctx.db, "tax_id", tax::Column::Id, self.tax_id, None)
            .await?;
        v.max_len("description", self.description.as_deref(), 2000);

        Ok(())
    }
}
