//! Shared reference data: taxes, banks and payment methods.

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{BANK_CODE, SLUG, SWIFT};
use crate::models::{bank, payment_method, tax};
use crate::permissions;
use crate::validation::{FormRequest, RequestContext, Validator};

/// Tax rate payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TaxRequest {
    #[schema(example = "Základní sazba")]
    pub name: Option<String>,
    /// Whole percent, 0 to 100
    #[schema(example = 21)]
    pub rate: Option<i32>,
    pub is_default: Option<bool>,
}

#[async_trait]
impl FormRequest for TaxRequest {
    const PERMISSION: &'static str = permissions::TAXES_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        if v.required("name", self.name.as_deref()) {
            v.max_len("name", self.name.as_deref(), 100);
        }
        v.unique::<tax::Entity>(
            ctx.db,
            "name",
            self.name.as_deref().map(str::trim),
            tax::Column::Name,
            ctx.record_id.map(|id| (tax::Column::Id, id)),
            None,
        )
        .await?;

        if v.required_value("rate", self.rate.as_ref()) {
            v.between("rate", self.rate, 0, 100);
        }

        Ok(())
    }
}

/// Bank payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BankRequest {
    #[schema(example = "Česká spořitelna")]
    pub name: Option<String>,
    /// Four-digit national code, unique
    #[schema(example = "0800")]
    pub code: Option<String>,
    #[schema(example = "GIBACZPX")]
    pub swift: Option<String>,
}

#[async_trait]
impl FormRequest for BankRequest {
    const PERMISSION: &'static str = permissions::BANKS_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        if v.required("name", self.name.as_deref()) {
            v.max_len("name", self.name.as_deref(), 255);
        }
        if v.required("code", self.code.as_deref()) {
            v.matches("code", self.code.as_deref(), &BANK_CODE);
        }
        v.unique::<bank::Entity>(
            ctx.db,
            "code",
            self.code.as_deref().map(str::trim),
            bank::Column::Code,
            ctx.record_id.map(|id| (bank::Column::Id, id)),
            None,
        )
        .await?;
        v.matches("swift", self.swift.as_deref(), &SWIFT);

        Ok(())
    }
}

/// Payment method payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PaymentMethodRequest {
    #[schema(example = "Bankovní převod")]
    pub name: Option<String>,
    /// Lowercase slug, unique
    #[schema(example = "bank_transfer")]
    pub code: Option<String>,
}

#[async_trait]
impl FormRequest for PaymentMethodRequest {
    const PERMISSION: &'static str = permissions::PAYMENT_METHODS_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        let ignore = ctx.record_id.map(|id| (payment_method::Column::Id, id));

        if v.required("name", self.name.as_deref()) {
            v.max_len("name", self.name.as_deref(), 100);
        }
        v.unique::<payment_method::Entity>(
            ctx.db,
            "name",
            self.name.as_deref().map(str::trim),
            payment_method::Column::Name,
            ignore,
            None,
        )
        .await?;

        if v.required("code", self.code.as_deref()) {
            v.max_len("code", self.code.as_deref(), 50);
            v.matches("code", self.code.as_deref(), &SLUG);
        }
        v.unique::<payment_method::Entity>(
            ctx.db,
            "code",
            self.code.as_deref().map(str::trim),
            payment_method::Column::Code,
            ignore,
            None,
        )
        .await?;

        Ok(())
    }
}
