//! Clients and suppliers share their contact block; suppliers add bank details.

use async_trait::async_trait;
use sea_orm::{DbErr, EntityTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    ACCOUNT_NUMBER, BANK_CODE, COMPANY_ID, COUNTRY, IBAN, PHONE, SWIFT, VAT_ID, is_present,
    owner_rules,
};
use crate::models::{bank, client, supplier};
use crate::permissions;
use crate::validation::{FormRequest, RequestContext, Validator};

/// Contact and registration fields common to clients and suppliers
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PartyFields {
    #[schema(example = "Novák s.r.o.")]
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    /// ISO 3166 alpha-2 code
    #[schema(example = "CZ")]
    pub country: Option<String>,
    /// Company registration number (IČO), eight digits
    #[schema(example = "27082440")]
    pub company_id: Option<String>,
    /// VAT identifier (DIČ)
    #[schema(example = "CZ27082440")]
    pub vat_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PartyFields {
    /// `company_id` is unique among the owner's rows of `E`.
    async fn rules<E: EntityTrait>(
        &self,
        ctx: &RequestContext<'_>,
        v: &mut Validator,
        columns: (E::Column, E::Column, E::Column),
    ) -> Result<(), DbErr> {
        let (id_column, owner_column, company_id_column) = columns;

        if v.required("name", self.name.as_deref()) {
            v.max_len("name", self.name.as_deref(), 255);
        }
        v.max_len("street", self.street.as_deref(), 255);
        v.max_len("city", self.city.as_deref(), 255);
        v.max_len("zip", self.zip.as_deref(), 16);
        v.matches("country", self.country.as_deref(), &COUNTRY);
        v.matches("company_id", self.company_id.as_deref(), &COMPANY_ID);
        v.matches("vat_id", self.vat_id.as_deref(), &VAT_ID);
        v.max_len("email", self.email.as_deref(), 255);
        v.email("email", self.email.as_deref());
        v.matches("phone", self.phone.as_deref(), &PHONE);

        v.unique::<E>(
            ctx.db,
            "company_id",
            self.company_id.as_deref().map(str::trim),
            company_id_column,
            ctx.record_id.map(|id| (id_column, id)),
            ctx.owner_id.map(|owner| (owner_column, owner.into())),
        )
        .await
    }
}

/// Client payload for create and update
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ClientRequest {
    /// Owner; honoured for admin identities only
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    pub party: PartyFields,
}

#[async_trait]
impl FormRequest for ClientRequest {
    const PERMISSION: &'static str = permissions::CLIENTS_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        owner_rules(ctx, v, self.user_id).await?;
        self.party
            .rules::<client::Entity>(
                ctx,
                v,
                (
                    client::Column::Id,
                    client::Column::UserId,
                    client::Column::CompanyId,
                ),
            )
            .await
    }
}

/// Supplier payload for create and update
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SupplierRequest {
    /// Owner; honoured for admin identities only
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    pub party: PartyFields,
    /// Domestic account number, `prefix-number`
    #[schema(example = "19-2000145399")]
    pub account_number: Option<String>,
    /// Required with `account_number`; must name a known bank
    #[schema(example = "0800")]
    pub bank_code: Option<String>,
    #[schema(example = "CZ6508000000192000145399")]
    pub iban: Option<String>,
    /// Required with `iban`
    #[schema(example = "GIBACZPX")]
    pub swift: Option<String>,
}

#[async_trait]
impl FormRequest for SupplierRequest {
    const PERMISSION: &'static str = permissions::SUPPLIERS_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        owner_rules(ctx, v, self.user_id).await?;
        self.party
            .rules::<supplier::Entity>(
                ctx,
                v,
                (
                    supplier::Column::Id,
                    supplier::Column::UserId,
                    supplier::Column::CompanyId,
                ),
            )
            .await?;

        v.matches("account_number", self.account_number.as_deref(), &ACCOUNT_NUMBER);
        v.required_with(
            "bank_code",
            is_present(&self.bank_code),
            "account_number",
            is_present(&self.account_number),
        );
        v.matches("bank_code", self.bank_code.as_deref(), &BANK_CODE);
        v.exists::<bank::Entity, String>(
            ctx.db,
            "bank_code",
            bank::Column::Code,
            super::clean(&self.bank_code),
            None,
        )
        .await?;

        v.matches("iban", self.iban.as_deref(), &IBAN);
        v.required_with("swift", is_present(&self.swift), "iban", is_present(&self.iban));
        v.matches("swift", self.swift.as_deref(), &SWIFT);

        Ok(())
    }
}
