//! Guest payloads: registration and login.

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::user::LOCALES;
use crate::auth::Identity;
use crate::models::user;
use crate::validation::{FormRequest, RequestContext, Validator};

/// Self-service registration for the frontend
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Jana Nováková")]
    pub name: Option<String>,
    #[schema(example = "jana@example.cz")]
    pub email: Option<String>,
    #[schema(example = "correct horse battery")]
    pub password: Option<String>,
    #[schema(example = "cs")]
    pub locale: Option<String>,
}

#[async_trait]
impl FormRequest for RegisterRequest {
    const PERMISSION: &'static str = "";

    fn authorize(&self, _identity: Option<&Identity>) -> bool {
        true
    }

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        if v.required("name", self.name.as_deref()) {
            v.max_len("name", self.name.as_deref(), 255);
        }
        if v.required("email", self.email.as_deref()) {
            v.max_len("email", self.email.as_deref(), 255);
            v.email("email", self.email.as_deref());
        }
        v.unique::<user::Entity>(
            ctx.db,
            "email",
            self.email.as_deref().map(|e| e.trim()).map(str::to_lowercase).as_deref(),
            user::Column::Email,
            None,
            None,
        )
        .await?;
        if v.required("password", self.password.as_deref()) {
            v.min_len("password", self.password.as_deref(), 8);
            v.max_len("password", self.password.as_deref(), 255);
        }
        v.one_of("locale", self.locale.as_deref(), &LOCALES);

        Ok(())
    }
}

/// Credentials for either guard's login endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jana@example.cz")]
    pub email: Option<String>,
    pub password: Option<String>,
}

#[async_trait]
impl FormRequest for LoginRequest {
    const PERMISSION: &'static str = "";

    fn authorize(&self, _identity: Option<&Identity>) -> bool {
        true
    }

    async fn rules(&self, _ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        if v.required("email", self.email.as_deref()) {
            v.email("email", self.email.as_deref());
        }
        v.required("password", self.password.as_deref());
        Ok(())
    }
}
