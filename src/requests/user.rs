use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{permission, role, user};
use crate::permissions;
use crate::validation::{FormRequest, RequestContext, Validator};

pub(crate) const LOCALES: [&str; 3] = ["cs", "sk", "en"];

/// Admin user management payload
///
/// `roles` and `permissions` replace the user's current assignments when
/// given; omit them to leave assignments untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserRequest {
    #[schema(example = "Jana Nováková")]
    pub name: Option<String>,
    #[schema(example = "jana@example.cz")]
    pub email: Option<String>,
    /// Required on create; on update a new password replaces the old one
    pub password: Option<String>,
    #[schema(example = "cs")]
    pub locale: Option<String>,
    pub is_active: Option<bool>,
    pub roles: Option<Vec<Uuid>>,
    pub permissions: Option<Vec<Uuid>>,
}

#[async_trait]
impl FormRequest for UserRequest {
    const PERMISSION: &'static str = permissions::USERS_MANAGE;

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
            ctx.record_id.map(|id| (user::Column::Id, id)),
            None,
        )
        .await?;

        if !ctx.is_update() {
            v.required("password", self.password.as_deref());
        }
        v.min_len("password", self.password.as_deref(), 8);
        v.max_len("password", self.password.as_deref(), 255);
        v.one_of("locale", self.locale.as_deref(), &LOCALES);

        v.exists_all::<role::Entity>(ctx.db, "roles", role::Column::Id, self.roles.as_deref(), None)
            .await?;
        v.exists_all::<permission::Entity>(
            ctx.db,
            "permissions",
            permission::Column::Id,
            self.permissions.as_deref(),
            None,
        )
        .await?;

        Ok(())
    }
}
