//! Role and permission management payloads.
//!
//! Names are unique within a guard only, so `admin` may exist under both
//! `backpack` and `web`.

use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::PERMISSION_NAME;
use crate::auth::Guard;
use crate::models::{permission, role};
use crate::permissions;
use crate::validation::{FormRequest, RequestContext, Validator};

fn guard_names() -> [&'static str; 2] {
    Guard::ALL.map(Guard::as_str)
}

/// Role payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RoleRequest {
    #[schema(example = "accountant")]
    pub name: Option<String>,
    #[schema(example = "web")]
    pub guard_name: Option<String>,
    /// Permission ids granted by the role; each must share its guard
    pub permissions: Option<Vec<Uuid>>,
}

impl RoleRequest {
    pub fn guard(&self) -> Option<Guard> {
        self.guard_name.as_deref().and_then(|g| g.trim().parse().ok())
    }
}

#[async_trait]
impl FormRequest for RoleRequest {
    const PERMISSION: &'static str = permissions::ROLES_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        if v.required("guard_name", self.guard_name.as_deref()) {
            v.one_of("guard_name", self.guard_name.as_deref().map(str::trim), &guard_names());
        }
        let guard = self.guard();

        if v.required("name", self.name.as_deref()) {
            v.max_len("name", self.name.as_deref(), 100);
        }
        if let Some(guard) = guard {
            v.unique::<role::Entity>(
                ctx.db,
                "name",
                self.name.as_deref().map(str::trim),
                role::Column::Name,
                ctx.record_id.map(|id| (role::Column::Id, id)),
                Some((role::Column::GuardName, guard.as_str().into())),
            )
            .await?;
            v.exists_all::<permission::Entity>(
                ctx.db,
                "permissions",
                permission::Column::Id,
                self.permissions.as_deref(),
                Some((permission::Column::GuardName, guard.as_str().into())),
            )
            .await?;
        }

        Ok(())
    }
}

/// Permission payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PermissionRequest {
    /// Dotted lowercase name
    #[schema(example = "reports.view")]
    pub name: Option<String>,
    #[schema(example = "backpack")]
    pub guard_name: Option<String>,
}

impl PermissionRequest {
    pub fn guard(&self) -> Option<Guard> {
        self.guard_name.as_deref().and_then(|g| g.trim().parse().ok())
    }
}

#[async_trait]
impl FormRequest for PermissionRequest {
    const PERMISSION: &'static str = permissions::PERMISSIONS_MANAGE;

    async fn rules(&self, ctx: &RequestContext<'_>, v: &mut Validator) -> Result<(), DbErr> {
        if v.required("guard_name", self.guard_name.as_deref()) {
            v.one_of("guard_name", self.guard_name.as_deref().map(str::trim), &guard_names());
        }

        if v.required("name", self.name.as_deref()) {
            v.max_len("name", self.name.as_deref(), 100);
            v.matches("name", self.name.as_deref().map(str::trim), &PERMISSION_NAME);
        }
        if let Some(guard) = self.guard() {
            v.unique::<permission::Entity>(
                ctx.db,
                "name",
                self.name.as_deref().map(str::trim),
                permission::Column::Name,
                ctx.record_id.map(|id| (permission::Column::Id, id)),
                Some((permission::Column::GuardName, guard.as_str().into())),
            )
            .await?;
        }

        Ok(())
    }
}
