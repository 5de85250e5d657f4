//! Role and permission seeding
//!
//! Creates every permission under the `backpack` guard and the frontend
//! subset under `web`, then the `admin` and `customer` roles granting them.

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::{Guard, hash_password};
use crate::config::AppConfig;
use crate::permissions::{self, ADMIN_ROLE, CUSTOMER_ROLE};
use crate::repositories::{NewUser, RbacRepository, UserRepository};

/// Seeds permissions for both guards and the two default roles
pub async fn seed_roles_and_permissions(db: &DatabaseConnection) -> Result<()> {
    seed_role(db, ADMIN_ROLE, Guard::Backpack, &permissions::ALL).await?;
    seed_role(db, CUSTOMER_ROLE, Guard::Web, &permissions::FRONTEND).await?;
    log::info!("Role and permission seeding completed");
    Ok(())
}

async fn seed_role(
    db: &DatabaseConnection,
    role_name: &str,
    guard: Guard,
    names: &[&str],
) -> Result<()> {
    let rbac = RbacRepository::new(db);

    let mut permission_ids: Vec<Uuid> = Vec::with_capacity(names.len());
    for name in names {
        let permission = rbac
            .find_or_create_permission(name, guard)
            .await
            .with_context(|| format!("Failed to seed permission '{name}' ({guard})"))?;
        permission_ids.push(permission.id);
    }

    let role = rbac
        .find_or_create_role(role_name, guard)
        .await
        .with_context(|| format!("Failed to seed role '{role_name}' ({guard})"))?;

    // Grants added by hand through the admin API are kept.
    let mut granted = rbac.role_permission_ids(role.id).await?;
    let missing: Vec<Uuid> = permission_ids
        .into_iter()
        .filter(|id| !granted.contains(id))
        .collect();
    if !missing.is_empty() {
        log::info!(
            "Granting {} permission(s) to role '{}' ({})",
            missing.len(),
            role_name,
            guard
        );
        granted.extend(missing);
        rbac.sync_role_permissions(role.id, &granted).await?;
    }

    Ok(())
}

/// Creates the bootstrap administrator named by `admin_email` and
/// `admin_password`, or makes sure an existing one holds the `admin` role.
/// Does nothing when either setting is absent.
pub async fn seed_admin(db: &DatabaseConnection, config: &AppConfig) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        log::info!("No bootstrap admin configured, skipping");
        return Ok(());
    };

    let users = UserRepository::new(db);
    let user = match users.find_by_email(email).await? {
        Some(user) => {
            log::info!("Bootstrap admin '{}' already exists", user.email);
            user
        }
        None => {
            log::info!("Creating bootstrap admin '{}'", email);
            users
                .create(NewUser {
                    name: "Administrator".to_string(),
                    email: email.clone(),
                    password_hash: hash_password(password)?,
                    locale: config.locale().to_string(),
                    is_active: true,
                })
                .await
                .context("Failed to create bootstrap admin")?
        }
    };

    let rbac = RbacRepository::new(db);
    let role = rbac.find_or_create_role(ADMIN_ROLE, Guard::Backpack).await?;
    rbac.assign_role(user.id, role.id).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_db;

    #[tokio::test]
    async fn seeding_is_idempotent_and_partitions_guards() {
        let db = setup_db().await;

        seed_roles_and_permissions(&db).await.unwrap();
        seed_roles_and_permissions(&db).await.unwrap();

        let rbac = RbacRepository::new(&db);
        assert_eq!(
            rbac.permissions_in_guard(Guard::Backpack).await.unwrap().len(),
            permissions::ALL.len()
        );
        assert_eq!(
            rbac.permissions_in_guard(Guard::Web).await.unwrap().len(),
            permissions::FRONTEND.len()
        );

        let customer = rbac
            .find_role_by_name(CUSTOMER_ROLE, Guard::Web)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            rbac.role_permission_ids(customer.id).await.unwrap().len(),
            permissions::FRONTEND.len()
        );
    }

    #[tokio::test]
    async fn bootstrap_admin_gets_backpack_permissions() {
        let db = setup_db().await;
        seed_roles_and_permissions(&db).await.unwrap();

        let config = AppConfig {
            admin_email: Some("Admin@Example.cz".to_string()),
            admin_password: Some("change-me-please".to_string()),
            ..Default::default()
        };
        seed_admin(&db, &config).await.unwrap();
        seed_admin(&db, &config).await.unwrap();

        let admin = UserRepository::new(&db)
            .find_by_email("admin@example.cz")
            .await
            .unwrap()
            .unwrap();
        let rbac = RbacRepository::new(&db);

        assert!(rbac.has_role_in_guard(admin.id, Guard::Backpack).await.unwrap());
        assert!(!rbac.has_role_in_guard(admin.id, Guard::Web).await.unwrap());
        let granted = rbac
            .permission_names_for_user(admin.id, Guard::Backpack)
            .await
            .unwrap();
        assert!(granted.contains(permissions::USERS_MANAGE));
        assert!(
            rbac.permission_names_for_user(admin.id, Guard::Web)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn missing_admin_settings_skip_bootstrap() {
        let db = setup_db().await;
        seed_admin(&db, &AppConfig::default()).await.unwrap();

        let page = UserRepository::new(&db).list(10, None).await.unwrap();
        assert!(page.items.is_empty());
    }
}
