use std::collections::BTreeSet;
use thiserror::Error;
use tracing::info;

use super::models::NewUser;
use super::{AccessStore, DatabaseError, Store, UserStore};
use crate::auth::{hash_password, Entity, Permission, Verb};
use crate::config::SeedAccount;

pub const ADMIN_GROUP: &str = "admin";
pub const MEMBER_GROUP: &str = "user";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error("failed to hash seed password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    /// Catalog rows that did not exist before this run
    pub permissions_created: usize,
    pub admin_created: bool,
}

/// What the default member group may do: everything on content, but only
/// read/update/delete on users. Creating accounts stays with `admin`.
pub fn member_permissions() -> impl Iterator<Item = Permission> {
    Permission::catalog().filter(|p| match p.entity {
        Entity::User => matches!(p.verb, Verb::Options | Verb::Get | Verb::Put | Verb::Delete),
        _ => true,
    })
}

/// Brings the permission graph up to the catalog and creates the configured
/// administrator. Safe to run on every start.
pub async fn run<S>(store: &S, admin: Option<&SeedAccount>, bcrypt_cost: u32) -> Result<SeedSummary, SeedError>
where
    S: Store + ?Sized,
{
    let admin_group = store.ensure_group(ADMIN_GROUP, "admin@doka.guide").await?;
    let member_group = store.ensure_group(MEMBER_GROUP, "user@doka.guide").await?;

    let existing: BTreeSet<String> = store.permission_names().await?.into_iter().collect();

    let mut summary = SeedSummary::default();
    for permission in Permission::catalog() {
        let name = permission.name();
        if !existing.contains(&name) {
            summary.permissions_created += 1;
        }
        let id = store.ensure_permission(&name).await?;
        store.grant_permission(admin_group, id).await?;
    }
    for permission in member_permissions() {
        let id = store.ensure_permission(&permission.name()).await?;
        store.grant_permission(member_group, id).await?;
    }

    if let Some(account) = admin {
        let existing = match store.find_user_by_email(&account.email).await {
            Ok(user) => Some(user),
            Err(DatabaseError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        let user = match existing {
            Some(user) => user,
            None => {
                let user = store
                    .create_user(NewUser {
                        nickname: account.nickname.clone(),
                        email: account.email.clone(),
                        password: hash_password(&account.password, bcrypt_cost)?,
                    })
                    .await?;
                info!(user = %user.id, nickname = %user.nickname, "Created administrator account");
                summary.admin_created = true;
                user
            }
        };
        store.add_user_to_group(user.id, admin_group).await?;
    }

    info!(created = summary.permissions_created, "Permission graph seeded");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{verify_catalog, PermissionResolver, UserId};
    use crate::database::MemoryStore;

    fn admin() -> SeedAccount {
        SeedAccount {
            nickname: "admin".into(),
            email: "admin@doka.guide".into(),
            password: "password".into(),
        }
    }

    #[tokio::test]
    async fn seeds_full_catalog_and_admin() {
        let store = MemoryStore::new();
        let summary = run(&store, Some(&admin()), 4).await.unwrap();
        assert_eq!(summary.permissions_created, 25);
        assert!(summary.admin_created);
        assert!(verify_catalog(&store).await.unwrap().is_empty());

        let user = store.find_user_by_email("admin@doka.guide").await.unwrap();
        assert_ne!(user.password, "password");
        let resolver = PermissionResolver::new(&store);
        for p in Permission::catalog() {
            assert!(resolver.has_permission(user.id, p).await.unwrap());
        }
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let store = MemoryStore::new();
        run(&store, Some(&admin()), 4).await.unwrap();
        let again = run(&store, Some(&admin()), 4).await.unwrap();
        assert_eq!(again.permissions_created, 0);
        assert!(!again.admin_created);
        assert_eq!(store.permission_names().await.unwrap().len(), 25);
        assert_eq!(store.list_users(100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn member_group_cannot_create_users() {
        let store = MemoryStore::new();
        run(&store, None, 4).await.unwrap();
        let user = store
            .create_user(NewUser {
                nickname: "reader".into(),
                email: "reader@doka.guide".into(),
                password: "x".into(),
            })
            .await
            .unwrap();
        let group = store.find_group(MEMBER_GROUP).await.unwrap().unwrap();
        store.add_user_to_group(user.id, group.id).await.unwrap();

        let resolver = PermissionResolver::new(&store);
        assert!(resolver.has_permission_named(user.id, "FORM-POST").await.unwrap());
        assert!(resolver.has_permission_named(user.id, "USER-PUT").await.unwrap());
        assert!(!resolver.has_permission_named(user.id, "USER-POST").await.unwrap());
        assert!(!resolver.has_permission_named(UserId(0), "FORM-POST").await.unwrap());
    }
}
