use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::UserId;
use crate::database::{AccessStore, DatabaseError};

/// Resource kinds a permission can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    User,
    Form,
    Subscription,
    ProfileLink,
    SubscriptionReport,
}

impl Entity {
    pub const ALL: [Entity; 5] = [
        Entity::User,
        Entity::Form,
        Entity::Subscription,
        Entity::ProfileLink,
        Entity::SubscriptionReport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Entity::User => "USER",
            Entity::Form => "FORM",
            Entity::Subscription => "SUBSCRIPTION",
            Entity::ProfileLink => "PROFILE_LINK",
            Entity::SubscriptionReport => "SUBSCRIPTION_REPORT",
        }
    }
}

/// Request verbs a permission can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verb {
    Options,
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Options, Verb::Get, Verb::Post, Verb::Put, Verb::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Options => "OPTIONS",
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

/// A named grant, rendered as `<ENTITY>-<VERB>` (e.g. `FORM-POST`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permission {
    pub entity: Entity,
    pub verb: Verb,
}

impl Permission {
    pub const fn new(entity: Entity, verb: Verb) -> Self {
        Self { entity, verb }
    }

    /// Every permission the service knows about, in catalog order
    pub fn catalog() -> impl Iterator<Item = Permission> {
        Entity::ALL
            .into_iter()
            .flat_map(|entity| Verb::ALL.into_iter().map(move |verb| Permission::new(entity, verb)))
    }

    pub fn name(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.entity.as_str(), self.verb.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown permission name '{0}'")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Entity names may contain '_' but never '-', so the last '-' splits verb from entity
        let (entity, verb) = s
            .rsplit_once('-')
            .ok_or_else(|| UnknownPermission(s.to_string()))?;

        let entity = Entity::ALL
            .into_iter()
            .find(|e| e.as_str() == entity)
            .ok_or_else(|| UnknownPermission(s.to_string()))?;
        let verb = Verb::ALL
            .into_iter()
            .find(|v| v.as_str() == verb)
            .ok_or_else(|| UnknownPermission(s.to_string()))?;

        Ok(Permission::new(entity, verb))
    }
}

/// Answers "does user U hold permission P?" over the user → group → permission graph.
///
/// Read-only. A missing chain is a plain `false`; only store failures are errors.
pub struct PermissionResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> PermissionResolver<'a, S>
where
    S: AccessStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn has_permission(&self, user: UserId, permission: Permission) -> Result<bool, DatabaseError> {
        self.has_permission_named(user, &permission.name()).await
    }

    pub async fn has_permission_named(&self, user: UserId, name: &str) -> Result<bool, DatabaseError> {
        if user.is_anonymous() {
            debug!(user = %user, permission = name, "anonymous caller holds no permissions");
            return Ok(false);
        }

        let granted = self.store.user_has_permission(user, name).await?;
        if granted {
            debug!(user = %user, permission = name, "permission granted");
        } else {
            debug!(user = %user, permission = name, "permission not held");
        }
        Ok(granted)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("permission rows missing from the store: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Checks the persisted permission rows against the catalog.
///
/// Missing catalog entries are fatal; extra rows only produce a warning and are
/// returned so callers can report them.
pub async fn verify_catalog<S>(store: &S) -> Result<Vec<String>, CatalogError>
where
    S: AccessStore + ?Sized,
{
    let stored: BTreeSet<String> = store.permission_names().await?.into_iter().collect();

    let missing: Vec<String> = Permission::catalog()
        .map(Permission::name)
        .filter(|name| !stored.contains(name))
        .collect();
    if !missing.is_empty() {
        return Err(CatalogError::Missing(missing));
    }

    let unknown: Vec<String> = stored
        .into_iter()
        .filter(|name| name.parse::<Permission>().is_err())
        .collect();
    for name in &unknown {
        warn!(permission = %name, "stored permission is not part of the catalog");
    }

    Ok(unknown)
}
