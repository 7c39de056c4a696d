use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::models::{
    Form, FormDraft, NewProfileLink, NewReport, NewUser, ProfileLink, Subscription,
    SubscriptionDraft, SubscriptionReport, User, UserGroup,
};
use super::store::{AccessStore, FormStore, ProfileLinkStore, ReportStore, SubscriptionStore, UserStore};
use super::DatabaseError;
use crate::auth::UserId;

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, UserGroup>,
    permissions: BTreeMap<i64, String>,
    group_permissions: Vec<(i64, i64)>,
    grouped_users: Vec<(UserId, i64)>,
    forms: BTreeMap<i64, Form>,
    subscriptions: BTreeMap<i64, Subscription>,
    links: BTreeMap<i64, ProfileLink>,
    reports: BTreeMap<i64, SubscriptionReport>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_user_unique(&self, user: &NewUser, except: Option<i64>) -> Result<(), DatabaseError> {
        for (id, existing) in &self.users {
            if Some(*id) == except {
                continue;
            }
            if existing.nickname == user.nickname {
                return Err(DatabaseError::Conflict("Nickname Already Taken".into()));
            }
            if existing.email == user.email {
                return Err(DatabaseError::Conflict("Email Already Taken".into()));
            }
        }
        Ok(())
    }

    fn insert_link(&mut self, link: NewProfileLink) -> Result<ProfileLink, DatabaseError> {
        if self.links.values().any(|l| l.hash == link.hash) {
            return Err(DatabaseError::Conflict("Link Already Exists".into()));
        }
        let now = Utc::now();
        let row = ProfileLink {
            id: self.next_id(),
            hash: link.hash,
            author_id: link.author_id,
            profile_id: link.profile_id,
            created_at: now,
            updated_at: now,
        };
        self.links.insert(row.id, row.clone());
        Ok(row)
    }

    fn drop_subscription(&mut self, id: i64) {
        self.subscriptions.remove(&id);
        self.links.retain(|_, l| l.profile_id != id);
        self.reports.retain(|_, r| r.profile_id != id);
    }
}

/// Newest first, capped at `limit`
fn newest<T: Clone>(rows: &BTreeMap<i64, T>, limit: i64) -> Vec<T> {
    let limit = usize::try_from(limit).unwrap_or(0);
    rows.values().rev().take(limit).cloned().collect()
}

/// In-process store with the same semantics as the Postgres schema,
/// cascading deletes included. Selected with `DB_DRIVER=memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user row under a fixed id
    #[cfg(test)]
    pub(crate) async fn put_user(&self, id: i64, nickname: &str, password_hash: &str) -> User {
        let mut tables = self.tables.write().await;
        tables.next_id = tables.next_id.max(id);
        let now = Utc::now();
        let row = User {
            id: UserId(id),
            nickname: nickname.to_string(),
            email: format!("{}@doka.guide", nickname),
            password: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, row.clone());
        row
    }

    /// Pushes join rows without the duplicate check, as a table without a
    /// unique constraint would allow
    #[cfg(test)]
    pub(crate) async fn push_join_rows(&self, membership: (UserId, i64), grant: (i64, i64)) {
        let mut tables = self.tables.write().await;
        tables.grouped_users.push(membership);
        tables.group_permissions.push(grant);
    }

    #[cfg(test)]
    pub(crate) async fn join_row_counts(&self) -> (usize, usize) {
        let tables = self.tables.read().await;
        (tables.grouped_users.len(), tables.group_permissions.len())
    }

    /// Inserts a group row under a fixed id
    #[cfg(test)]
    pub(crate) async fn put_group(&self, id: i64, name: &str) {
        let mut tables = self.tables.write().await;
        tables.next_id = tables.next_id.max(id);
        tables.groups.insert(
            id,
            UserGroup {
                id,
                name: name.to_string(),
                email: format!("{}@doka.guide", name),
            },
        );
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> Result<User, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found("User Not Found"))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found("User Not Found"))
    }

    async fn list_users(&self, limit: i64) -> Result<Vec<User>, DatabaseError> {
        Ok(newest(&self.tables.read().await.users, limit))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.check_user_unique(&user, None)?;

        let now = Utc::now();
        let row = User {
            id: UserId(tables.next_id()),
            nickname: user.nickname,
            email: user.email,
            password: user.password,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(row.id.0, row.clone());
        Ok(row)
    }

    async fn update_user(&self, id: UserId, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.check_user_unique(&user, Some(id.0))?;

        let row = tables
            .users
            .get_mut(&id.0)
            .ok_or_else(|| DatabaseError::not_found("User Not Found"))?;
        row.nickname = user.nickname;
        row.email = user.email;
        row.password = user.password;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id.0).is_none() {
            return Err(DatabaseError::not_found("User Not Found"));
        }

        tables.grouped_users.retain(|(user, _)| *user != id);
        tables.forms.retain(|_, f| f.author_id != id);
        let owned: Vec<i64> = tables
            .subscriptions
            .values()
            .filter(|s| s.author_id == id)
            .map(|s| s.id)
            .collect();
        for sub in owned {
            tables.drop_subscription(sub);
        }
        tables.links.retain(|_, l| l.author_id != id);
        tables.reports.retain(|_, r| r.author_id != id);
        Ok(())
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn user_has_permission(&self, user: UserId, permission: &str) -> Result<bool, DatabaseError> {
        let tables = self.tables.read().await;
        if !tables.users.contains_key(&user.0) {
            return Ok(false);
        }

        let granted = tables
            .permissions
            .iter()
            .filter(|(_, name)| name.as_str() == permission)
            .any(|(permission_id, _)| {
                tables
                    .group_permissions
                    .iter()
                    .filter(|(_, p)| p == permission_id)
                    .any(|(group_id, _)| tables.grouped_users.contains(&(user, *group_id)))
            });
        Ok(granted)
    }

    async fn permission_names(&self) -> Result<Vec<String>, DatabaseError> {
        Ok(self.tables.read().await.permissions.values().cloned().collect())
    }

    async fn ensure_permission(&self, name: &str) -> Result<i64, DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some((id, _)) = tables.permissions.iter().find(|(_, n)| n.as_str() == name) {
            return Ok(*id);
        }
        let id = tables.next_id();
        tables.permissions.insert(id, name.to_string());
        Ok(id)
    }

    async fn ensure_group(&self, name: &str, email: &str) -> Result<i64, DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some(group) = tables.groups.values().find(|g| g.name == name) {
            return Ok(group.id);
        }
        let id = tables.next_id();
        tables.groups.insert(
            id,
            UserGroup {
                id,
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        Ok(id)
    }

    async fn find_group(&self, name: &str) -> Result<Option<UserGroup>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.name == name).cloned())
    }

    async fn grant_permission(&self, group_id: i64, permission_id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.group_permissions.contains(&(group_id, permission_id)) {
            tables.group_permissions.push((group_id, permission_id));
        }
        Ok(())
    }

    async fn add_user_to_group(&self, user: UserId, group_id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.grouped_users.contains(&(user, group_id)) {
            tables.grouped_users.push((user, group_id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn find_form(&self, id: i64) -> Result<Form, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .forms
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found("Form Not Found"))
    }

    async fn list_forms(&self, limit: i64) -> Result<Vec<Form>, DatabaseError> {
        Ok(newest(&self.tables.read().await.forms, limit))
    }

    async fn create_form(&self, draft: FormDraft) -> Result<Form, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&draft.author_id.0) {
            return Err(DatabaseError::not_found("User Not Found"));
        }
        let now = Utc::now();
        let row = Form {
            id: tables.next_id(),
            form_type: draft.form_type,
            data: draft.data,
            author_id: draft.author_id,
            created_at: now,
            updated_at: now,
        };
        tables.forms.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_form(&self, id: i64, draft: FormDraft) -> Result<Form, DatabaseError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .forms
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("Form Not Found"))?;
        row.form_type = draft.form_type;
        row.data = draft.data;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_form(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables
            .forms
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::not_found("Form Not Found"))
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find_subscription(&self, id: i64) -> Result<Subscription, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .subscriptions
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found("Subscription Not Found"))
    }

    async fn list_subscriptions(&self, limit: i64) -> Result<Vec<Subscription>, DatabaseError> {
        Ok(newest(&self.tables.read().await.subscriptions, limit))
    }

    async fn create_subscription(
        &self,
        draft: SubscriptionDraft,
        link_hash: String,
    ) -> Result<(Subscription, ProfileLink), DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&draft.author_id.0) {
            return Err(DatabaseError::not_found("User Not Found"));
        }
        if tables.links.values().any(|l| l.hash == link_hash) {
            return Err(DatabaseError::Conflict("Link Already Exists".into()));
        }

        let now = Utc::now();
        let subscription = Subscription {
            id: tables.next_id(),
            email: draft.email,
            data: draft.data,
            author_id: draft.author_id,
            created_at: now,
            updated_at: now,
        };
        tables.subscriptions.insert(subscription.id, subscription.clone());

        let link = tables.insert_link(NewProfileLink {
            hash: link_hash,
            author_id: subscription.author_id,
            profile_id: subscription.id,
        })?;
        Ok((subscription, link))
    }

    async fn update_subscription(
        &self,
        id: i64,
        draft: SubscriptionDraft,
    ) -> Result<Subscription, DatabaseError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .subscriptions
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("Subscription Not Found"))?;
        row.email = draft.email;
        row.data = draft.data;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_subscription(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.subscriptions.contains_key(&id) {
            return Err(DatabaseError::not_found("Subscription Not Found"));
        }
        tables.drop_subscription(id);
        Ok(())
    }
}

#[async_trait]
impl ProfileLinkStore for MemoryStore {
    async fn find_link(&self, id: i64) -> Result<ProfileLink, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .links
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found("Profile Link Not Found"))
    }

    async fn find_link_by_hash(&self, hash: &str) -> Result<ProfileLink, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .links
            .values()
            .find(|l| l.hash == hash)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found("Profile Link Not Found"))
    }

    async fn list_links(&self, limit: i64) -> Result<Vec<ProfileLink>, DatabaseError> {
        Ok(newest(&self.tables.read().await.links, limit))
    }

    async fn create_link(&self, link: NewProfileLink) -> Result<ProfileLink, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.subscriptions.contains_key(&link.profile_id) {
            return Err(DatabaseError::not_found("Subscription Not Found"));
        }
        tables.insert_link(link)
    }

    async fn delete_link(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables
            .links
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::not_found("Profile Link Not Found"))
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn find_report(&self, id: i64) -> Result<SubscriptionReport, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .reports
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found("Subscription Report Not Found"))
    }

    async fn find_report_by_path(&self, path: &str) -> Result<SubscriptionReport, DatabaseError> {
        let tables = self.tables.read().await;
        tables
            .reports
            .values()
            .rev()
            .find(|r| r.path == path)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found("Subscription Report Not Found"))
    }

    async fn list_reports(&self, limit: i64) -> Result<Vec<SubscriptionReport>, DatabaseError> {
        Ok(newest(&self.tables.read().await.reports, limit))
    }

    async fn create_report(&self, report: NewReport) -> Result<SubscriptionReport, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.subscriptions.contains_key(&report.profile_id) {
            return Err(DatabaseError::not_found("Subscription Not Found"));
        }
        let now = Utc::now();
        let row = SubscriptionReport {
            id: tables.next_id(),
            path: report.path,
            author_id: report.author_id,
            profile_id: report.profile_id,
            created_at: now,
            updated_at: now,
        };
        tables.reports.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_report(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables
            .reports
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::not_found("Subscription Report Not Found"))
    }
}
