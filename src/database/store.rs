use async_trait::async_trait;

use super::models::{
    Form, FormDraft, NewProfileLink, NewReport, NewUser, ProfileLink, Subscription,
    SubscriptionDraft, SubscriptionReport, User, UserGroup,
};
use super::DatabaseError;
use crate::auth::UserId;

/// Credential store: accounts and their bcrypt hashes
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<User, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<User, DatabaseError>;
    async fn list_users(&self, limit: i64) -> Result<Vec<User>, DatabaseError>;
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn update_user(&self, id: UserId, user: NewUser) -> Result<User, DatabaseError>;
    async fn delete_user(&self, id: UserId) -> Result<(), DatabaseError>;
}

/// The user → group → permission graph.
///
/// `user_has_permission` is the only call on the request path; the rest serve
/// seeding, the startup catalog check and `/health`.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// True iff some group of `user` holds the permission called `permission`
    async fn user_has_permission(&self, user: UserId, permission: &str) -> Result<bool, DatabaseError>;

    async fn permission_names(&self) -> Result<Vec<String>, DatabaseError>;

    /// Returns the id of the named permission, creating the row when absent
    async fn ensure_permission(&self, name: &str) -> Result<i64, DatabaseError>;

    async fn ensure_group(&self, name: &str, email: &str) -> Result<i64, DatabaseError>;

    async fn find_group(&self, name: &str) -> Result<Option<UserGroup>, DatabaseError>;

    /// No-op when the pair already exists
    async fn grant_permission(&self, group_id: i64, permission_id: i64) -> Result<(), DatabaseError>;

    /// No-op when the pair already exists
    async fn add_user_to_group(&self, user: UserId, group_id: i64) -> Result<(), DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait FormStore: Send + Sync {
    async fn find_form(&self, id: i64) -> Result<Form, DatabaseError>;
    async fn list_forms(&self, limit: i64) -> Result<Vec<Form>, DatabaseError>;
    async fn create_form(&self, draft: FormDraft) -> Result<Form, DatabaseError>;
    async fn update_form(&self, id: i64, draft: FormDraft) -> Result<Form, DatabaseError>;
    async fn delete_form(&self, id: i64) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_subscription(&self, id: i64) -> Result<Subscription, DatabaseError>;
    async fn list_subscriptions(&self, limit: i64) -> Result<Vec<Subscription>, DatabaseError>;

    /// Inserts the subscription and its profile link together
    async fn create_subscription(
        &self,
        draft: SubscriptionDraft,
        link_hash: String,
    ) -> Result<(Subscription, ProfileLink), DatabaseError>;

    async fn update_subscription(
        &self,
        id: i64,
        draft: SubscriptionDraft,
    ) -> Result<Subscription, DatabaseError>;
    async fn delete_subscription(&self, id: i64) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ProfileLinkStore: Send + Sync {
    async fn find_link(&self, id: i64) -> Result<ProfileLink, DatabaseError>;
    async fn find_link_by_hash(&self, hash: &str) -> Result<ProfileLink, DatabaseError>;
    async fn list_links(&self, limit: i64) -> Result<Vec<ProfileLink>, DatabaseError>;
    async fn create_link(&self, link: NewProfileLink) -> Result<ProfileLink, DatabaseError>;
    async fn delete_link(&self, id: i64) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_report(&self, id: i64) -> Result<SubscriptionReport, DatabaseError>;
    async fn find_report_by_path(&self, path: &str) -> Result<SubscriptionReport, DatabaseError>;
    async fn list_reports(&self, limit: i64) -> Result<Vec<SubscriptionReport>, DatabaseError>;
    async fn create_report(&self, report: NewReport) -> Result<SubscriptionReport, DatabaseError>;
    async fn delete_report(&self, id: i64) -> Result<(), DatabaseError>;
}

/// Everything the HTTP layer needs, as one object-safe bound
pub trait Store:
    UserStore + AccessStore + FormStore + SubscriptionStore + ProfileLinkStore + ReportStore
{
}

impl<T> Store for T where
    T: UserStore + AccessStore + FormStore + SubscriptionStore + ProfileLinkStore + ReportStore
{
}
