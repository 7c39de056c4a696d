use tracing::warn;

use super::{AuthError, Permission, PermissionResolver, Subject, UserId};
use crate::database::AccessStore;

/// Per-handler guard: capability checks through the resolver, ownership checks
/// against a loaded resource's author. Either failure ends the request.
pub struct Gate<'a, S: ?Sized> {
    resolver: PermissionResolver<'a, S>,
    subject: Subject,
}

impl<'a, S> Gate<'a, S>
where
    S: AccessStore + ?Sized,
{
    pub fn new(store: &'a S, subject: Subject) -> Self {
        Self {
            resolver: PermissionResolver::new(store),
            subject,
        }
    }

    pub fn subject(&self) -> UserId {
        self.subject.id()
    }

    /// Capability mode
    pub async fn require(&self, permission: Permission) -> Result<(), AuthError> {
        if self.resolver.has_permission(self.subject.id(), permission).await? {
            return Ok(());
        }
        warn!(user = %self.subject.id(), permission = %permission, "capability denied");
        Err(AuthError::PermissionDenied(permission))
    }

    /// Ownership mode. Group grants never override a mismatch.
    pub fn require_owner(&self, author: UserId) -> Result<(), AuthError> {
        if !self.subject.id().is_anonymous() && self.subject.id() == author {
            return Ok(());
        }
        warn!(user = %self.subject.id(), author = %author, "ownership denied");
        Err(AuthError::NotOwner)
    }

    /// Capability and ownership together, capability first
    pub async fn require_owned(&self, permission: Permission, author: UserId) -> Result<(), AuthError> {
        self.require(permission).await?;
        self.require_owner(author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Entity, Verb};
    use crate::testing::{seeded_store, CountingStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    const FORM_DELETE: Permission = Permission::new(Entity::Form, Verb::Delete);

    #[tokio::test]
    async fn capability_grant_passes() {
        let store = seeded_store().await;
        let gate = Gate::new(&store, Subject(UserId(42)));
        assert!(gate.require(FORM_DELETE).await.is_ok());
    }

    #[tokio::test]
    async fn missing_capability_is_permission_denied() {
        let store = seeded_store().await;
        let gate = Gate::new(&store, Subject(UserId(42)));
        let err = gate
            .require(Permission::new(Entity::User, Verb::Delete))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PermissionDenied(p) if p.to_string() == "USER-DELETE"));
    }

    struct WarnCount(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCount {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn denial_logs_one_warning() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCount(warnings.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = seeded_store().await;
        let gate = Gate::new(&store, Subject(UserId(42)));
        assert!(gate.require(Permission::new(Entity::User, Verb::Delete)).await.is_err());
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn capability_does_not_override_ownership() {
        let store = seeded_store().await;
        store.put_user(9, "nine", "x").await;
        store.add_user_to_group(UserId(9), 2).await.unwrap();

        // user 9 holds FORM-DELETE but the form belongs to user 7
        let gate = Gate::new(&store, Subject(UserId(9)));
        assert!(gate.require(FORM_DELETE).await.is_ok());
        assert!(matches!(
            gate.require_owned(FORM_DELETE, UserId(7)).await,
            Err(AuthError::NotOwner)
        ));
        assert!(gate.require_owned(FORM_DELETE, UserId(9)).await.is_ok());
    }

    #[tokio::test]
    async fn only_the_author_passes_ownership() {
        let store = seeded_store().await;
        let author = UserId(7);
        for caller in [0, 1, 6, 8, 42, -7] {
            let gate = Gate::new(&store, Subject(UserId(caller)));
            assert!(matches!(gate.require_owner(author), Err(AuthError::NotOwner)));
        }
        assert!(Gate::new(&store, Subject(author)).require_owner(author).is_ok());
    }

    #[tokio::test]
    async fn anonymous_owner_never_matches() {
        let store = seeded_store().await;
        let gate = Gate::new(&store, Subject(UserId::ANONYMOUS));
        assert!(gate.require_owner(UserId::ANONYMOUS).is_err());
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_store_error() {
        let store = CountingStore::failing(seeded_store().await);
        let gate = Gate::new(&store, Subject(UserId(42)));
        assert!(matches!(gate.require(FORM_DELETE).await, Err(AuthError::Store(_))));
    }
}
