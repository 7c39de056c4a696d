pub mod form;
pub mod group;
pub mod profile_link;
pub mod report;
pub mod subscription;
pub mod user;

pub use form::{Form, FormDraft};
pub use group::UserGroup;
pub use profile_link::{NewProfileLink, ProfileLink};
pub use report::{NewReport, SubscriptionReport};
pub use subscription::{Subscription, SubscriptionDraft};
pub use user::{NewUser, User};
