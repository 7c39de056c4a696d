pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod seed;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    AccessStore, FormStore, ProfileLinkStore, ReportStore, Store, SubscriptionStore, UserStore,
};
