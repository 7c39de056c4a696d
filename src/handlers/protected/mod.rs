// handlers/protected/mod.rs - Resource handlers (token required)
//
// Every handler takes a `Subject`, passes the route's capability through the
// gate, and for instance mutations also checks ownership of the loaded row.

pub mod forms;
pub mod profile_links;
pub mod reports;
pub mod subscriptions;
pub mod users;
pub mod utils;
