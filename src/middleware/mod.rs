pub mod auth;
pub mod response;

pub use auth::{authenticate, require_auth};
pub use response::{ApiResponse, ApiResult};
