pub mod gate;
pub mod password;
pub mod permissions;
pub mod token;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::DatabaseError;

pub use gate::Gate;
pub use password::{hash_password, verify_password};
pub use permissions::{verify_catalog, CatalogError, Entity, Permission, PermissionResolver, Verb};
pub use token::{Claims, TokenCodec, TokenError};

/// User identifier as stored in `users.id`.
///
/// Zero (and anything below it) is the anonymous sentinel: it never names a real
/// account and never holds a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub const ANONYMOUS: UserId = UserId(0);

    pub fn is_anonymous(self) -> bool {
        self.0 <= 0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user identifier carried by a validated token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject(pub UserId);

impl Subject {
    pub fn id(self) -> UserId {
        self.0
    }
}

/// Why a request was refused by authentication or authorization.
///
/// The token kinds collapse to one outward `Unauthorized`, the two denial kinds
/// to one `Forbidden`; only logs see the difference.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,

    #[error("malformed token")]
    MalformedToken,

    #[error("expired token")]
    ExpiredToken,

    #[error("bad token signature")]
    BadSignature,

    #[error("permission '{0}' denied")]
    PermissionDenied(Permission),

    #[error("caller is not the resource author")]
    NotOwner,

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::BadSignature => AuthError::BadSignature,
            TokenError::Malformed(_) => AuthError::MalformedToken,
            // Signing failures only happen on issue; a validate path never yields them
            TokenError::MissingSecret | TokenError::Signing(_) => AuthError::MalformedToken,
        }
    }
}

impl AuthError {
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::MalformedToken
                | AuthError::ExpiredToken
                | AuthError::BadSignature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_negative_ids_are_anonymous() {
        assert!(UserId::ANONYMOUS.is_anonymous());
        assert!(UserId(-4).is_anonymous());
        assert!(!UserId(1).is_anonymous());
    }

    #[test]
    fn token_errors_map_to_authentication_kinds() {
        assert!(matches!(AuthError::from(TokenError::Expired), AuthError::ExpiredToken));
        assert!(matches!(AuthError::from(TokenError::BadSignature), AuthError::BadSignature));
        assert!(matches!(
            AuthError::from(TokenError::Malformed("x".into())),
            AuthError::MalformedToken
        ));
        assert!(AuthError::MissingToken.is_authentication());
        assert!(!AuthError::NotOwner.is_authentication());
    }
}
