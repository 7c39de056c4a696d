use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::UserId;

/// Public link to a subscriber's profile, addressed by an opaque hash
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileLink {
    pub id: i64,
    pub hash: String,
    pub author_id: UserId,
    pub profile_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProfileLink {
    pub hash: String,
    pub author_id: UserId,
    pub profile_id: i64,
}

impl NewProfileLink {
    /// Hashes the caller's seed, or fresh randomness when none is given
    pub fn new(seed: Option<&str>, author_id: UserId, profile_id: i64) -> Self {
        let hash = match seed.map(str::trim).filter(|s| !s.is_empty()) {
            Some(seed) => link_hash(seed),
            None => random_hash(),
        };
        Self {
            hash,
            author_id,
            profile_id,
        }
    }
}

/// Hash of fresh randomness, for links nobody chose a seed for
pub fn random_hash() -> String {
    link_hash(&format!("{}{}", Uuid::new_v4(), Uuid::new_v4()))
}

/// Lowercase hex SHA-256
pub fn link_hash(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_hash_is_stable_and_trimmed() {
        let a = NewProfileLink::new(Some("  reader-42 "), UserId(1), 5);
        let b = NewProfileLink::new(Some("reader-42"), UserId(1), 5);
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 64);
        assert_eq!(
            link_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn random_hashes_differ() {
        let a = NewProfileLink::new(None, UserId(1), 5);
        let b = NewProfileLink::new(Some(""), UserId(1), 5);
        assert_ne!(a.hash, b.hash);
    }
}
