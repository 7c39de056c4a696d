use bcrypt::{hash, verify, BcryptError};
use tracing::warn;

pub fn hash_password(plain: &str, cost: u32) -> Result<String, BcryptError> {
    hash(plain, cost)
}

/// Constant outcome for any failure: a corrupt stored hash is just a mismatch
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    match verify(plain, hashed) {
        Ok(matches) => matches,
        Err(e) => {
            warn!("password hash could not be checked: {}", e);
            false
        }
    }
}
