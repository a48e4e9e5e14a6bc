//! bcrypt password hashing
//!
//! Hashing is CPU bound, so both operations run on the blocking pool.

use crate::errors::{AuthError, DomainError, DomainResult};

/// Hash a plaintext password with the given bcrypt cost
pub async fn hash_password(password: &str, cost: u32) -> DomainResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| DomainError::internal(format!("Hashing task failed: {}", e)))?
        .map_err(|_| DomainError::Auth(AuthError::HashingFailed))
}

/// Check a plaintext password against a stored bcrypt hash.
///
/// A malformed hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> DomainResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| DomainError::internal(format!("Hashing task failed: {}", e)))
}
