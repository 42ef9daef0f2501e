//! Password hashing with bcrypt.

use bcrypt::{hash, verify, DEFAULT_COST};

/// Hash a plaintext password for storage.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

/// Check a plaintext password against a stored hash.
/// A malformed stored hash counts as a failed check.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    verify(password, stored_hash).unwrap_or(false)
}
