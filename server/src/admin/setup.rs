//! First-boot admin bootstrap.
//!
//! With no users registered there is no in-band way to mint an admin, so the
//! server generates a one-shot setup token, logs it once, and stores only its
//! hash. The first registration presenting that token gets the admin role.

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::db::DbPool;

/// Generate a 32-byte random setup token, hex-encoded (64 chars).
pub fn generate_setup_token() -> String {
    let token_bytes: [u8; 32] = rand::rng().random();
    hex::encode(token_bytes)
}

/// Hash a setup token with SHA-256 for storage.
pub fn hash_setup_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check if the server needs initial setup (no users exist).
/// If so, generate a setup token, store its hash, and return the plaintext.
/// A restart before the first registration re-generates the token, since
/// the old plaintext is lost once logged.
pub fn maybe_generate_setup_token(db: &DbPool) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let conn = db.lock().map_err(|e| format!("DB lock error: {}", e))?;

    let user_count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    if user_count > 0 {
        return Ok(None);
    }

    let token = generate_setup_token();
    let hash = hash_setup_token(&token);
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES ('setup_token_hash', ?1)",
        [&hash],
    )?;

    Ok(Some(token))
}

/// Verify a setup token against the stored hash.
/// Returns false once the token has been consumed.
pub fn verify_setup_token(db: &DbPool, token: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let conn = db.lock().map_err(|e| format!("DB lock error: {}", e))?;

    let stored_hash: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = 'setup_token_hash'",
            [],
            |row| row.get(0),
        )
        .ok();

    match stored_hash {
        Some(hash) => Ok(hash == hash_setup_token(token)),
        None => Ok(false),
    }
}

/// Consume the setup token after the first admin claims it.
pub fn consume_setup_token(db: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = db.lock().map_err(|e| format!("DB lock error: {}", e))?;
    conn.execute("DELETE FROM settings WHERE key = 'setup_token_hash'", [])?;
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES ('setup_complete', 'true')",
        [],
    )?;
    Ok(())
}
