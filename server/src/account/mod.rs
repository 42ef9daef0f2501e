//! User accounts: registration, login, profile, avatar upload.

pub mod avatar;
pub mod login;
pub mod profile;
pub mod registration;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::db::models::{User, ROLE_ADMIN};

/// Response body shared by register, login, and profile update:
/// the user's public fields plus a bearer token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub is_admin: bool,
    pub token: String,
}

/// Look up a user row by id. Returns Ok(None) when the id does not resolve,
/// which callers translate to 401 for token subjects that no longer exist.
pub fn find_user_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, name, email, password_hash, avatar_url, roles, created_at, updated_at
         FROM users WHERE id = ?1",
        [id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password_hash: row.get(3)?,
                avatar_url: row.get(4)?,
                roles: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        },
    )
    .optional()
}

/// Look up a user row by email (for login and duplicate checks).
pub fn find_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, name, email, password_hash, avatar_url, roles, created_at, updated_at
         FROM users WHERE email = ?1",
        [email],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password_hash: row.get(3)?,
                avatar_url: row.get(4)?,
                roles: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        },
    )
    .optional()
}

/// Role bits for a new registration.
pub fn roles_for_new_user(is_admin: bool) -> i64 {
    if is_admin {
        ROLE_ADMIN
    } else {
        0
    }
}
