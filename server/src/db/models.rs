/// Database row types shared across handlers.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.

/// Role bitfield constants
pub const ROLE_ADMIN: i64 = 1;

/// User record in the users table
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub roles: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles & ROLE_ADMIN != 0
    }
}

/// Notification kinds (the `kind` column on notifications)
pub const KIND_LIKE: &str = "like";
pub const KIND_COMMENT: &str = "comment";
