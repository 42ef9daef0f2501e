//! Admin surface: first-boot bootstrap and user/content moderation.

pub mod setup;
pub mod users;

use axum::http::StatusCode;

use crate::auth::middleware::Claims;

/// Gate for /admin routes. 403 when the caller lacks the admin role.
pub fn require_admin(claims: &Claims) -> Result<(), (StatusCode, String)> {
    if claims.is_admin {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            "Access denied: admins only".to_string(),
        ))
    }
}
