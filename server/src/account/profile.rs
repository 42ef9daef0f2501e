use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::account::{find_user_by_email, find_user_by_id, AuthResponse};
use crate::auth::jwt;
use crate::auth::middleware::Claims;
use crate::state::AppState;

/// Profile view: the user record sans password hash.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// GET /users/profile
/// Answers 401 when the token's subject no longer exists.
pub async fn get_profile(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let user_id = claims.sub.clone();

    let profile = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let user = find_user_by_id(&conn, &user_id)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Lookup user: {}", e)))?
            .ok_or((StatusCode::UNAUTHORIZED, "User no longer exists".to_string()))?;

        let is_admin = user.is_admin();
        Ok::<_, (StatusCode, String)>(ProfileResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
            is_admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(profile))
}

/// PUT /users/profile
/// Partial update of name/email. An email change is checked for uniqueness
/// against other accounts. Returns the updated record plus a fresh token,
/// since the token embeds the display name.
pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let jwt_secret = state.jwt_secret.clone();
    let user_id = claims.sub.clone();

    let response = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let user = find_user_by_id(&conn, &user_id)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Lookup user: {}", e)))?
            .ok_or((StatusCode::UNAUTHORIZED, "User no longer exists".to_string()))?;

        let new_name = match req.name {
            Some(ref n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => user.name.clone(),
        };

        let new_email = match req.email {
            Some(ref e) if !e.trim().is_empty() => e.trim().to_lowercase(),
            _ => user.email.clone(),
        };

        if new_email != user.email {
            let taken = find_user_by_email(&conn, &new_email)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Lookup email: {}", e)))?;
            if taken.is_some() {
                return Err((StatusCode::BAD_REQUEST, "Email already in use".to_string()));
            }
        }

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE users SET name = ?1, email = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![new_name, new_email, now, user_id],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update user: {}", e)))?;

        let is_admin = user.is_admin();
        let token = jwt::issue_access_token(&jwt_secret, &user_id, &new_name, is_admin)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("JWT: {}", e)))?;

        Ok::<_, (StatusCode, String)>(AuthResponse {
            id: user_id,
            name: new_name,
            email: new_email,
            avatar_url: user.avatar_url,
            is_admin,
            token,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(response))
}
