use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::account::{find_user_by_email, AuthResponse};
use crate::auth::{jwt, password};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /users/login
/// Verify credentials and return the user's public fields plus a fresh token.
/// Unknown email and wrong password both answer 401 with the same message.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = req.email.trim().to_lowercase();
    let db = state.db.clone();
    let jwt_secret = state.jwt_secret.clone();

    let response = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let user = find_user_by_email(&conn, &email)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Lookup user: {}", e)))?
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ))?;

        if !password::verify_password(&req.password, &user.password_hash) {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ));
        }

        let is_admin = user.is_admin();
        let token = jwt::issue_access_token(&jwt_secret, &user.id, &user.name, is_admin)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("JWT: {}", e)))?;

        Ok::<_, (StatusCode, String)>(AuthResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
            is_admin,
            token,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(response))
}
