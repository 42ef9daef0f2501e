use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::account::{find_user_by_email, roles_for_new_user, AuthResponse};
use crate::admin::setup;
use crate::auth::{jwt, password};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Optional: setup token for admin bootstrap (first boot only)
    #[serde(default)]
    pub setup_token: Option<String>,
}

/// POST /users/register
/// Create a new user with a bcrypt-hashed password and return a bearer token.
/// A valid first-boot setup token grants the admin role.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Name, email and password are required".to_string(),
        ));
    }

    // Check if setup token is provided and valid
    let is_admin = if let Some(ref token) = req.setup_token {
        setup::verify_setup_token(&state.db, token)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    } else {
        false
    };

    let db = state.db.clone();
    let jwt_secret = state.jwt_secret.clone();
    let raw_password = req.password.clone();

    let response = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        // Check email uniqueness
        let existing = find_user_by_email(&conn, &email)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Lookup user: {}", e)))?;
        if existing.is_some() {
            return Err((StatusCode::BAD_REQUEST, "User already exists".to_string()));
        }

        let password_hash = password::hash_password(&raw_password)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Hash password: {}", e)))?;

        let user_id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let roles = roles_for_new_user(is_admin);

        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, roles, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![user_id, name, email, password_hash, roles, now, now],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert user: {}", e)))?;

        let avatar_url: String = conn
            .query_row(
                "SELECT avatar_url FROM users WHERE id = ?1",
                [&user_id],
                |row| row.get(0),
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Read user: {}", e)))?;

        let token = jwt::issue_access_token(&jwt_secret, &user_id, &name, is_admin)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("JWT: {}", e)))?;

        Ok::<_, (StatusCode, String)>(AuthResponse {
            id: user_id,
            name,
            email,
            avatar_url,
            is_admin,
            token,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    // If the setup token was claimed, mark it consumed
    if is_admin {
        setup::consume_setup_token(&state.db)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Consume token: {}", e)))?;
        tracing::info!("Admin account established: {}", response.email);
    }

    tracing::info!("User registered: {}", response.email);

    Ok((StatusCode::CREATED, Json(response)))
}
