use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::require_admin;
use crate::auth::middleware::Claims;
use crate::db::models::ROLE_ADMIN;
use crate::posts::{fetch_post_summaries, PostSummary};
use crate::state::AppState;

/// User listing row for the admin panel, password hash excluded.
#[derive(Debug, Serialize)]
pub struct AdminUserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub created_at: String,
}

/// GET /admin/users — All non-admin users.
pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<AdminUserResponse>>, (StatusCode, String)> {
    require_admin(&claims)?;

    let db = state.db.clone();

    let users = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, name, email, avatar_url, created_at FROM users
                 WHERE (roles & ?1) = 0 ORDER BY created_at DESC",
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Prepare: {}", e)))?;

        let users: Vec<AdminUserResponse> = stmt
            .query_map([ROLE_ADMIN], |row| {
                Ok(AdminUserResponse {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    avatar_url: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query: {}", e)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok::<_, (StatusCode, String)>(users)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(users))
}

/// DELETE /admin/users/{id} — Delete a user. Their posts (and the likes,
/// comments, and notifications hanging off them) cascade via foreign keys.
pub async fn delete_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    require_admin(&claims)?;

    let db = state.db.clone();
    let target_id = user_id.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let roles: i64 = conn
            .query_row(
                "SELECT roles FROM users WHERE id = ?1",
                [&target_id],
                |row| row.get(0),
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "User not found".to_string()))?;

        if roles & ROLE_ADMIN != 0 {
            return Err((
                StatusCode::FORBIDDEN,
                "Cannot delete an admin account".to_string(),
            ));
        }

        conn.execute("DELETE FROM users WHERE id = ?1", [&target_id])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete user: {}", e)))?;

        Ok::<_, (StatusCode, String)>(())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    tracing::info!("User deleted by admin: {}", user_id);

    Ok(Json(serde_json::json!({ "message": "User deleted successfully" })))
}

/// GET /admin/users/{id}/blogs — All posts by the given user, author fields
/// joined. Empty list when the user owns none (or does not exist).
pub async fn user_posts(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<PostSummary>>, (StatusCode, String)> {
    require_admin(&claims)?;

    let db = state.db.clone();

    let posts = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        fetch_post_summaries(&conn, Some(&user_id))
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("List posts: {}", e)))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(posts))
}
