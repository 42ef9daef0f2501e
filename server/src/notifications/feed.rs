use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::state::AppState;

/// Actor display fields joined into the feed.
#[derive(Debug, Serialize)]
pub struct NotificationActor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub kind: String,
    pub message: String,
    pub post_id: String,
    pub is_read: bool,
    pub created_at: String,
    pub actor: NotificationActor,
}

/// GET /notifications — The caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<NotificationResponse>>, (StatusCode, String)> {
    let db = state.db.clone();
    let recipient_id = claims.sub.clone();

    let notifications = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT n.id, n.kind, n.message, n.post_id, n.is_read, n.created_at,
                        u.id, u.name, u.email, u.avatar_url
                 FROM notifications n INNER JOIN users u ON n.actor_id = u.id
                 WHERE n.recipient_id = ?1
                 ORDER BY n.created_at DESC, n.id DESC",
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Prepare: {}", e)))?;

        let rows: Vec<NotificationResponse> = stmt
            .query_map([&recipient_id], |row| {
                Ok(NotificationResponse {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    message: row.get(2)?,
                    post_id: row.get(3)?,
                    is_read: row.get(4)?,
                    created_at: row.get(5)?,
                    actor: NotificationActor {
                        id: row.get(6)?,
                        name: row.get(7)?,
                        email: row.get(8)?,
                        avatar_url: row.get(9)?,
                    },
                })
            })
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query: {}", e)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok::<_, (StatusCode, String)>(rows)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(notifications))
}

/// PUT /notifications/{id}/read — Mark one of the caller's notifications
/// read. Scoped to the caller so one user cannot flip another's flags.
pub async fn mark_read(
    State(state): State<AppState>,
    claims: Claims,
    Path(notification_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let db = state.db.clone();
    let recipient_id = claims.sub.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let rows = conn
            .execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
                rusqlite::params![notification_id, recipient_id],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Mark read: {}", e)))?;

        if rows == 0 {
            return Err((StatusCode::NOT_FOUND, "Notification not found".to_string()));
        }

        Ok::<_, (StatusCode, String)>(())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(serde_json::json!({ "message": "Notification marked as read" })))
}

/// PUT /notifications/read-all — Mark all of the caller's notifications read.
pub async fn mark_all_read(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let db = state.db.clone();
    let recipient_id = claims.sub.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1",
            [&recipient_id],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Mark all read: {}", e)))?;

        Ok::<_, (StatusCode, String)>(())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(serde_json::json!({ "message": "All notifications marked as read" })))
}
