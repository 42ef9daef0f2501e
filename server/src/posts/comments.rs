use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::find_user_by_id;
use crate::auth::middleware::Claims;
use crate::notifications::fanout;
use crate::posts::{fetch_comments, CommentView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentView>,
}

/// POST /blogs/comment/{id} — Append a timestamped comment attributed to
/// the caller and return the resulting list.
///
/// Commenting on someone else's post always creates a 'comment'
/// notification for the author (no dedup), inside the same transaction.
pub async fn add_comment(
    State(state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<CommentListResponse>, (StatusCode, String)> {
    let text = req.comment.trim().to_string();
    if text.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Comment text is required".to_string(),
        ));
    }

    let db = state.db.clone();
    let actor_id = claims.sub.clone();

    let comments = tokio::task::spawn_blocking(move || {
        let mut conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Begin tx: {}", e)))?;

        let actor = find_user_by_id(&tx, &actor_id)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Lookup user: {}", e)))?
            .ok_or((StatusCode::UNAUTHORIZED, "User no longer exists".to_string()))?;

        let (author_id, title): (String, String) = tx
            .query_row(
                "SELECT author_id, title FROM posts WHERE id = ?1",
                [&post_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "Post not found".to_string()))?;

        let comment_id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO comments (id, post_id, user_id, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![comment_id, post_id, actor_id, text, now],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert comment: {}", e)))?;

        // No self-notifications
        if actor_id != author_id {
            fanout::push_comment_notification(&tx, &author_id, &actor_id, &actor.name, &post_id, &title)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Push notification: {}", e)))?;
        }

        let comments = fetch_comments(&tx, &post_id)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Read comments: {}", e)))?;

        tx.commit()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Commit: {}", e)))?;

        Ok::<_, (StatusCode, String)>(comments)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(CommentListResponse { comments }))
}
