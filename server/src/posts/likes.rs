use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::account::find_user_by_id;
use crate::auth::middleware::Claims;
use crate::notifications::fanout;
use crate::posts::fetch_like_set;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LikeSetResponse {
    pub likes: Vec<String>,
}

/// PUT /blogs/like/{id} — Toggle the caller's membership in the post's
/// like set and return the resulting set.
///
/// The read-modify-write runs inside one transaction, together with the
/// notification side effect: liking someone else's post creates a 'like'
/// notification for the author (at most one per actor/post), unliking
/// retracts it.
pub async fn toggle_like(
    State(state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<String>,
) -> Result<Json<LikeSetResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let actor_id = claims.sub.clone();

    let likes = tokio::task::spawn_blocking(move || {
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

        let already_liked: bool = tx
            .query_row(
                "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                rusqlite::params![post_id, actor_id],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .unwrap_or(false);

        if already_liked {
            tx.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                rusqlite::params![post_id, actor_id],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Remove like: {}", e)))?;

            fanout::retract_like_notification(&tx, &author_id, &actor_id, &post_id)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Retract notification: {}", e)))?;
        } else {
            let now = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT OR IGNORE INTO post_likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![post_id, actor_id, now],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert like: {}", e)))?;

            // No self-notifications
            if actor_id != author_id {
                fanout::push_like_notification(&tx, &author_id, &actor_id, &actor.name, &post_id, &title)
                    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Push notification: {}", e)))?;
            }
        }

        let likes = fetch_like_set(&tx, &post_id)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Read likes: {}", e)))?;

        tx.commit()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Commit: {}", e)))?;

        Ok::<_, (StatusCode, String)>(likes)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(LikeSetResponse { likes }))
}
