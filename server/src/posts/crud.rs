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
use crate::posts::{fetch_comments, fetch_like_set, fetch_post_summaries, AuthorFields, CommentView, PostSummary};
use crate::state::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
}

/// Full post view: author joined, full like set and comment list.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub author: AuthorFields,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub likes: Vec<String>,
    pub comments: Vec<CommentView>,
    pub created_at: String,
    pub updated_at: String,
}

fn read_post_detail(
    conn: &rusqlite::Connection,
    post_id: &str,
) -> Result<PostResponse, (StatusCode, String)> {
    let mut post = conn
        .query_row(
            "SELECT p.id, p.title, p.body, p.image_url, p.created_at, p.updated_at,
                    u.id, u.name, u.email, u.avatar_url
             FROM posts p INNER JOIN users u ON p.author_id = u.id
             WHERE p.id = ?1",
            [post_id],
            |row| {
                Ok(PostResponse {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    image: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                    author: AuthorFields {
                        id: row.get(6)?,
                        name: row.get(7)?,
                        email: row.get(8)?,
                        avatar_url: row.get(9)?,
                    },
                    likes: Vec::new(),
                    comments: Vec::new(),
                })
            },
        )
        .map_err(|_| (StatusCode::NOT_FOUND, "Post not found".to_string()))?;

    post.likes = fetch_like_set(conn, post_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Read likes: {}", e)))?;
    post.comments = fetch_comments(conn, post_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Read comments: {}", e)))?;

    Ok(post)
}

// --- Handlers ---

/// POST /blogs — Create a post owned by the caller.
pub async fn create_post(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), (StatusCode, String)> {
    let title = req.title.trim().to_string();
    let content = req.content.trim().to_string();

    if title.is_empty() || content.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Title and content are required".to_string(),
        ));
    }

    let db = state.db.clone();
    let author_id = claims.sub.clone();
    let image = req.image.filter(|s| !s.trim().is_empty());

    let post = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let author = find_user_by_id(&conn, &author_id)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Lookup user: {}", e)))?
            .ok_or((StatusCode::UNAUTHORIZED, "User no longer exists".to_string()))?;

        let post_id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO posts (id, author_id, title, body, image_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![post_id, author_id, title, content, image, now, now],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert post: {}", e)))?;

        Ok::<_, (StatusCode, String)>(PostResponse {
            id: post_id,
            author: AuthorFields {
                id: author.id,
                name: author.name,
                email: author.email,
                avatar_url: author.avatar_url,
            },
            title,
            content,
            image,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    tracing::debug!("Post created: {}", post.id);

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /blogs — All posts, newest first, author fields joined. Public.
pub async fn list_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PostSummary>>, (StatusCode, String)> {
    let db = state.db.clone();

    let posts = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        fetch_post_summaries(&conn, None)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("List posts: {}", e)))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(posts))
}

/// GET /blogs/my-blogs — The caller's posts, newest first.
/// An empty list is a normal answer, not an error.
pub async fn my_posts(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<PostSummary>>, (StatusCode, String)> {
    let db = state.db.clone();
    let author_id = claims.sub.clone();

    let posts = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        fetch_post_summaries(&conn, Some(&author_id))
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("List posts: {}", e)))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(posts))
}

/// GET /blogs/{id} — One post with like set and comments. Public.
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>, (StatusCode, String)> {
    let db = state.db.clone();

    let post = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;
        read_post_detail(&conn, &post_id)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(post))
}

/// PUT /blogs/{id} — Partial update; only the owning author may edit.
pub async fn update_post(
    State(state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let caller_id = claims.sub.clone();

    let post = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let author_id: String = conn
            .query_row(
                "SELECT author_id FROM posts WHERE id = ?1",
                [&post_id],
                |row| row.get(0),
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "Post not found".to_string()))?;

        if author_id != caller_id {
            return Err((
                StatusCode::FORBIDDEN,
                "You are not authorized to update this post".to_string(),
            ));
        }

        // Absent or blank fields keep their current value
        let title = req.title.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let content = req.content.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let image = req.image.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE posts SET title = COALESCE(?1, title),
                              body = COALESCE(?2, body),
                              image_url = COALESCE(?3, image_url),
                              updated_at = ?4
             WHERE id = ?5",
            rusqlite::params![title, content, image, now, post_id],
        )
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update post: {}", e)))?;

        read_post_detail(&conn, &post_id)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(post))
}

/// DELETE /blogs/{id} — Author or admin only.
pub async fn delete_post(
    State(state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let db = state.db.clone();
    let caller_id = claims.sub.clone();
    let is_admin = claims.is_admin;

    tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let author_id: String = conn
            .query_row(
                "SELECT author_id FROM posts WHERE id = ?1",
                [&post_id],
                |row| row.get(0),
            )
            .map_err(|_| (StatusCode::NOT_FOUND, "Post not found".to_string()))?;

        if author_id != caller_id && !is_admin {
            return Err((
                StatusCode::FORBIDDEN,
                "You are not authorized to delete this post".to_string(),
            ));
        }

        // Likes, comments, and notifications cascade via foreign keys
        conn.execute("DELETE FROM posts WHERE id = ?1", [&post_id])
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete post: {}", e)))?;

        Ok::<_, (StatusCode, String)>(())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    Ok(Json(serde_json::json!({ "message": "Post deleted successfully" })))
}
