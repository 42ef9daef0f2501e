//! Blog posts: CRUD, like toggle, comment append.
//!
//! This module owns the read-side projection contract: which author and
//! commenter fields get joined into post payloads.

pub mod comments;
pub mod crud;
pub mod likes;

use rusqlite::Connection;
use serde::Serialize;

/// Author display fields joined into post reads.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorFields {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
}

/// A comment with commenter display fields joined in.
#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar_url: String,
    pub text: String,
    pub created_at: String,
}

/// Post listing row: author joined, like/comment counts instead of the
/// full sets.
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: String,
    pub author: AuthorFields,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

fn map_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostSummary> {
    Ok(PostSummary {
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
        like_count: row.get(10)?,
        comment_count: row.get(11)?,
    })
}

const SUMMARY_SELECT: &str = "SELECT p.id, p.title, p.body, p.image_url, p.created_at, p.updated_at,
        u.id, u.name, u.email, u.avatar_url,
        (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id),
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)
 FROM posts p INNER JOIN users u ON p.author_id = u.id";

/// Fetch post summaries, newest first, optionally restricted to one author.
pub fn fetch_post_summaries(
    conn: &Connection,
    author_id: Option<&str>,
) -> rusqlite::Result<Vec<PostSummary>> {
    match author_id {
        Some(id) => {
            let sql = format!(
                "{} WHERE p.author_id = ?1 ORDER BY p.created_at DESC, p.id DESC",
                SUMMARY_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id], map_summary)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        }
        None => {
            let sql = format!("{} ORDER BY p.created_at DESC, p.id DESC", SUMMARY_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_summary)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        }
    }
}

/// Fetch the like set for a post: the ids of every user currently liking it,
/// in like order.
pub fn fetch_like_set(conn: &Connection, post_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM post_likes WHERE post_id = ?1 ORDER BY created_at, user_id",
    )?;
    let likes = stmt
        .query_map([post_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(likes)
}

/// Fetch a post's comments in insertion order, commenter fields joined.
pub fn fetch_comments(conn: &Connection, post_id: &str) -> rusqlite::Result<Vec<CommentView>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.user_id, u.name, u.avatar_url, c.body, c.created_at
         FROM comments c INNER JOIN users u ON c.user_id = u.id
         WHERE c.post_id = ?1 ORDER BY c.created_at, c.id",
    )?;
    let comments = stmt
        .query_map([post_id], |row| {
            Ok(CommentView {
                id: row.get(0)?,
                user_id: row.get(1)?,
                user_name: row.get(2)?,
                user_avatar_url: row.get(3)?,
                text: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(comments)
}
