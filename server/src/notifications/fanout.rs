//! Notification side effects for like/comment mutations.
//!
//! These helpers take a plain connection so callers can run them inside the
//! same transaction as the content mutation they belong to.

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::models::{KIND_COMMENT, KIND_LIKE};

/// Record a 'like' notification for the post author.
/// At most one may be outstanding per (recipient, actor, post) — the
/// partial unique index makes the insert a no-op when one already exists.
pub fn push_like_notification(
    conn: &Connection,
    recipient_id: &str,
    actor_id: &str,
    actor_name: &str,
    post_id: &str,
    post_title: &str,
) -> rusqlite::Result<()> {
    let message = format!("{} liked your post \"{}\"", actor_name, post_title);
    conn.execute(
        "INSERT OR IGNORE INTO notifications
             (id, recipient_id, actor_id, kind, message, post_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            Uuid::now_v7().to_string(),
            recipient_id,
            actor_id,
            KIND_LIKE,
            message,
            post_id,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Remove the outstanding 'like' notification for the triple, if any.
/// Called on unlike so a retracted like leaves no trace.
pub fn retract_like_notification(
    conn: &Connection,
    recipient_id: &str,
    actor_id: &str,
    post_id: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM notifications
         WHERE recipient_id = ?1 AND actor_id = ?2 AND post_id = ?3 AND kind = ?4",
        rusqlite::params![recipient_id, actor_id, post_id, KIND_LIKE],
    )?;
    Ok(())
}

/// Record a 'comment' notification for the post author.
/// Comment notifications are never deduplicated.
pub fn push_comment_notification(
    conn: &Connection,
    recipient_id: &str,
    actor_id: &str,
    actor_name: &str,
    post_id: &str,
    post_title: &str,
) -> rusqlite::Result<()> {
    let message = format!("{} commented on your post \"{}\"", actor_name, post_title);
    conn.execute(
        "INSERT INTO notifications
             (id, recipient_id, actor_id, kind, message, post_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            Uuid::now_v7().to_string(),
            recipient_id,
            actor_id,
            KIND_COMMENT,
            message,
            post_id,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::migrations;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        migrations().to_latest(&mut conn).unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        for (id, name) in [("author", "Author"), ("actor", "Actor")] {
            conn.execute(
                "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'x', ?4, ?4)",
                rusqlite::params![id, name, format!("{}@example.com", id), now],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO posts (id, author_id, title, body, created_at, updated_at)
             VALUES ('post-1', 'author', 'Hello', 'World', ?1, ?1)",
            [&now],
        )
        .unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn like_notification_is_deduplicated() {
        let conn = test_conn();
        push_like_notification(&conn, "author", "actor", "Actor", "post-1", "Hello").unwrap();
        push_like_notification(&conn, "author", "actor", "Actor", "post-1", "Hello").unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn retract_removes_the_like_notification() {
        let conn = test_conn();
        push_like_notification(&conn, "author", "actor", "Actor", "post-1", "Hello").unwrap();
        retract_like_notification(&conn, "author", "actor", "post-1").unwrap();
        assert_eq!(count(&conn), 0);

        // Retracting again is a no-op
        retract_like_notification(&conn, "author", "actor", "post-1").unwrap();
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn comment_notifications_accumulate() {
        let conn = test_conn();
        push_comment_notification(&conn, "author", "actor", "Actor", "post-1", "Hello").unwrap();
        push_comment_notification(&conn, "author", "actor", "Actor", "post-1", "Hello").unwrap();
        assert_eq!(count(&conn), 2);
    }

    #[test]
    fn retract_leaves_comment_notifications_alone() {
        let conn = test_conn();
        push_comment_notification(&conn, "author", "actor", "Actor", "post-1", "Hello").unwrap();
        retract_like_notification(&conn, "author", "actor", "post-1").unwrap();
        assert_eq!(count(&conn), 1);
    }
}
