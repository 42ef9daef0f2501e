//! Integration tests for post CRUD: creation validation, listings with
//! author joins, ownership checks on update/delete.

use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Helper: start the server on a random port and return (base_url, setup_token).
async fn start_test_server() -> (String, String) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = inkwell_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = inkwell_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");
    let setup_token = inkwell_server::admin::setup::maybe_generate_setup_token(&db)
        .expect("Failed to generate setup token")
        .expect("Expected setup token");

    let state = inkwell_server::state::AppState {
        db,
        jwt_secret,
        data_dir: data_dir.clone(),
    };

    let app = inkwell_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    (format!("http://{}", addr), setup_token)
}

/// Register a user and return (token, user_id).
async fn register_user(base_url: &str, name: &str, email: &str) -> (String, String) {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/users/register", base_url))
        .json(&json!({ "name": name, "email": email, "password": "pw-123456" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 201, "Registration failed for {}", email);
    let body: serde_json::Value = resp.json().await.unwrap();
    (
        body["token"].as_str().unwrap().to_string(),
        body["id"].as_str().unwrap().to_string(),
    )
}

/// Create a post and return its id.
async fn create_post(base_url: &str, token: &str, title: &str, content: &str) -> String {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/blogs", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": title, "content": content }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "Post creation failed for '{}'", title);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_create_requires_title_and_content() {
    let (base_url, _setup) = start_test_server().await;
    let (token, _id) = register_user(&base_url, "Author", "author@example.com").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/blogs", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": "No content here", "content": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/blogs", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": "   ", "content": "Body" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "Whitespace-only title should be rejected");

    // Unauthenticated creation is rejected outright
    let resp = client
        .post(format!("{}/blogs", base_url))
        .json(&json!({ "title": "T", "content": "C" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_list_posts_newest_first_with_author() {
    let (base_url, _setup) = start_test_server().await;
    let (token, user_id) = register_user(&base_url, "Author", "author@example.com").await;
    let client = reqwest::Client::new();

    create_post(&base_url, &token, "First", "one").await;
    create_post(&base_url, &token, "Second", "two").await;

    // Listing is public — no token
    let resp = client.get(format!("{}/blogs", base_url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let posts: serde_json::Value = resp.json().await.unwrap();
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["title"].as_str().unwrap(), "Second", "Newest first");
    assert_eq!(posts[1]["title"].as_str().unwrap(), "First");

    // Author fields joined in
    assert_eq!(posts[0]["author"]["id"].as_str().unwrap(), user_id);
    assert_eq!(posts[0]["author"]["name"].as_str().unwrap(), "Author");
    assert_eq!(posts[0]["author"]["email"].as_str().unwrap(), "author@example.com");
    assert_eq!(posts[0]["like_count"].as_i64().unwrap(), 0);
    assert_eq!(posts[0]["comment_count"].as_i64().unwrap(), 0);
}

#[tokio::test]
async fn test_my_blogs_empty_is_ok_not_404() {
    let (base_url, _setup) = start_test_server().await;
    let (token, _id) = register_user(&base_url, "Lurker", "lurker@example.com").await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/blogs/my-blogs", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "No posts yet should still be 200");
    let posts: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(posts.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_my_blogs_returns_only_own_posts() {
    let (base_url, _setup) = start_test_server().await;
    let (token_a, _a) = register_user(&base_url, "Alice", "alice@example.com").await;
    let (token_b, _b) = register_user(&base_url, "Bob", "bob@example.com").await;
    let client = reqwest::Client::new();

    create_post(&base_url, &token_a, "Alice One", "a1").await;
    create_post(&base_url, &token_b, "Bob One", "b1").await;
    create_post(&base_url, &token_a, "Alice Two", "a2").await;

    let resp = client
        .get(format!("{}/blogs/my-blogs", base_url))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let posts: serde_json::Value = resp.json().await.unwrap();
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["title"].as_str().unwrap(), "Alice Two");
    assert_eq!(posts[1]["title"].as_str().unwrap(), "Alice One");
}

#[tokio::test]
async fn test_get_post_not_found() {
    let (base_url, _setup) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/blogs/no-such-post", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_only_author_can_update() {
    let (base_url, _setup) = start_test_server().await;
    let (token_a, _a) = register_user(&base_url, "Alice", "alice@example.com").await;
    let (token_b, _b) = register_user(&base_url, "Bob", "bob@example.com").await;
    let client = reqwest::Client::new();

    let post_id = create_post(&base_url, &token_a, "Original", "Original body").await;

    // Non-author update — 403 and the post is unchanged
    let resp = client
        .put(format!("{}/blogs/{}", base_url, post_id))
        .header("Authorization", format!("Bearer {}", token_b))
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .get(format!("{}/blogs/{}", base_url, post_id))
        .send()
        .await
        .unwrap();
    let post: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(post["title"].as_str().unwrap(), "Original");

    // Author partial update — title changes, body stays
    let resp = client
        .put(format!("{}/blogs/{}", base_url, post_id))
        .header("Authorization", format!("Bearer {}", token_a))
        .json(&json!({ "title": "Edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let post: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(post["title"].as_str().unwrap(), "Edited");
    assert_eq!(post["content"].as_str().unwrap(), "Original body");

    // Unknown id — 404
    let resp = client
        .put(format!("{}/blogs/no-such-post", base_url))
        .header("Authorization", format!("Bearer {}", token_a))
        .json(&json!({ "title": "X" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_only_author_or_admin_can_delete() {
    let (base_url, setup_token) = start_test_server().await;
    let client = reqwest::Client::new();

    // Admin via setup token
    let resp = client
        .post(format!("{}/users/register", base_url))
        .json(&json!({
            "name": "Root",
            "email": "root@example.com",
            "password": "pw-123456",
            "setup_token": setup_token,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let admin: serde_json::Value = resp.json().await.unwrap();
    let admin_token = admin["token"].as_str().unwrap().to_string();

    let (token_a, _a) = register_user(&base_url, "Alice", "alice@example.com").await;
    let (token_b, _b) = register_user(&base_url, "Bob", "bob@example.com").await;

    let first = create_post(&base_url, &token_a, "Keep or delete", "body").await;
    let second = create_post(&base_url, &token_a, "Moderated away", "body").await;

    // Non-author, non-admin — 403
    let resp = client
        .delete(format!("{}/blogs/{}", base_url, first))
        .header("Authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Author — deleted
    let resp = client
        .delete(format!("{}/blogs/{}", base_url, first))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/blogs/{}", base_url, first))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404, "Deleted post should be gone");

    // Admin may delete someone else's post (moderation path)
    let resp = client
        .delete(format!("{}/blogs/{}", base_url, second))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
