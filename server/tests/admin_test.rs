//! Integration tests for the admin surface: role gating, user listing,
//! cascade deletion, and per-user post listing.

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

/// Register the admin via the setup token and return (token, user_id).
async fn register_admin(base_url: &str, setup_token: &str) -> (String, String) {
    let client = reqwest::Client::new();
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
    assert_eq!(resp.status(), 201, "Admin registration failed");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["is_admin"].as_bool().unwrap());
    (
        body["token"].as_str().unwrap().to_string(),
        body["id"].as_str().unwrap().to_string(),
    )
}

/// Register a regular user and return (token, user_id).
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
async fn create_post(base_url: &str, token: &str, title: &str) -> String {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/blogs", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": title, "content": "body" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let (base_url, _setup_token) = start_test_server().await;
    let (token, _id) = register_user(&base_url, "Pleb", "pleb@example.com").await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/admin/users", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403, "Non-admin should get 403");

    let resp = client
        .get(format!("{}/admin/users", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401, "Missing token should get 401");
}

#[tokio::test]
async fn test_list_users_excludes_admins_and_passwords() {
    let (base_url, setup_token) = start_test_server().await;
    let (admin_token, admin_id) = register_admin(&base_url, &setup_token).await;
    let (_tb, user_b) = register_user(&base_url, "Bob", "bob@example.com").await;
    let (_tc, user_c) = register_user(&base_url, "Cleo", "cleo@example.com").await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/admin/users", base_url))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let users: serde_json::Value = resp.json().await.unwrap();
    let users = users.as_array().unwrap();

    let ids: Vec<&str> = users.iter().map(|u| u["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&user_b.as_str()));
    assert!(ids.contains(&user_c.as_str()));
    assert!(!ids.contains(&admin_id.as_str()), "Admins are not listed");
    assert!(
        users.iter().all(|u| u.get("password_hash").is_none()),
        "Password hashes must never be exposed"
    );
}

#[tokio::test]
async fn test_delete_user_cascades_their_posts() {
    let (base_url, setup_token) = start_test_server().await;
    let (admin_token, _admin_id) = register_admin(&base_url, &setup_token).await;
    let (token_b, user_b) = register_user(&base_url, "Bob", "bob@example.com").await;
    let (token_c, _user_c) = register_user(&base_url, "Cleo", "cleo@example.com").await;
    let client = reqwest::Client::new();

    create_post(&base_url, &token_b, "Bob One").await;
    create_post(&base_url, &token_b, "Bob Two").await;
    create_post(&base_url, &token_c, "Cleo One").await;

    let resp = client
        .delete(format!("{}/admin/users/{}", base_url, user_b))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Bob's posts are gone, Cleo's remain
    let resp = client.get(format!("{}/blogs", base_url)).send().await.unwrap();
    let posts: serde_json::Value = resp.json().await.unwrap();
    let titles: Vec<&str> = posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Cleo One"]);

    // Bob's token now points at a vanished subject
    let resp = client
        .get(format!("{}/users/profile", base_url))
        .header("Authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401, "Deleted user's token should be rejected");

    // Deleting again — 404
    let resp = client
        .delete(format!("{}/admin/users/{}", base_url, user_b))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_admins_cannot_be_deleted() {
    let (base_url, setup_token) = start_test_server().await;
    let (admin_token, admin_id) = register_admin(&base_url, &setup_token).await;
    let client = reqwest::Client::new();

    let resp = client
        .delete(format!("{}/admin/users/{}", base_url, admin_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_admin_user_blogs_listing() {
    let (base_url, setup_token) = start_test_server().await;
    let (admin_token, _admin_id) = register_admin(&base_url, &setup_token).await;
    let (token_b, user_b) = register_user(&base_url, "Bob", "bob@example.com").await;
    let client = reqwest::Client::new();

    create_post(&base_url, &token_b, "Bob One").await;
    create_post(&base_url, &token_b, "Bob Two").await;

    let resp = client
        .get(format!("{}/admin/users/{}/blogs", base_url, user_b))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let posts: serde_json::Value = resp.json().await.unwrap();
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["title"].as_str().unwrap(), "Bob Two", "Newest first");
    assert_eq!(posts[0]["author"]["name"].as_str().unwrap(), "Bob");

    // Unknown user id — empty list, same as a user with no posts
    let resp = client
        .get(format!("{}/admin/users/no-such-user/blogs", base_url))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let posts: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(posts.as_array().unwrap().len(), 0);
}
