use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;

use crate::account::{avatar, login, profile, registration};
use crate::admin::users as admin_users;
use crate::auth::middleware::JwtSecret;
use crate::notifications::feed;
use crate::posts::{comments, crud as post_crud, likes};
use crate::state::AppState;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting: 5 requests per minute per IP on register/login.
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5)
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Credential routes with rate limiting
    let auth_routes = Router::new()
        .route("/users/register", axum::routing::post(registration::register))
        .route("/users/login", axum::routing::post(login::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Profile routes (JWT required — Claims extractor validates token)
    let profile_routes = Router::new()
        .route(
            "/users/profile",
            axum::routing::get(profile::get_profile).put(profile::update_profile),
        )
        .route(
            "/users/profile/upload",
            axum::routing::put(avatar::upload_avatar)
                .layer(DefaultBodyLimit::max(avatar::MAX_AVATAR_BYTES + 64 * 1024)),
        );

    // Post routes. Listing and single reads are public; everything else
    // requires auth via the Claims extractor on the handler.
    let post_routes = Router::new()
        .route(
            "/blogs",
            axum::routing::post(post_crud::create_post).get(post_crud::list_posts),
        )
        .route("/blogs/my-blogs", axum::routing::get(post_crud::my_posts))
        .route("/blogs/like/{id}", axum::routing::put(likes::toggle_like))
        .route("/blogs/comment/{id}", axum::routing::post(comments::add_comment))
        .route(
            "/blogs/{id}",
            axum::routing::get(post_crud::get_post)
                .put(post_crud::update_post)
                .delete(post_crud::delete_post),
        );

    let notification_routes = Router::new()
        .route("/notifications", axum::routing::get(feed::list_notifications))
        .route("/notifications/read-all", axum::routing::put(feed::mark_all_read))
        .route("/notifications/{id}/read", axum::routing::put(feed::mark_read));

    // Admin routes (JWT + admin role, checked in the handlers)
    let admin_routes = Router::new()
        .route("/admin/users", axum::routing::get(admin_users::list_users))
        .route("/admin/users/{id}", axum::routing::delete(admin_users::delete_user))
        .route("/admin/users/{id}/blogs", axum::routing::get(admin_users::user_posts));

    // Stored avatar files
    let asset_routes = Router::new().route("/avatars/{filename}", axum::routing::get(avatar::get_avatar));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(profile_routes)
        .merge(post_routes)
        .merge(notification_routes)
        .merge(admin_routes)
        .merge(asset_routes)
        .merge(health)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
