//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving. Paths keep their trailing
//! slash.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Request bodies are a handful of short strings.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let users = Router::new()
        .route("/users/", get(handlers::list_users))
        .route("/users/{id}/", get(handlers::retrieve_user))
        .route(
            "/users/{id}/add_remove_manager/",
            put(handlers::add_remove_manager),
        );

    let posts = Router::new()
        .route(
            "/posts/",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/posts/saved_posts/", get(handlers::saved_posts))
        .route(
            "/posts/{id}/",
            get(handlers::retrieve_post)
                .put(handlers::update_post)
                .patch(handlers::partial_update_post)
                .delete(handlers::delete_post),
        )
        .route("/posts/{id}/like_toggle/", post(handlers::like_toggle))
        .route("/posts/{id}/save_toggle/", post(handlers::save_toggle))
        .route(
            "/posts/{id}/get_comment_by_post_id/",
            get(handlers::comments_for_post),
        )
        .route("/posts/{id}/get_by_id/", get(handlers::get_by_id));

    let comments = Router::new()
        .route(
            "/comments/",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/comments/{id}/",
            get(handlers::retrieve_comment)
                .put(handlers::update_comment)
                .patch(handlers::partial_update_comment)
                .delete(handlers::delete_comment),
        );

    Router::new()
        .route("/", get(handlers::api_root))
        .route("/health", get(handlers::health_check))
        .route("/register/", post(handlers::register))
        .route("/login/", post(handlers::login))
        .merge(users)
        .merge(posts)
        .merge(comments)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
