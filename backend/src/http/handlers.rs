//! HTTP handlers for the REST API.
//!
//! Each handler extracts its inputs, delegates to `crate::services` and maps
//! the service output to a DTO.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::dto::{
    ApiRootResponse, CommentDto, CommentWrite, HealthResponse, LikeToggleResponse, LoginRequest,
    ManagerToggleResponse, MessageResponse, PostDto, PostWrite, RegisterRequest,
    SaveToggleResponse, TokenResponse, UserDto,
};
use super::error::AppError;
use super::extract::PathId;
use super::state::AppState;
use crate::api::{CommentId, PostId, UserId};
use crate::auth::Requester;
use crate::services::{self, LoginInput, RegisterInput, Reply};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Reply<T>, AppError>;

/// Request body, with malformed JSON reported as a 400 `error` body.
type Body<T> = Result<Json<T>, JsonRejection>;

fn list_of<T, D: From<T>>(items: Vec<T>) -> Vec<D> {
    items.into_iter().map(D::from).collect()
}

// =============================================================================
// Root and health
// =============================================================================

/// GET /
pub async fn api_root() -> Json<ApiRootResponse> {
    Json(ApiRootResponse {
        users: "/users/".to_string(),
        posts: "/posts/".to_string(),
        comments: "/comments/".to_string(),
    })
}

/// GET /health
///
/// Health check endpoint to verify the service is running and storage is reachable.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = services::health_check(state.repo()).await;

    Json(HealthResponse {
        status: if status.is_healthy() { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: status.describe(),
    })
}

// =============================================================================
// Users
// =============================================================================

/// GET /users/
pub async fn list_users(
    State(state): State<AppState>,
    requester: Requester,
) -> HandlerResult<Vec<UserDto>> {
    let reply = services::list_users(state.repo(), &requester).await?;
    Ok(reply.map(list_of))
}

/// GET /users/{id}/
pub async fn retrieve_user(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
) -> HandlerResult<UserDto> {
    let reply = services::retrieve_user(state.repo(), &requester, UserId(id)).await?;
    Ok(reply.map(UserDto::from))
}

/// PUT /users/{id}/add_remove_manager/
pub async fn add_remove_manager(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
) -> HandlerResult<ManagerToggleResponse> {
    let reply = services::add_remove_manager(state.repo(), &requester, UserId(id)).await?;
    Ok(reply.map(ManagerToggleResponse::from))
}

// =============================================================================
// Posts
// =============================================================================

/// GET /posts/
pub async fn list_posts(State(state): State<AppState>) -> HandlerResult<Vec<PostDto>> {
    let reply = services::list_posts(state.repo()).await?;
    Ok(reply.map(list_of))
}

/// POST /posts/
pub async fn create_post(
    State(state): State<AppState>,
    requester: Requester,
    body: Body<PostWrite>,
) -> HandlerResult<PostDto> {
    let Json(body) = body?;
    let reply = services::create_post(state.repo(), &requester, body.content.as_deref()).await?;
    Ok(reply.map(PostDto::from))
}

/// GET /posts/{id}/
pub async fn retrieve_post(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> HandlerResult<PostDto> {
    let reply = services::retrieve_post(state.repo(), PostId(id)).await?;
    Ok(reply.map(PostDto::from))
}

/// PUT /posts/{id}/
pub async fn update_post(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
    body: Body<PostWrite>,
) -> HandlerResult<PostDto> {
    let Json(body) = body?;
    let reply = services::update_post(
        state.repo(),
        &requester,
        PostId(id),
        body.content.as_deref(),
        false,
    )
    .await?;
    Ok(reply.map(PostDto::from))
}

/// PATCH /posts/{id}/
pub async fn partial_update_post(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
    body: Body<PostWrite>,
) -> HandlerResult<PostDto> {
    let Json(body) = body?;
    let reply = services::update_post(
        state.repo(),
        &requester,
        PostId(id),
        body.content.as_deref(),
        true,
    )
    .await?;
    Ok(reply.map(PostDto::from))
}

/// DELETE /posts/{id}/
pub async fn delete_post(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
) -> HandlerResult<()> {
    Ok(services::delete_post(state.repo(), &requester, PostId(id)).await?)
}

/// POST /posts/{id}/like_toggle/
pub async fn like_toggle(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
) -> HandlerResult<LikeToggleResponse> {
    let reply = services::like_toggle(state.repo(), &requester, PostId(id)).await?;
    Ok(reply.map(LikeToggleResponse::from))
}

/// POST /posts/{id}/save_toggle/
pub async fn save_toggle(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
) -> HandlerResult<SaveToggleResponse> {
    let reply = services::save_toggle(state.repo(), &requester, PostId(id)).await?;
    Ok(reply.map(SaveToggleResponse::from))
}

/// GET /posts/saved_posts/
pub async fn saved_posts(
    State(state): State<AppState>,
    requester: Requester,
) -> HandlerResult<Vec<PostDto>> {
    let reply = services::saved_posts(state.repo(), &requester).await?;
    Ok(reply.map(list_of))
}

/// GET /posts/{id}/get_comment_by_post_id/
pub async fn comments_for_post(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> HandlerResult<Vec<CommentDto>> {
    let reply = services::comments_for_post(state.repo(), PostId(id)).await?;
    Ok(reply.map(list_of))
}

/// GET /posts/{id}/get_by_id/
pub async fn get_by_id(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> HandlerResult<PostDto> {
    let reply = services::get_by_id(state.repo(), PostId(id)).await?;
    Ok(reply.map(PostDto::from))
}

// =============================================================================
// Comments
// =============================================================================

/// GET /comments/
pub async fn list_comments(State(state): State<AppState>) -> HandlerResult<Vec<CommentDto>> {
    let reply = services::list_comments(state.repo()).await?;
    Ok(reply.map(list_of))
}

/// POST /comments/
pub async fn create_comment(
    State(state): State<AppState>,
    requester: Requester,
    body: Body<CommentWrite>,
) -> HandlerResult<CommentDto> {
    let Json(body) = body?;
    let reply = services::create_comment(state.repo(), &requester, body.into()).await?;
    Ok(reply.map(CommentDto::from))
}

/// GET /comments/{id}/
pub async fn retrieve_comment(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> HandlerResult<CommentDto> {
    let reply = services::retrieve_comment(state.repo(), CommentId(id)).await?;
    Ok(reply.map(CommentDto::from))
}

/// PUT /comments/{id}/
pub async fn update_comment(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
    body: Body<CommentWrite>,
) -> HandlerResult<CommentDto> {
    let Json(body) = body?;
    let reply = services::update_comment(
        state.repo(),
        &requester,
        CommentId(id),
        body.content.as_deref(),
        false,
    )
    .await?;
    Ok(reply.map(CommentDto::from))
}

/// PATCH /comments/{id}/
pub async fn partial_update_comment(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
    body: Body<CommentWrite>,
) -> HandlerResult<CommentDto> {
    let Json(body) = body?;
    let reply = services::update_comment(
        state.repo(),
        &requester,
        CommentId(id),
        body.content.as_deref(),
        true,
    )
    .await?;
    Ok(reply.map(CommentDto::from))
}

/// DELETE /comments/{id}/
pub async fn delete_comment(
    State(state): State<AppState>,
    requester: Requester,
    PathId(id): PathId,
) -> HandlerResult<()> {
    Ok(services::delete_comment(state.repo(), &requester, CommentId(id)).await?)
}

// =============================================================================
// Accounts
// =============================================================================

/// POST /register/
pub async fn register(
    State(state): State<AppState>,
    body: Body<RegisterRequest>,
) -> HandlerResult<MessageResponse> {
    let Json(body) = body?;
    let input = RegisterInput::from(body);
    let reply = services::register(state.repo(), &input).await?;
    Ok(reply.map(|success| MessageResponse { success }))
}

/// POST /login/
pub async fn login(
    State(state): State<AppState>,
    body: Body<LoginRequest>,
) -> HandlerResult<TokenResponse> {
    let Json(body) = body?;
    let input = LoginInput::from(body);
    let reply = services::login(state.repo(), &input).await?;
    if reply.data().is_some() {
        tracing::info!("Token issued via /login/");
    }
    Ok(reply.map(|token| TokenResponse { token }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound(services::NOT_FOUND.to_string())
}
