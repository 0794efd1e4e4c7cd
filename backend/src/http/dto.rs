//! Data Transfer Objects for the HTTP API.
//!
//! Response DTOs are built from service outputs; request DTOs are lenient
//! (every field optional) so that missing fields reach the service layer and
//! get the endpoint's own error message instead of a deserialization failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{Comment, CommentId, Post, PostId, UserId};
use crate::services::{
    CommentInput, LoginInput, ManagerOutcome, RegisterInput, ToggleOutcome, UserProfile,
};

/// A user as seen by admins. The password hash is never exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub posts: Vec<PostId>,
    pub likes: Vec<PostId>,
    pub saved: Vec<PostId>,
    pub comments: Vec<CommentId>,
}

impl From<UserProfile> for UserDto {
    fn from(profile: UserProfile) -> Self {
        let UserProfile { user, relations } = profile;
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
            date_joined: user.date_joined,
            last_login: user.last_login,
            posts: relations.posts,
            likes: relations.likes,
            saved: relations.saved,
            comments: relations.comments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDto {
    pub id: PostId,
    pub author: UserId,
    pub content: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub liked_by: Vec<UserId>,
    pub saved_by: Vec<UserId>,
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author: post.author,
            content: post.content,
            created: post.created,
            updated: post.updated,
            liked_by: post.liked_by,
            saved_by: post.saved_by,
        }
    }
}

/// A comment; `author` is the author's username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentDto {
    pub id: CommentId,
    pub post: PostId,
    pub author: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<Comment> for CommentDto {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post: comment.post,
            author: comment.author_username,
            content: comment.content,
            created: comment.created,
            updated: comment.updated,
        }
    }
}

/// Text form of a JSON scalar; numbers are accepted as text.
fn scalar_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<serde_json::Value>,
    pub password: Option<serde_json::Value>,
    pub confirm_password: Option<serde_json::Value>,
    pub email: Option<serde_json::Value>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        Self {
            username: scalar_text(req.username),
            password: scalar_text(req.password),
            confirm_password: scalar_text(req.confirm_password),
            email: scalar_text(req.email),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl From<LoginRequest> for LoginInput {
    fn from(req: LoginRequest) -> Self {
        Self {
            username: req.username,
            password: req.password,
        }
    }
}

/// Writable post fields. Read-only fields in the body are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostWrite {
    pub content: Option<String>,
}

/// Writable comment fields. Read-only fields in the body are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentWrite {
    pub post: Option<PostId>,
    pub content: Option<String>,
}

impl From<CommentWrite> for CommentInput {
    fn from(req: CommentWrite) -> Self {
        Self {
            post: req.post,
            content: req.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggleResponse {
    pub success: String,
    pub liked: bool,
    pub likes_count: usize,
}

impl From<ToggleOutcome> for LikeToggleResponse {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            success: outcome.message.to_string(),
            liked: outcome.active,
            likes_count: outcome.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveToggleResponse {
    pub success: String,
    pub saved: bool,
    pub saves_count: usize,
}

impl From<ToggleOutcome> for SaveToggleResponse {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            success: outcome.message.to_string(),
            saved: outcome.active,
            saves_count: outcome.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerToggleResponse {
    pub success: String,
    pub is_staff: bool,
}

impl From<ManagerOutcome> for ManagerToggleResponse {
    fn from(outcome: ManagerOutcome) -> Self {
        Self {
            success: outcome.message.to_string(),
            is_staff: outcome.is_staff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Links to the browsable collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRootResponse {
    pub users: String,
    pub posts: String,
    pub comments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Relation;
    use serde_json::json;

    #[test]
    fn test_save_toggle_uses_save_keys() {
        let outcome = ToggleOutcome {
            relation: Relation::Save,
            message: "Post saved successfully",
            active: true,
            count: 3,
        };
        let value = serde_json::to_value(SaveToggleResponse::from(outcome)).unwrap();
        assert_eq!(
            value,
            json!({"success": "Post saved successfully", "saved": true, "saves_count": 3})
        );
    }

    #[test]
    fn test_register_request_accepts_numbers_and_missing_fields() {
        let req: RegisterRequest =
            serde_json::from_value(json!({"username": 1234, "password": "pw"})).unwrap();
        let input = RegisterInput::from(req);
        assert_eq!(input.username.as_deref(), Some("1234"));
        assert_eq!(input.password.as_deref(), Some("pw"));
        assert!(input.email.is_none());
    }

    #[test]
    fn test_post_write_ignores_read_only_fields() {
        let req: PostWrite =
            serde_json::from_value(json!({"content": "hi", "author": 99, "liked_by": [1]}))
                .unwrap();
        assert_eq!(req.content.as_deref(), Some("hi"));
    }
}
