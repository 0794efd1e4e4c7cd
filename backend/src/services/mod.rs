//! Service layer: one function per API operation.
//!
//! Services take a repository, the [`Requester`](crate::auth::Requester) and
//! typed input, and decide the status and body of the response. They know
//! nothing about HTTP framing; `crate::http` turns a [`Reply`] into a response.
//!
//! Business failures the client should see (missing objects, denied
//! permissions, invalid input) are `Ok(Reply)` with an error body. `Err` is
//! reserved for storage and hashing failures.

pub mod accounts;
pub mod comments;
pub mod health;
pub mod posts;
pub mod users;

pub use accounts::{login, register, LoginInput, RegisterInput};
pub use comments::{
    create_comment, delete_comment, list_comments, retrieve_comment, update_comment, CommentInput,
};
pub use health::{health_check, HealthStatus};
pub use posts::{
    comments_for_post, create_post, delete_post, get_by_id, like_toggle, list_posts,
    retrieve_post, save_toggle, saved_posts, update_post, ToggleOutcome,
};
pub use users::{
    add_remove_manager, ensure_superuser, list_users, retrieve_user, ManagerOutcome, UserProfile,
};

use crate::auth::AuthError;
use crate::db::repository::RepositoryError;

/// Returned when a write is attempted without credentials.
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
/// Returned when an object-level or view-level predicate denies the request.
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";
/// Returned when a plain lookup misses.
pub const NOT_FOUND: &str = "Not found.";

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures that are not part of an endpoint's contract.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Response status chosen by a service.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    NoContent,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::Unauthorized => 401,
            Status::Forbidden => 403,
            Status::NotFound => 404,
        }
    }
}

/// Response payload chosen by a service.
#[derive(Debug, Clone, PartialEq)]
pub enum Body<T> {
    Data(T),
    /// Serialized as `{"error": message}`.
    Error(String),
    Empty,
}

/// A status and body pair.
///
/// Error bodies do not imply an error status: several endpoints answer 200
/// with an `error` body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub status: Status,
    pub body: Body<T>,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: Status::Ok,
            body: Body::Data(data),
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: Status::Created,
            body: Body::Data(data),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: Status::NoContent,
            body: Body::Empty,
        }
    }

    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Body::Error(message.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(Status::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::error(Status::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::error(Status::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(Status::NotFound, message)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            status: self.status,
            body: match self.body {
                Body::Data(data) => Body::Data(f(data)),
                Body::Error(message) => Body::Error(message),
                Body::Empty => Body::Empty,
            },
        }
    }

    pub fn data(&self) -> Option<&T> {
        match &self.body {
            Body::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self.body {
            Body::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.body {
            Body::Error(message) => Some(message),
            _ => None,
        }
    }
}
