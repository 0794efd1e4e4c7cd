//! Credentials, token authentication and access-control predicates.
//!
//! - [`password`]: Argon2id hashing and verification
//! - [`token`]: opaque token keys and the login / authenticate flow
//! - [`permissions`]: boolean predicates over a [`Requester`] and an [`Action`]

pub mod password;
pub mod permissions;
pub mod token;

pub use password::{hash_password, verify_password};
pub use permissions::Action;
pub use token::{generate_token_key, TokenService};

use crate::api::{User, UserId};
use crate::db::repository::RepositoryError;

/// Errors raised while checking credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unable to log in with provided credentials.")]
    InvalidCredentials,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("User inactive or deleted.")]
    InactiveUser,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The identity a request acts as.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Requester {
    #[default]
    Anonymous,
    Authenticated(User),
}

impl Requester {
    pub fn user(&self) -> Option<&User> {
        match self {
            Requester::Anonymous => None,
            Requester::Authenticated(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Requester::Authenticated(_))
    }

    pub fn is_staff(&self) -> bool {
        self.user().is_some_and(|u| u.is_staff)
    }

    pub fn is_superuser(&self) -> bool {
        self.user().is_some_and(|u| u.is_superuser)
    }
}

impl From<User> for Requester {
    fn from(user: User) -> Self {
        Requester::Authenticated(user)
    }
}
