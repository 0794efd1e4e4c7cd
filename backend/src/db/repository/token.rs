//! Repository trait for authentication tokens.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{User, UserId};

/// Storage of one opaque token key per user.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Return the user's existing key, or store `new_key` and return it.
    async fn get_or_create_token(&self, user_id: UserId, new_key: &str) -> RepositoryResult<String>;

    /// Resolve a key to its owner, if the key is known.
    async fn find_user_by_token(&self, key: &str) -> RepositoryResult<Option<User>>;
}
