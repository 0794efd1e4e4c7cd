//! Repository trait for user accounts.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{NewUser, User, UserId, UserRelations};

/// Repository trait for account storage.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait UserRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the database connection is healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== User Operations ====================

    /// Store a new account.
    ///
    /// # Returns
    /// * `Ok(User)` - The stored account with its assigned ID and join date
    /// * `Err(RepositoryError::Conflict)` - If the username is taken
    async fn create_user(&self, user: NewUser) -> RepositoryResult<User>;

    /// Retrieve an account by ID.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the account doesn't exist
    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User>;

    /// Look up an account by its exact username.
    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// Whether an account with this username exists.
    async fn username_exists(&self, username: &str) -> RepositoryResult<bool>;

    /// Whether an account with this email exists.
    async fn email_exists(&self, email: &str) -> RepositoryResult<bool>;

    /// List all accounts ordered by ID.
    async fn list_users(&self) -> RepositoryResult<Vec<User>>;

    /// Persist the mutable fields of an account (names, email, flags, last login).
    ///
    /// # Returns
    /// * `Ok(User)` - The account as stored after the update
    /// * `Err(RepositoryError::NotFound)` - If the account doesn't exist
    async fn update_user(&self, user: &User) -> RepositoryResult<User>;

    /// Ids of posts authored, liked and saved, and of comments authored.
    async fn user_relations(&self, user_id: UserId) -> RepositoryResult<UserRelations>;
}
