//! Repository trait definitions for database operations.
//!
//! This module provides a collection of focused repository traits that abstract
//! storage for the three entities and their relations. By splitting
//! responsibilities across multiple traits, implementations stay focused and
//! services can be tested against the in-memory backend.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`user`]: Accounts and their reverse relations
//! - [`post`]: Posts and the `liked_by` / `saved_by` join tables
//! - [`comment`]: Comments attached to posts
//! - [`token`]: Authentication token keys
//!
//! # Convenience Trait Bound
//!
//! For functions that need all repository capabilities, use the [`FullRepository`] trait bound:
//!
//! ```ignore
//! async fn my_service<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<()> {
//!     let post = repo.get_post(post_id).await?;
//!     let author = repo.get_user(post.author).await?;
//!     Ok(())
//! }
//! ```

pub mod comment;
pub mod error;
pub mod post;
pub mod token;
pub mod user;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use comment::CommentRepository;
pub use post::PostRepository;
pub use token::TokenRepository;
pub use user::UserRepository;

/// Composite trait bound for a complete repository implementation.
///
/// This trait is automatically implemented for any type that implements
/// all four repository traits.
pub trait FullRepository:
    UserRepository + PostRepository + CommentRepository + TokenRepository
{
}

// Blanket implementation: any type implementing all four traits automatically implements FullRepository
impl<T> FullRepository for T where
    T: UserRepository + PostRepository + CommentRepository + TokenRepository
{
}
