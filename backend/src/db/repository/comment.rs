//! Repository trait for comments.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{Comment, CommentId, NewComment, PostId};

/// Repository trait for comments attached to posts.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Store a new comment.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the referenced post doesn't exist
    async fn create_comment(&self, comment: NewComment) -> RepositoryResult<Comment>;

    /// Retrieve a comment by ID.
    async fn get_comment(&self, comment_id: CommentId) -> RepositoryResult<Comment>;

    /// Whether a comment with this ID exists.
    async fn comment_exists(&self, comment_id: CommentId) -> RepositoryResult<bool>;

    /// All comments, newest first.
    async fn list_comments(&self) -> RepositoryResult<Vec<Comment>>;

    /// Comments on a single post, newest first.
    async fn list_comments_for_post(&self, post_id: PostId) -> RepositoryResult<Vec<Comment>>;

    /// Replace a comment's content and bump its `updated` timestamp.
    async fn update_comment_content(
        &self,
        comment_id: CommentId,
        content: &str,
    ) -> RepositoryResult<Comment>;

    /// Delete a comment.
    ///
    /// # Returns
    /// * `Ok(true)` if a comment was deleted, `Ok(false)` if none existed
    async fn delete_comment(&self, comment_id: CommentId) -> RepositoryResult<bool>;
}
