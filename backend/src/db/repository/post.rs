//! Repository trait for posts and their membership relations.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{NewPost, Post, PostId, Relation, UserId};

/// Repository trait for posts.
///
/// Membership in `liked_by` / `saved_by` is exposed through the generic
/// `*_member` operations keyed by [`Relation`]. No operation here enforces the
/// rule that an author cannot like or save their own post; that check belongs
/// to the service layer.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Store a new post. `created` and `updated` are set by the store.
    async fn create_post(&self, post: NewPost) -> RepositoryResult<Post>;

    /// Retrieve a post with its membership lists.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the post doesn't exist
    async fn get_post(&self, post_id: PostId) -> RepositoryResult<Post>;

    /// Whether a post with this ID exists.
    async fn post_exists(&self, post_id: PostId) -> RepositoryResult<bool>;

    /// All posts, newest first.
    async fn list_posts(&self) -> RepositoryResult<Vec<Post>>;

    /// Replace a post's content and bump its `updated` timestamp.
    async fn update_post_content(&self, post_id: PostId, content: &str) -> RepositoryResult<Post>;

    /// Delete a post together with its comments and membership rows.
    ///
    /// # Returns
    /// * `Ok(true)` if a post was deleted, `Ok(false)` if none existed
    async fn delete_post(&self, post_id: PostId) -> RepositoryResult<bool>;

    // ==================== Membership (liked_by / saved_by) ====================

    /// Whether `user_id` is a member of the relation on `post_id`.
    async fn is_member(
        &self,
        post_id: PostId,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<bool>;

    /// Add `user_id` to the relation. Adding an existing member is a no-op.
    async fn add_member(
        &self,
        post_id: PostId,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<()>;

    /// Remove `user_id` from the relation. Removing a non-member is a no-op.
    async fn remove_member(
        &self,
        post_id: PostId,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<()>;

    /// Number of members of the relation on `post_id`.
    async fn member_count(&self, post_id: PostId, relation: Relation) -> RepositoryResult<usize>;

    /// Posts where `user_id` is a member of the relation, newest first.
    async fn list_posts_with_member(
        &self,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<Vec<Post>>;
}
