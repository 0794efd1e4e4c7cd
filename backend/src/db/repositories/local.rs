//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in memory
//! using ordered maps, providing fast, deterministic, and isolated execution.

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::api::{
    Comment, CommentId, NewComment, NewPost, NewUser, Post, PostId, Relation, User, UserId,
    UserRelations,
};
use crate::db::repository::{
    CommentRepository, ErrorContext, PostRepository, RepositoryError, RepositoryResult,
    TokenRepository, UserRepository,
};

/// In-memory local repository.
///
/// Cloning is cheap and clones share the same underlying data.
///
/// # Example
/// ```
/// use microblog::api::NewUser;
/// use microblog::db::repositories::LocalRepository;
/// use microblog::db::repository::UserRepository;
///
/// let runtime = tokio::runtime::Runtime::new().unwrap();
/// runtime.block_on(async {
///     let repo = LocalRepository::new();
///     repo.create_user(NewUser::regular("amy", "amy@example.com", "hash"))
///         .await
///         .unwrap();
///     assert_eq!(repo.user_count(), 1);
/// });
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

/// Comment as stored; the author's username is resolved on read.
#[derive(Debug, Clone)]
struct CommentRow {
    id: CommentId,
    post: PostId,
    author: UserId,
    content: String,
    created: chrono::DateTime<Utc>,
    updated: chrono::DateTime<Utc>,
}

struct LocalData {
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, CommentRow>,

    // Token key -> owner, and owner -> key
    tokens: HashMap<String, UserId>,
    user_tokens: HashMap<UserId, String>,

    // ID counters
    next_user_id: i64,
    next_post_id: i64,
    next_comment_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            posts: BTreeMap::new(),
            comments: BTreeMap::new(),
            tokens: HashMap::new(),
            user_tokens: HashMap::new(),
            next_user_id: 1,
            next_post_id: 1,
            next_comment_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn post_mut(&mut self, post_id: PostId, operation: &str) -> RepositoryResult<&mut Post> {
        self.posts.get_mut(&post_id).ok_or_else(|| post_not_found(post_id, operation))
    }

    fn comment_view(&self, row: &CommentRow) -> Comment {
        let author_username = self
            .users
            .get(&row.author)
            .map(|u| u.username.clone())
            .unwrap_or_default();
        Comment {
            id: row.id,
            post: row.post,
            author: row.author,
            author_username,
            content: row.content.clone(),
            created: row.created,
            updated: row.updated,
        }
    }

    fn comments_newest_first<'a>(
        &self,
        rows: impl Iterator<Item = &'a CommentRow>,
    ) -> Vec<Comment> {
        let mut comments: Vec<Comment> = rows.map(|row| self.comment_view(row)).collect();
        comments.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        comments
    }
}

fn post_not_found(post_id: PostId, operation: &str) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("Post {} not found", post_id),
        ErrorContext::new(operation)
            .with_entity("post")
            .with_entity_id(post_id),
    )
}

fn posts_newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
    posts
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let is_healthy = data.is_healthy;
        *data = LocalData {
            is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of accounts stored.
    pub fn user_count(&self) -> usize {
        self.data.read().users.len()
    }

    /// Get the number of posts stored.
    pub fn post_count(&self) -> usize {
        self.data.read().posts.len()
    }

    /// Get the number of comments stored.
    pub fn comment_count(&self) -> usize {
        self.data.read().comments.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_user(&self, user: NewUser) -> RepositoryResult<User> {
        self.check_health()?;
        let mut data = self.data.write();

        if data.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::conflict_with_context(
                format!("Username '{}' already exists", user.username),
                ErrorContext::new("create_user").with_entity("user"),
            ));
        }

        let id = UserId(data.next_user_id);
        data.next_user_id += 1;

        let stored = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            first_name: String::new(),
            last_name: String::new(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        };
        data.users.insert(id, stored.clone());
        debug!("Stored user id={} username={}", id, stored.username);

        Ok(stored)
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User> {
        self.check_health()?;
        self.data.read().users.get(&user_id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("User {} not found", user_id),
                ErrorContext::new("get_user")
                    .with_entity("user")
                    .with_entity_id(user_id),
            )
        })
    }

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> RepositoryResult<bool> {
        self.check_health()?;
        Ok(self.data.read().users.values().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> RepositoryResult<bool> {
        self.check_health()?;
        Ok(self.data.read().users.values().any(|u| u.email == email))
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        self.check_health()?;
        Ok(self.data.read().users.values().cloned().collect())
    }

    async fn update_user(&self, user: &User) -> RepositoryResult<User> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = data.users.get_mut(&user.id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("User {} not found", user.id),
                ErrorContext::new("update_user")
                    .with_entity("user")
                    .with_entity_id(user.id),
            )
        })?;

        stored.email = user.email.clone();
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.is_staff = user.is_staff;
        stored.is_superuser = user.is_superuser;
        stored.is_active = user.is_active;
        stored.last_login = user.last_login;

        Ok(stored.clone())
    }

    async fn user_relations(&self, user_id: UserId) -> RepositoryResult<UserRelations> {
        self.check_health()?;
        let data = self.data.read();

        let mut relations = UserRelations::default();
        for post in data.posts.values() {
            if post.author == user_id {
                relations.posts.push(post.id);
            }
            if post.liked_by.contains(&user_id) {
                relations.likes.push(post.id);
            }
            if post.saved_by.contains(&user_id) {
                relations.saved.push(post.id);
            }
        }
        relations.comments = data
            .comments
            .values()
            .filter(|c| c.author == user_id)
            .map(|c| c.id)
            .collect();

        Ok(relations)
    }
}

#[async_trait]
impl PostRepository for LocalRepository {
    async fn create_post(&self, post: NewPost) -> RepositoryResult<Post> {
        self.check_health()?;
        let mut data = self.data.write();

        if !data.users.contains_key(&post.author) {
            return Err(RepositoryError::not_found_with_context(
                format!("User {} not found", post.author),
                ErrorContext::new("create_post")
                    .with_entity("user")
                    .with_entity_id(post.author),
            ));
        }

        let id = PostId(data.next_post_id);
        data.next_post_id += 1;

        let now = Utc::now();
        let stored = Post {
            id,
            author: post.author,
            content: post.content,
            created: now,
            updated: now,
            liked_by: Vec::new(),
            saved_by: Vec::new(),
        };
        data.posts.insert(id, stored.clone());
        debug!("Stored post id={} author={}", id, stored.author);

        Ok(stored)
    }

    async fn get_post(&self, post_id: PostId) -> RepositoryResult<Post> {
        self.check_health()?;
        self.data
            .read()
            .posts
            .get(&post_id)
            .cloned()
            .ok_or_else(|| post_not_found(post_id, "get_post"))
    }

    async fn post_exists(&self, post_id: PostId) -> RepositoryResult<bool> {
        self.check_health()?;
        Ok(self.data.read().posts.contains_key(&post_id))
    }

    async fn list_posts(&self) -> RepositoryResult<Vec<Post>> {
        self.check_health()?;
        let posts = self.data.read().posts.values().cloned().collect();
        Ok(posts_newest_first(posts))
    }

    async fn update_post_content(&self, post_id: PostId, content: &str) -> RepositoryResult<Post> {
        self.check_health()?;
        let mut data = self.data.write();
        let post = data.post_mut(post_id, "update_post_content")?;
        post.content = content.to_string();
        post.updated = Utc::now();
        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: PostId) -> RepositoryResult<bool> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.posts.remove(&post_id).is_none() {
            return Ok(false);
        }
        data.comments.retain(|_, c| c.post != post_id);
        debug!("Deleted post id={} and its comments", post_id);
        Ok(true)
    }

    async fn is_member(
        &self,
        post_id: PostId,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<bool> {
        self.check_health()?;
        let data = self.data.read();
        let post = data
            .posts
            .get(&post_id)
            .ok_or_else(|| post_not_found(post_id, "is_member"))?;
        Ok(post.members(relation).contains(&user_id))
    }

    async fn add_member(
        &self,
        post_id: PostId,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        let post = data.post_mut(post_id, "add_member")?;
        let members = match relation {
            Relation::Like => &mut post.liked_by,
            Relation::Save => &mut post.saved_by,
        };
        if !members.contains(&user_id) {
            members.push(user_id);
        }
        Ok(())
    }

    async fn remove_member(
        &self,
        post_id: PostId,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        let post = data.post_mut(post_id, "remove_member")?;
        let members = match relation {
            Relation::Like => &mut post.liked_by,
            Relation::Save => &mut post.saved_by,
        };
        members.retain(|id| *id != user_id);
        Ok(())
    }

    async fn member_count(&self, post_id: PostId, relation: Relation) -> RepositoryResult<usize> {
        self.check_health()?;
        let data = self.data.read();
        let post = data
            .posts
            .get(&post_id)
            .ok_or_else(|| post_not_found(post_id, "member_count"))?;
        Ok(post.members(relation).len())
    }

    async fn list_posts_with_member(
        &self,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<Vec<Post>> {
        self.check_health()?;
        let posts = self
            .data
            .read()
            .posts
            .values()
            .filter(|p| p.members(relation).contains(&user_id))
            .cloned()
            .collect();
        Ok(posts_newest_first(posts))
    }
}

#[async_trait]
impl CommentRepository for LocalRepository {
    async fn create_comment(&self, comment: NewComment) -> RepositoryResult<Comment> {
        self.check_health()?;
        let mut data = self.data.write();

        if !data.posts.contains_key(&comment.post) {
            return Err(post_not_found(comment.post, "create_comment"));
        }

        let id = CommentId(data.next_comment_id);
        data.next_comment_id += 1;

        let now = Utc::now();
        let row = CommentRow {
            id,
            post: comment.post,
            author: comment.author,
            content: comment.content,
            created: now,
            updated: now,
        };
        let view = data.comment_view(&row);
        data.comments.insert(id, row);

        Ok(view)
    }

    async fn get_comment(&self, comment_id: CommentId) -> RepositoryResult<Comment> {
        self.check_health()?;
        let data = self.data.read();
        data.comments
            .get(&comment_id)
            .map(|row| data.comment_view(row))
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("Comment {} not found", comment_id),
                    ErrorContext::new("get_comment")
                        .with_entity("comment")
                        .with_entity_id(comment_id),
                )
            })
    }

    async fn comment_exists(&self, comment_id: CommentId) -> RepositoryResult<bool> {
        self.check_health()?;
        Ok(self.data.read().comments.contains_key(&comment_id))
    }

    async fn list_comments(&self) -> RepositoryResult<Vec<Comment>> {
        self.check_health()?;
        let data = self.data.read();
        Ok(data.comments_newest_first(data.comments.values()))
    }

    async fn list_comments_for_post(&self, post_id: PostId) -> RepositoryResult<Vec<Comment>> {
        self.check_health()?;
        let data = self.data.read();
        Ok(data.comments_newest_first(data.comments.values().filter(|c| c.post == post_id)))
    }

    async fn update_comment_content(
        &self,
        comment_id: CommentId,
        content: &str,
    ) -> RepositoryResult<Comment> {
        self.check_health()?;
        let mut data = self.data.write();
        let row = data.comments.get_mut(&comment_id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Comment {} not found", comment_id),
                ErrorContext::new("update_comment_content")
                    .with_entity("comment")
                    .with_entity_id(comment_id),
            )
        })?;
        row.content = content.to_string();
        row.updated = Utc::now();
        let row = row.clone();
        Ok(data.comment_view(&row))
    }

    async fn delete_comment(&self, comment_id: CommentId) -> RepositoryResult<bool> {
        self.check_health()?;
        Ok(self.data.write().comments.remove(&comment_id).is_some())
    }
}

#[async_trait]
impl TokenRepository for LocalRepository {
    async fn get_or_create_token(&self, user_id: UserId, new_key: &str) -> RepositoryResult<String> {
        self.check_health()?;
        let mut data = self.data.write();

        if let Some(existing) = data.user_tokens.get(&user_id) {
            return Ok(existing.clone());
        }
        if !data.users.contains_key(&user_id) {
            return Err(RepositoryError::not_found_with_context(
                format!("User {} not found", user_id),
                ErrorContext::new("get_or_create_token")
                    .with_entity("user")
                    .with_entity_id(user_id),
            ));
        }
        if data.tokens.contains_key(new_key) {
            return Err(RepositoryError::conflict_with_context(
                "Token key already in use",
                ErrorContext::new("get_or_create_token").with_entity("token"),
            ));
        }

        data.tokens.insert(new_key.to_string(), user_id);
        data.user_tokens.insert(user_id, new_key.to_string());
        Ok(new_key.to_string())
    }

    async fn find_user_by_token(&self, key: &str) -> RepositoryResult<Option<User>> {
        self.check_health()?;
        let data = self.data.read();
        Ok(data
            .tokens
            .get(key)
            .and_then(|user_id| data.users.get(user_id))
            .cloned())
    }
}
