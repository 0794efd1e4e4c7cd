//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres database.
//! The `liked_by` and `saved_by` relations are stored in two join tables,
//! `post_liked_by` and `post_saved_by`, each with a unique `(post_id, user_id)`
//! pair.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task;

use crate::api::{
    Comment, CommentId, NewComment, NewPost, NewUser, Post, PostId, Relation, User, UserId,
    UserRelations,
};
use crate::db::repository::{
    CommentRepository, ErrorContext, PostRepository, RepositoryError, RepositoryResult,
    TokenRepository, UserRepository,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the variables read and their defaults.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Returns
    /// * `Ok(PostgresRepository)` on success
    /// * `Err(RepositoryError)` if connection or migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self { pool, config })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// The operation runs on the blocking pool and is retried up to
    /// `max_retries` times, with exponential backoff, when the error is
    /// retryable (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    debug!("Retrying database operation (attempt {})", attempt + 1);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn post_not_found(post_id: i64, operation: &str) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("Post {} not found", post_id),
        ErrorContext::new(operation)
            .with_entity("post")
            .with_entity_id(post_id),
    )
}

fn ensure_post_exists(conn: &mut PgConnection, post_id: i64, operation: &str) -> RepositoryResult<()> {
    let found: bool = diesel::select(exists(posts::table.find(post_id)))
        .get_result(conn)
        .map_err(map_diesel_error)?;
    if found {
        Ok(())
    } else {
        Err(post_not_found(post_id, operation))
    }
}

/// Load `(post_id, user_id)` pairs of a relation for the given posts, in insertion order.
fn load_members(
    conn: &mut PgConnection,
    relation: Relation,
    post_ids: &[i64],
) -> RepositoryResult<Vec<(i64, i64)>> {
    let pairs = match relation {
        Relation::Like => post_liked_by::table
            .filter(post_liked_by::post_id.eq_any(post_ids))
            .order(post_liked_by::id.asc())
            .select((post_liked_by::post_id, post_liked_by::user_id))
            .load::<(i64, i64)>(conn),
        Relation::Save => post_saved_by::table
            .filter(post_saved_by::post_id.eq_any(post_ids))
            .order(post_saved_by::id.asc())
            .select((post_saved_by::post_id, post_saved_by::user_id))
            .load::<(i64, i64)>(conn),
    };
    pairs.map_err(map_diesel_error)
}

fn group_members(pairs: Vec<(i64, i64)>) -> HashMap<i64, Vec<i64>> {
    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    for (post_id, user_id) in pairs {
        grouped.entry(post_id).or_default().push(user_id);
    }
    grouped
}

/// Attach `liked_by` / `saved_by` to a batch of post rows, preserving row order.
fn hydrate_posts(conn: &mut PgConnection, rows: Vec<PostRow>) -> RepositoryResult<Vec<Post>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut likes = group_members(load_members(conn, Relation::Like, &ids)?);
    let mut saves = group_members(load_members(conn, Relation::Save, &ids)?);

    Ok(rows
        .into_iter()
        .map(|row| {
            let liked_by = likes.remove(&row.id).unwrap_or_default();
            let saved_by = saves.remove(&row.id).unwrap_or_default();
            row.into_post(liked_by, saved_by)
        })
        .collect())
}

fn hydrate_post(conn: &mut PgConnection, row: PostRow) -> RepositoryResult<Post> {
    let post_id = row.id;
    hydrate_posts(conn, vec![row])?
        .pop()
        .ok_or_else(|| post_not_found(post_id, "hydrate_post"))
}

fn load_comments(
    conn: &mut PgConnection,
    post_id: Option<i64>,
) -> RepositoryResult<Vec<Comment>> {
    let mut query = comments::table
        .inner_join(users::table)
        .select((CommentRow::as_select(), users::username))
        .order((comments::created.desc(), comments::id.desc()))
        .into_boxed();
    if let Some(post_id) = post_id {
        query = query.filter(comments::post_id.eq(post_id));
    }

    let rows: Vec<(CommentRow, String)> = query.load(conn).map_err(map_diesel_error)?;
    Ok(rows
        .into_iter()
        .map(|(row, username)| row.into_comment(username))
        .collect())
}

fn comment_not_found(comment_id: i64, operation: &str) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("Comment {} not found", comment_id),
        ErrorContext::new(operation)
            .with_entity("comment")
            .with_entity_id(comment_id),
    )
}

fn load_comment(conn: &mut PgConnection, comment_id: i64, operation: &str) -> RepositoryResult<Comment> {
    let row: Option<(CommentRow, String)> = comments::table
        .inner_join(users::table)
        .filter(comments::id.eq(comment_id))
        .select((CommentRow::as_select(), users::username))
        .first(conn)
        .optional()
        .map_err(map_diesel_error)?;

    row.map(|(row, username)| row.into_comment(username))
        .ok_or_else(|| comment_not_found(comment_id, operation))
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_user(&self, user: NewUser) -> RepositoryResult<User> {
        let row = NewUserRow {
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        };
        self.with_conn(move |conn| {
            let inserted: UserRow = diesel::insert_into(users::table)
                .values(&row)
                .returning(UserRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_user"))?;
            debug!("Stored user id={} username={}", inserted.id, inserted.username);
            Ok(User::from(inserted))
        })
        .await
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User> {
        self.with_conn(move |conn| {
            users::table
                .find(user_id.value())
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(User::from)
                .ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        format!("User {} not found", user_id),
                        ErrorContext::new("get_user")
                            .with_entity("user")
                            .with_entity_id(user_id),
                    )
                })
        })
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            users::table
                .filter(users::username.eq(&username))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map(|row| row.map(User::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn username_exists(&self, username: &str) -> RepositoryResult<bool> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            diesel::select(exists(users::table.filter(users::username.eq(&username))))
                .get_result(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn email_exists(&self, email: &str) -> RepositoryResult<bool> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            diesel::select(exists(users::table.filter(users::email.eq(&email))))
                .get_result(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        self.with_conn(|conn| {
            let rows: Vec<UserRow> = users::table
                .order(users::id.asc())
                .select(UserRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(User::from).collect())
        })
        .await
    }

    async fn update_user(&self, user: &User) -> RepositoryResult<User> {
        let user_id = user.id;
        let changes = UserChangeset::from(user);
        self.with_conn(move |conn| {
            diesel::update(users::table.find(user_id.value()))
                .set(&changes)
                .returning(UserRow::as_returning())
                .get_result::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(User::from)
                .ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        format!("User {} not found", user_id),
                        ErrorContext::new("update_user")
                            .with_entity("user")
                            .with_entity_id(user_id),
                    )
                })
        })
        .await
    }

    async fn user_relations(&self, user_id: UserId) -> RepositoryResult<UserRelations> {
        let id = user_id.value();
        self.with_conn(move |conn| {
            let posts: Vec<i64> = posts::table
                .filter(posts::author_id.eq(id))
                .order(posts::id.asc())
                .select(posts::id)
                .load(conn)
                .map_err(map_diesel_error)?;
            let likes: Vec<i64> = post_liked_by::table
                .filter(post_liked_by::user_id.eq(id))
                .order(post_liked_by::post_id.asc())
                .select(post_liked_by::post_id)
                .load(conn)
                .map_err(map_diesel_error)?;
            let saved: Vec<i64> = post_saved_by::table
                .filter(post_saved_by::user_id.eq(id))
                .order(post_saved_by::post_id.asc())
                .select(post_saved_by::post_id)
                .load(conn)
                .map_err(map_diesel_error)?;
            let comments: Vec<i64> = comments::table
                .filter(comments::author_id.eq(id))
                .order(comments::id.asc())
                .select(comments::id)
                .load(conn)
                .map_err(map_diesel_error)?;

            Ok(UserRelations {
                posts: posts.into_iter().map(PostId).collect(),
                likes: likes.into_iter().map(PostId).collect(),
                saved: saved.into_iter().map(PostId).collect(),
                comments: comments.into_iter().map(CommentId).collect(),
            })
        })
        .await
    }
}

#[async_trait]
impl PostRepository for PostgresRepository {
    async fn create_post(&self, post: NewPost) -> RepositoryResult<Post> {
        let row = NewPostRow {
            author_id: post.author.value(),
            content: post.content,
        };
        self.with_conn(move |conn| {
            let inserted: PostRow = diesel::insert_into(posts::table)
                .values(&row)
                .returning(PostRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_post"))?;
            debug!("Stored post id={} author={}", inserted.id, inserted.author_id);
            Ok(inserted.into_post(Vec::new(), Vec::new()))
        })
        .await
    }

    async fn get_post(&self, post_id: PostId) -> RepositoryResult<Post> {
        let id = post_id.value();
        self.with_conn(move |conn| {
            let row = posts::table
                .find(id)
                .select(PostRow::as_select())
                .first::<PostRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| post_not_found(id, "get_post"))?;
            hydrate_post(conn, row)
        })
        .await
    }

    async fn post_exists(&self, post_id: PostId) -> RepositoryResult<bool> {
        let id = post_id.value();
        self.with_conn(move |conn| {
            diesel::select(exists(posts::table.find(id)))
                .get_result(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_posts(&self) -> RepositoryResult<Vec<Post>> {
        self.with_conn(|conn| {
            let rows: Vec<PostRow> = posts::table
                .order((posts::created.desc(), posts::id.desc()))
                .select(PostRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            hydrate_posts(conn, rows)
        })
        .await
    }

    async fn update_post_content(&self, post_id: PostId, content: &str) -> RepositoryResult<Post> {
        let id = post_id.value();
        let content = content.to_string();
        self.with_conn(move |conn| {
            let row = diesel::update(posts::table.find(id))
                .set((posts::content.eq(&content), posts::updated.eq(Utc::now())))
                .returning(PostRow::as_returning())
                .get_result::<PostRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| post_not_found(id, "update_post_content"))?;
            hydrate_post(conn, row)
        })
        .await
    }

    async fn delete_post(&self, post_id: PostId) -> RepositoryResult<bool> {
        let id = post_id.value();
        self.with_conn(move |conn| {
            // Comments and membership rows go with the post via ON DELETE CASCADE
            let deleted = diesel::delete(posts::table.find(id))
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn is_member(
        &self,
        post_id: PostId,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<bool> {
        let (p, u) = (post_id.value(), user_id.value());
        self.with_conn(move |conn| {
            ensure_post_exists(conn, p, "is_member")?;
            let found = match relation {
                Relation::Like => diesel::select(exists(
                    post_liked_by::table
                        .filter(post_liked_by::post_id.eq(p))
                        .filter(post_liked_by::user_id.eq(u)),
                ))
                .get_result(conn),
                Relation::Save => diesel::select(exists(
                    post_saved_by::table
                        .filter(post_saved_by::post_id.eq(p))
                        .filter(post_saved_by::user_id.eq(u)),
                ))
                .get_result(conn),
            };
            found.map_err(map_diesel_error)
        })
        .await
    }

    async fn add_member(
        &self,
        post_id: PostId,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<()> {
        let (p, u) = (post_id.value(), user_id.value());
        self.with_conn(move |conn| {
            ensure_post_exists(conn, p, "add_member")?;
            let inserted = match relation {
                Relation::Like => diesel::insert_into(post_liked_by::table)
                    .values(&NewLikeRow { post_id: p, user_id: u })
                    .on_conflict_do_nothing()
                    .execute(conn),
                Relation::Save => diesel::insert_into(post_saved_by::table)
                    .values(&NewSaveRow { post_id: p, user_id: u })
                    .on_conflict_do_nothing()
                    .execute(conn),
            };
            inserted
                .map(|_| ())
                .map_err(|e| map_diesel_error(e).with_operation("add_member"))
        })
        .await
    }

    async fn remove_member(
        &self,
        post_id: PostId,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<()> {
        let (p, u) = (post_id.value(), user_id.value());
        self.with_conn(move |conn| {
            ensure_post_exists(conn, p, "remove_member")?;
            let removed = match relation {
                Relation::Like => diesel::delete(
                    post_liked_by::table
                        .filter(post_liked_by::post_id.eq(p))
                        .filter(post_liked_by::user_id.eq(u)),
                )
                .execute(conn),
                Relation::Save => diesel::delete(
                    post_saved_by::table
                        .filter(post_saved_by::post_id.eq(p))
                        .filter(post_saved_by::user_id.eq(u)),
                )
                .execute(conn),
            };
            removed.map(|_| ()).map_err(map_diesel_error)
        })
        .await
    }

    async fn member_count(&self, post_id: PostId, relation: Relation) -> RepositoryResult<usize> {
        let p = post_id.value();
        self.with_conn(move |conn| {
            ensure_post_exists(conn, p, "member_count")?;
            let count: i64 = match relation {
                Relation::Like => post_liked_by::table
                    .filter(post_liked_by::post_id.eq(p))
                    .count()
                    .get_result(conn),
                Relation::Save => post_saved_by::table
                    .filter(post_saved_by::post_id.eq(p))
                    .count()
                    .get_result(conn),
            }
            .map_err(map_diesel_error)?;
            Ok(count.max(0) as usize)
        })
        .await
    }

    async fn list_posts_with_member(
        &self,
        relation: Relation,
        user_id: UserId,
    ) -> RepositoryResult<Vec<Post>> {
        let u = user_id.value();
        self.with_conn(move |conn| {
            let member_of: Vec<i64> = match relation {
                Relation::Like => post_liked_by::table
                    .filter(post_liked_by::user_id.eq(u))
                    .select(post_liked_by::post_id)
                    .load(conn),
                Relation::Save => post_saved_by::table
                    .filter(post_saved_by::user_id.eq(u))
                    .select(post_saved_by::post_id)
                    .load(conn),
            }
            .map_err(map_diesel_error)?;

            let rows: Vec<PostRow> = posts::table
                .filter(posts::id.eq_any(&member_of))
                .order((posts::created.desc(), posts::id.desc()))
                .select(PostRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            hydrate_posts(conn, rows)
        })
        .await
    }
}

#[async_trait]
impl CommentRepository for PostgresRepository {
    async fn create_comment(&self, comment: NewComment) -> RepositoryResult<Comment> {
        let row = NewCommentRow {
            post_id: comment.post.value(),
            author_id: comment.author.value(),
            content: comment.content,
        };
        self.with_conn(move |conn| {
            ensure_post_exists(conn, row.post_id, "create_comment")?;
            let inserted: CommentRow = diesel::insert_into(comments::table)
                .values(&row)
                .returning(CommentRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_comment"))?;
            load_comment(conn, inserted.id, "create_comment")
        })
        .await
    }

    async fn get_comment(&self, comment_id: CommentId) -> RepositoryResult<Comment> {
        let id = comment_id.value();
        self.with_conn(move |conn| load_comment(conn, id, "get_comment"))
            .await
    }

    async fn comment_exists(&self, comment_id: CommentId) -> RepositoryResult<bool> {
        let id = comment_id.value();
        self.with_conn(move |conn| {
            diesel::select(exists(comments::table.find(id)))
                .get_result(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_comments(&self) -> RepositoryResult<Vec<Comment>> {
        self.with_conn(|conn| load_comments(conn, None)).await
    }

    async fn list_comments_for_post(&self, post_id: PostId) -> RepositoryResult<Vec<Comment>> {
        let id = post_id.value();
        self.with_conn(move |conn| load_comments(conn, Some(id)))
            .await
    }

    async fn update_comment_content(
        &self,
        comment_id: CommentId,
        content: &str,
    ) -> RepositoryResult<Comment> {
        let id = comment_id.value();
        let content = content.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(comments::table.find(id))
                .set((comments::content.eq(&content), comments::updated.eq(Utc::now())))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if updated == 0 {
                return Err(comment_not_found(id, "update_comment_content"));
            }
            load_comment(conn, id, "update_comment_content")
        })
        .await
    }

    async fn delete_comment(&self, comment_id: CommentId) -> RepositoryResult<bool> {
        let id = comment_id.value();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(comments::table.find(id))
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[async_trait]
impl TokenRepository for PostgresRepository {
    async fn get_or_create_token(&self, user_id: UserId, new_key: &str) -> RepositoryResult<String> {
        let row = NewTokenRow {
            key: new_key.to_string(),
            user_id: user_id.value(),
        };
        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let existing: Option<String> = auth_tokens::table
                    .filter(auth_tokens::user_id.eq(row.user_id))
                    .select(auth_tokens::key)
                    .first(tx)
                    .optional()?;
                if let Some(key) = existing {
                    return Ok(key);
                }

                let key: String = diesel::insert_into(auth_tokens::table)
                    .values(&row)
                    .returning(auth_tokens::key)
                    .get_result(tx)
                    .map_err(|e| map_diesel_error(e).with_operation("get_or_create_token"))?;
                Ok(key)
            })
        })
        .await
    }

    async fn find_user_by_token(&self, key: &str) -> RepositoryResult<Option<User>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            auth_tokens::table
                .inner_join(users::table)
                .filter(auth_tokens::key.eq(&key))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map(|row| row.map(User::from))
                .map_err(map_diesel_error)
        })
        .await
    }
}
