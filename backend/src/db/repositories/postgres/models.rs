use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{auth_tokens, comments, post_liked_by, post_saved_by, posts, users};
use crate::api::{Comment, CommentId, Post, PostId, User, UserId};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId(row.id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            is_active: row.is_active,
            date_joined: row.date_joined,
            last_login: row.last_login,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub struct UserChangeset {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserChangeset {
    fn from(user: &User) -> Self {
        UserChangeset {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub content: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl PostRow {
    /// Attach membership lists loaded from the join tables.
    pub fn into_post(self, liked_by: Vec<i64>, saved_by: Vec<i64>) -> Post {
        Post {
            id: PostId(self.id),
            author: UserId(self.author_id),
            content: self.content,
            created: self.created,
            updated: self.updated,
            liked_by: liked_by.into_iter().map(UserId).collect(),
            saved_by: saved_by.into_iter().map(UserId).collect(),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPostRow {
    pub author_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl CommentRow {
    pub fn into_comment(self, author_username: String) -> Comment {
        Comment {
            id: CommentId(self.id),
            post: PostId(self.post_id),
            author: UserId(self.author_id),
            author_username,
            content: self.content,
            created: self.created,
            updated: self.updated,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub struct NewCommentRow {
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = post_liked_by)]
pub struct NewLikeRow {
    pub post_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = post_saved_by)]
pub struct NewSaveRow {
    pub post_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = auth_tokens)]
pub struct NewTokenRow {
    pub key: String,
    pub user_id: i64,
}
