//! Domain records shared by the repository, service and HTTP layers.
//!
//! Records here are storage-shaped: they carry every persisted column plus the
//! membership lists of the two post/user join tables. Wire representations live
//! in `http::dto`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of post and comment content, in characters.
pub const CONTENT_MAX_CHARS: usize = 140;

/// Maximum length of each registration field.
pub const CREDENTIAL_MAX_CHARS: usize = 100;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                $name(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                $name(value)
            }
        }
    };
}

id_newtype!(
    /// User identifier (database primary key).
    UserId
);
id_newtype!(
    /// Post identifier (database primary key).
    PostId
);
id_newtype!(
    /// Comment identifier (database primary key).
    CommentId
);

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// PHC-formatted Argon2 hash; never serialized to clients.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUser {
    /// A regular, non-privileged account.
    pub fn regular(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            is_staff: false,
            is_superuser: false,
        }
    }

    /// A superuser account (staff and superuser flags set).
    pub fn superuser(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            is_staff: true,
            is_superuser: true,
            ..Self::regular(username, email, password_hash)
        }
    }
}

/// Ids of everything a user is related to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRelations {
    pub posts: Vec<PostId>,
    pub likes: Vec<PostId>,
    pub saved: Vec<PostId>,
    pub comments: Vec<CommentId>,
}

/// A short text post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub content: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub liked_by: Vec<UserId>,
    pub saved_by: Vec<UserId>,
}

impl Post {
    /// Members of the given join relation.
    pub fn members(&self, relation: Relation) -> &[UserId] {
        match relation {
            Relation::Like => &self.liked_by,
            Relation::Save => &self.saved_by,
        }
    }
}

/// Input for creating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: UserId,
    pub content: String,
}

/// A comment attached to a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    pub author: UserId,
    /// Denormalized from the author's account at read time.
    pub author_username: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Input for creating a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post: PostId,
    pub author: UserId,
    pub content: String,
}

/// The two post/user membership tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Like,
    Save,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Like => "liked_by",
            Relation::Save => "saved_by",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate post or comment content.
///
/// Content must contain at least one non-whitespace character and at most
/// [`CONTENT_MAX_CHARS`] characters.
pub fn validate_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if content.chars().count() > CONTENT_MAX_CHARS {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            CONTENT_MAX_CHARS
        ));
    }
    Ok(())
}
