//! Registration and token login.

use log::info;

use super::{Reply, ServiceResult, Status};
use crate::api::{NewUser, CREDENTIAL_MAX_CHARS};
use crate::auth::{hash_password, AuthError, TokenService};
use crate::db::repository::{FullRepository, RepositoryError};

pub const INVALID_REGISTRATION: &str = "User credentials are not valid";

/// Registration body; every field is required.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub username: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub email: Option<String>,
}

/// Login body.
#[derive(Debug, Clone, Default)]
pub struct LoginInput {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Trimmed, non-blank, at most [`CREDENTIAL_MAX_CHARS`] characters.
fn credential_field(value: Option<&str>) -> Option<&str> {
    let value = value?.trim();
    if value.is_empty() || value.chars().count() > CREDENTIAL_MAX_CHARS {
        return None;
    }
    Some(value)
}

/// Domains accepted without a dot.
const BARE_DOMAIN_ALLOWLIST: &[&str] = &["localhost"];

/// A single `@` with a non-empty local part and a dotted (or allowlisted) domain.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    if BARE_DOMAIN_ALLOWLIST.contains(&domain) {
        return true;
    }
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

/// Create an account.
///
/// Malformed payloads get 404. A password mismatch and taken usernames or
/// emails are answered with status 200 and an `error` body.
pub async fn register<R: FullRepository + ?Sized>(
    repo: &R,
    input: &RegisterInput,
) -> ServiceResult<Reply<String>> {
    let fields = (
        credential_field(input.username.as_deref()),
        credential_field(input.password.as_deref()),
        credential_field(input.confirm_password.as_deref()),
        credential_field(input.email.as_deref()),
    );
    let (Some(username), Some(password), Some(confirm_password), Some(email)) = fields else {
        return Ok(Reply::not_found(INVALID_REGISTRATION));
    };
    if !looks_like_email(email) {
        return Ok(Reply::not_found(INVALID_REGISTRATION));
    }

    if password != confirm_password {
        return Ok(Reply::error(Status::Ok, "Password do not match."));
    }

    if repo.username_exists(username).await? {
        return Ok(Reply::error(Status::Ok, "Username is already taken"));
    }

    if repo.email_exists(email).await? {
        return Ok(Reply::error(Status::Ok, "Email is already taken"));
    }

    let hash = hash_password(password)?;
    match repo
        .create_user(NewUser::regular(username, email, hash))
        .await
    {
        Ok(user) => info!("Registered user '{}' (id={})", user.username, user.id),
        // Lost a race with a concurrent registration
        Err(RepositoryError::Conflict { .. }) => {
            return Ok(Reply::error(Status::Ok, "Username is already taken"));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Reply::ok("User created successfully.".to_string()))
}

/// Exchange a username and password for the user's token key.
pub async fn login<R: FullRepository + ?Sized>(
    repo: &R,
    input: &LoginInput,
) -> ServiceResult<Reply<String>> {
    let username = match input.username.as_deref().map(str::trim) {
        None => return Ok(Reply::bad_request("username: This field is required.")),
        Some("") => return Ok(Reply::bad_request("username: This field may not be blank.")),
        Some(username) => username,
    };
    let password = match input.password.as_deref() {
        None => return Ok(Reply::bad_request("password: This field is required.")),
        Some("") => return Ok(Reply::bad_request("password: This field may not be blank.")),
        Some(password) => password,
    };

    match TokenService::new(repo).obtain_token(username, password).await {
        Ok(key) => Ok(Reply::ok(key)),
        Err(AuthError::InvalidCredentials) => Ok(Reply::bad_request(
            AuthError::InvalidCredentials.to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}
