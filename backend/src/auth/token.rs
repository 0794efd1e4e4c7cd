//! Opaque token keys: issued at login, presented as `Authorization: Token <key>`.

use log::debug;
use rand::RngCore;

use super::{verify_password, AuthError, Requester};
use crate::db::repository::FullRepository;

/// Random bytes per key; hex encoding doubles this to 40 characters.
pub const TOKEN_KEY_BYTES: usize = 20;

/// Generate a fresh 40-character lowercase hex key.
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues and resolves token keys against a repository.
pub struct TokenService<'a, R: FullRepository + ?Sized> {
    repo: &'a R,
}

impl<'a, R: FullRepository + ?Sized> TokenService<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Exchange credentials for the user's token key.
    ///
    /// A user keeps the same key across logins. Unknown users, inactive users
    /// and wrong passwords all fail with [`AuthError::InvalidCredentials`].
    pub async fn obtain_token(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self
            .repo
            .find_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active || !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let key = self
            .repo
            .get_or_create_token(user.id, &generate_token_key())
            .await?;
        debug!("Issued token for user id={}", user.id);
        Ok(key)
    }

    /// Resolve a presented key to the identity it belongs to.
    pub async fn authenticate(&self, key: &str) -> Result<Requester, AuthError> {
        match self.repo.find_user_by_token(key).await? {
            Some(user) if user.is_active => Ok(Requester::Authenticated(user)),
            Some(_) => Err(AuthError::InactiveUser),
            None => Err(AuthError::InvalidToken),
        }
    }
}
