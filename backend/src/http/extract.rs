//! Request extractors: the acting identity and numeric path ids.

use axum::{
    extract::{FromRef, FromRequestParts, Path},
    http::{header::AUTHORIZATION, request::Parts},
};

use super::error::AppError;
use super::state::AppState;
use crate::auth::{Requester, TokenService};
use crate::services::NOT_FOUND;

const NO_CREDENTIALS: &str = "Invalid token header. No credentials provided.";
const SPACES_IN_TOKEN: &str = "Invalid token header. Token string should not contain spaces.";
const BAD_CHARACTERS: &str =
    "Invalid token header. Token string should not contain invalid characters.";

/// Pull the key out of an `Authorization` value.
///
/// `Ok(None)` means the header uses another scheme and the request stays
/// anonymous.
pub fn parse_authorization(value: &str) -> Result<Option<&str>, &'static str> {
    let mut parts = value.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }

    let key = parts.next().ok_or(NO_CREDENTIALS)?;
    if parts.next().is_some() {
        return Err(SPACES_IN_TOKEN);
    }
    Ok(Some(key))
}

impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Requester::Anonymous);
        };
        let value = header
            .to_str()
            .map_err(|_| AppError::Unauthorized(BAD_CHARACTERS.to_string()))?;
        let key = match parse_authorization(value) {
            Ok(Some(key)) => key,
            Ok(None) => return Ok(Requester::Anonymous),
            Err(message) => return Err(AppError::Unauthorized(message.to_string())),
        };

        let state = AppState::from_ref(state);
        let requester = TokenService::new(state.repo()).authenticate(key).await?;
        Ok(requester)
    }
}

/// A numeric `{id}` path segment; anything else is a 404.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub i64);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<i64>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| PathId(id))
            .map_err(|_| AppError::NotFound(NOT_FOUND.to_string()))
    }
}
