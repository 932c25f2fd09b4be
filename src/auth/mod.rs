//! User identity taken from request headers.
//!
//! Authentication happens upstream at the gateway; this service only trusts
//! the forwarded user id.

use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};

use crate::api::ApiError;

/// Headers checked for the user id, in order of precedence
pub const USER_ID_HEADERS: [&str; 3] = ["user-id", "x-user-id", "userid"];

/// User id forwarded by the gateway.
///
/// Used as an extractor, it rejects the request with `MISSING_USER_ID` or
/// `INVALID_USER_ID` before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

/// Parse a positive user id.
pub fn parse_user_id(raw: &str) -> Result<i64, ApiError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::InvalidUserId),
    }
}

pub fn user_id_from_headers(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = USER_ID_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).filter(|value| !value.is_empty()))
        .ok_or(ApiError::MissingUserId)?;

    let raw = raw.to_str().map_err(|_| ApiError::InvalidUserId)?;
    parse_user_id(raw).map(UserId)
}

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_from_headers(&parts.headers).inspect_err(|err| {
            tracing::debug!(error = %err, "rejected request without usable user id");
        })
    }
}
