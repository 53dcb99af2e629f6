//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod stock;

use axum::http::HeaderMap;
use common::UserId;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated caller, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Parses a UUID path segment.
fn parse_uuid(kind: &str, id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|e| ApiError::BadRequest(format!("Invalid {kind} id: {e}")))
}

/// Reads the caller's id from [`USER_ID_HEADER`].
fn user_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let value = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
    let value = value
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("invalid {USER_ID_HEADER} header")))?;
    Ok(UserId::from_uuid(parse_uuid("user", value.trim())?))
}
