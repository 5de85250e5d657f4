//! # Cursor Utilities
//!
//! Opaque keyset cursors for list endpoints. A cursor carries the
//! `(created_at, id)` pair of the last row on the previous page.

use crate::error::ApiError;
use axum::http::StatusCode;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size when `limit` is omitted
pub const DEFAULT_PAGE_LIMIT: u64 = 50;
/// Largest page size a client may request
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Decoded position of the last row returned on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorData {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

fn invalid(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
}

/// Encode cursor data as an opaque base64 string
pub fn encode_cursor(created_at: &DateTime<Utc>, id: &Uuid) -> String {
    let cursor_data = CursorData {
        created_at: *created_at,
        id: *id,
    };
    // Serializing two plain fields cannot fail.
    let json = serde_json::to_string(&cursor_data).unwrap_or_default();
    base64::engine::general_purpose::STANDARD.encode(json.as_bytes())
}

/// Decode cursor data from an opaque base64 string with validation
pub fn decode_cursor(cursor: &str) -> Result<CursorData, ApiError> {
    if cursor.len() > 1000 {
        return Err(invalid("cursor is too long"));
    }

    if cursor.is_empty() {
        return Err(invalid("cursor cannot be empty"));
    }

    if !cursor
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        return Err(invalid("cursor contains invalid characters"));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(cursor)
        .map_err(|_| invalid("cursor is not valid base64"))?;

    if decoded.len() > 500 {
        return Err(invalid("decoded cursor is too large"));
    }

    let json =
        String::from_utf8(decoded).map_err(|_| invalid("cursor contains invalid UTF-8 data"))?;

    let cursor_data: CursorData = serde_json::from_str(&json)
        .map_err(|_| invalid("cursor contains invalid JSON structure"))?;

    if cursor_data.id.is_nil() {
        return Err(invalid("cursor contains invalid ID"));
    }

    Ok(cursor_data)
}

/// Clamp a requested page size into `1..=MAX_PAGE_LIMIT`, rejecting zero.
pub fn resolve_limit(limit: Option<u64>) -> Result<u64, ApiError> {
    match limit {
        None => Ok(DEFAULT_PAGE_LIMIT),
        Some(0) => Err(invalid("limit must be at least 1")),
        Some(n) if n > MAX_PAGE_LIMIT => Err(invalid("limit must not exceed 100")),
        Some(n) => Ok(n),
    }
}
