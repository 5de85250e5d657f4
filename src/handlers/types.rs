//! # Common API Types
//!
//! This module contains shared types used across multiple API handlers,
//! including common response structures and pagination utilities.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::cursor::{CursorData, decode_cursor, resolve_limit};
use crate::error::ApiError;
use crate::repositories::Page;

/// Generic paginated response wrapper for list endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    /// List of items for the current page
    pub data: Vec<T>,
    /// Opaque cursor for fetching the next page (null if this is the last page)
    pub next_cursor: Option<String>,
    /// Convenience field indicating if more pages exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl<T> PaginatedResponse<T> {
    /// Create a new paginated response
    pub fn new(data: Vec<T>, next_cursor: Option<String>) -> Self {
        let has_more = next_cursor.is_some();
        Self {
            data,
            next_cursor,
            has_more: Some(has_more),
        }
    }
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self::new(page.items, page.next_cursor)
    }
}

/// Query parameters shared by list endpoints
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListQuery {
    /// Maximum number of rows to return (default: 50, max: 100)
    pub limit: Option<u64>,
    /// Opaque cursor for pagination continuation
    pub cursor: Option<String>,
    /// Restrict to one owner; honoured for admin identities only
    pub user_id: Option<Uuid>,
}

impl ListQuery {
    /// Validated page size and decoded cursor.
    pub fn page(&self) -> Result<(u64, Option<CursorData>), ApiError> {
        page_params(self.limit, self.cursor.as_deref())
    }
}

pub(crate) fn page_params(
    limit: Option<u64>,
    cursor: Option<&str>,
) -> Result<(u64, Option<CursorData>), ApiError> {
    let limit = resolve_limit(limit)?;
    let cursor = cursor.map(decode_cursor).transpose()?;
    Ok((limit, cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn page_conversion_sets_has_more() {
        let response: PaginatedResponse<u8> = Page {
            items: vec![1],
            next_cursor: Some("c".to_string()),
        }
        .into();
        assert_eq!(response.has_more, Some(true));

        let response: PaginatedResponse<u8> = Page {
            items: vec![],
            next_cursor: None,
        }
        .into();
        assert_eq!(response.has_more, Some(false));
    }

    #[test]
    fn list_query_decodes_cursor() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let query = ListQuery {
            limit: Some(10),
            cursor: Some(crate::cursor::encode_cursor(&now, &id)),
            user_id: None,
        };

        let (limit, cursor) = query.page().unwrap();
        assert_eq!(limit, 10);
        assert_eq!(cursor.map(|c| c.id), Some(id));
    }

    #[test]
    fn list_query_rejects_bad_limit_and_cursor() {
        let zero = ListQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert!(zero.page().is_err());

        let garbage = ListQuery {
            cursor: Some("not a cursor".to_string()),
            ..Default::default()
        };
        assert!(garbage.page().is_err());
    }
}
