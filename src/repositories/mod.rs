//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access with owner-aware list
//! methods and keyset pagination.

pub mod client;
pub mod cron_task;
pub mod expense;
pub mod invoice;
pub mod lookups;
pub mod product;
pub mod rbac;
pub mod supplier;
pub mod user;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Select,
};
use uuid::Uuid;

use crate::cursor::{CursorData, encode_cursor};
use crate::error::RepositoryError;
use crate::models;

pub use client::ClientRepository;
pub use cron_task::CronTaskRepository;
pub use expense::ExpenseRepository;
pub use invoice::InvoiceRepository;
pub use lookups::{BankRepository, PaymentMethodRepository, TaxRepository};
pub use product::ProductRepository;
pub use rbac::RbacRepository;
pub use supplier::SupplierRepository;
pub use user::{NewUser, UserRepository};

/// One page of a keyset-paginated listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor of the last returned row when more rows follow
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// Rows that can be positioned by `(created_at, id)`.
pub trait Keyed {
    fn cursor_key(&self) -> (DateTime<Utc>, Uuid);
}

macro_rules! impl_keyed {
    ($($model:path),+ $(,)?) => {
        $(
            impl Keyed for $model {
                fn cursor_key(&self) -> (DateTime<Utc>, Uuid) {
                    (self.created_at.with_timezone(&Utc), self.id)
                }
            }
        )+
    };
}

impl_keyed!(
    models::bank::Model,
    models::client::Model,
    models::cron_task::Model,
    models::expense::Model,
    models::invoice::Model,
    models::payment_method::Model,
    models::permission::Model,
    models::product::Model,
    models::role::Model,
    models::supplier::Model,
    models::tax::Model,
    models::user::Model,
);

/// Newest-first keyset pagination over `query`.
///
/// Fetches `limit + 1` rows so the presence of a following page is known
/// without a count query.
pub(crate) async fn paginate<E>(
    db: &DatabaseConnection,
    query: Select<E>,
    (created_at, id): (E::Column, E::Column),
    limit: u64,
    cursor: Option<CursorData>,
) -> Result<Page<E::Model>, RepositoryError>
where
    E: EntityTrait,
    E::Model: Keyed,
{
    let mut query = query.order_by_desc(created_at).order_by_desc(id);

    if let Some(cursor) = cursor {
        let at = cursor.created_at.fixed_offset();
        query = query.filter(
            Condition::any().add(created_at.lt(at)).add(
                Condition::all()
                    .add(created_at.eq(at))
                    .add(id.lt(cursor.id)),
            ),
        );
    }

    let mut rows = query
        .limit(limit + 1)
        .all(db)
        .await
        .map_err(RepositoryError::database_error)?;

    let next_cursor = if rows.len() as u64 > limit {
        rows.truncate(limit as usize);
        rows.last().map(|last| {
            let (created_at, id) = last.cursor_key();
            encode_cursor(&created_at, &id)
        })
    } else {
        None
    };

    Ok(Page {
        items: rows,
        next_cursor,
    })
}

/// Parses a `YYYY-MM-DD` field that the request layer has already checked.
pub(crate) fn parse_date(field: &str, value: Option<&str>) -> Result<NaiveDate, RepositoryError> {
    value
        .map(str::trim)
        .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
        .ok_or_else(|| RepositoryError::validation_error(format!("{field} must be a YYYY-MM-DD date")))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("issued_on", Some("2024-03-01")).is_ok());
        assert!(parse_date("issued_on", Some("01.03.2024")).is_err());
        assert!(parse_date("issued_on", None).is_err());
    }

    #[test]
    fn page_map_keeps_cursor() {
        let page = Page {
            items: vec![1, 2, 3],
            next_cursor: Some("abc".to_string()),
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
        assert_eq!(mapped.next_cursor.as_deref(), Some("abc"));
    }
}
