use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use teleassist_core::errors::StoreError;

pub mod account;
pub mod credentials;
pub mod customer;
pub mod memory;

pub use customer::SqlCustomerStore;
pub use memory::InMemoryCustomerStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Unavailable(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn parse_decimal(name: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| RepositoryError::Decode(format!("{name}: invalid decimal `{raw}`: {e}")))
}

pub(crate) fn parse_date(name: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("{name}: invalid date `{raw}`: {e}")))
}

/// Accepts both `YYYY-MM-DD HH:MM:SS` (SQLite `datetime()`) and RFC 3339 timestamps.
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| chrono::DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.naive_utc()))
}

/// Emails are matched trimmed and case-insensitively everywhere in the store.
pub(crate) fn normalized_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use teleassist_core::errors::StoreError;

    use super::{parse_date, parse_decimal, parse_timestamp, RepositoryError};

    #[test]
    fn decimal_text_columns_parse_exactly() {
        assert_eq!(parse_decimal("total", "80.99").expect("decimal"), Decimal::new(8099, 2));
        assert!(matches!(parse_decimal("total", "eighty"), Err(RepositoryError::Decode(_))));
    }

    #[test]
    fn dates_and_timestamps_parse() {
        assert_eq!(parse_date("d", "2025-11-01").expect("date").to_string(), "2025-11-01");
        assert!(parse_date("d", "11/01/2025").is_err());
        assert!(parse_timestamp("2025-11-18 08:30:00").is_some());
        assert!(parse_timestamp("2025-11-18T08:30:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn repository_errors_map_to_store_errors() {
        let error = StoreError::from(RepositoryError::Decode("bad row".into()));
        assert_eq!(error, StoreError::Decode("bad row".into()));
    }
}
