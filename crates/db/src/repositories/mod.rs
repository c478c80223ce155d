use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use brewline_core::errors::StoreError;

pub mod memory;
pub mod order;
pub mod product;
pub mod search_history;
pub mod suggestion_policy;

pub use memory::{
    InMemoryOrderHistory, InMemoryProductCatalog, InMemorySearchHistoryLog,
    InMemorySuggestionPolicyStore,
};
pub use order::SqlOrderHistory;
pub use product::SqlProductCatalog;
pub use search_history::SqlSearchHistoryLog;
pub use suggestion_policy::SqlSuggestionPolicyStore;

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

/// Fixed-width UTC form so stored timestamps compare correctly as text.
pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{encode_timestamp, parse_rfc3339, RepositoryError};
    use brewline_core::errors::StoreError;

    #[test]
    fn encoded_timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2026, 3, 9, 8, 0, 0).single().expect("timestamp");
        let later = earlier + chrono::Duration::milliseconds(1500);

        let earlier_text = encode_timestamp(earlier);
        let later_text = encode_timestamp(later);

        assert_eq!(earlier_text, "2026-03-09T08:00:00.000000Z");
        assert!(earlier_text < later_text);
        assert_eq!(parse_rfc3339("created_at", &later_text).expect("parse"), later);
    }

    #[test]
    fn malformed_timestamp_is_a_decode_error() {
        let error = parse_rfc3339("expires_at", "yesterday").expect_err("must fail");
        assert!(
            matches!(error, RepositoryError::Decode(ref message) if message.contains("expires_at"))
        );
    }

    #[test]
    fn repository_errors_map_to_store_errors() {
        let store = StoreError::from(RepositoryError::Decode("bad tags".to_string()));
        assert_eq!(store, StoreError::Decode("bad tags".to_string()));

        let store = StoreError::from(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        assert!(matches!(store, StoreError::Unavailable(_)));
    }
}
