use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::normalize_term;
use crate::domain::product::{normalize_tags, ProductId};
use crate::domain::user::UserId;
use crate::errors::DomainError;

/// Search history entries expire this many days after they are recorded.
pub const SEARCH_HISTORY_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchHistoryId(pub String);

/// One tracked storefront search. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub id: SearchHistoryId,
    pub user_id: UserId,
    pub query: String,
    pub tags: BTreeSet<String>,
    pub product_id: Option<ProductId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SearchHistoryEntry {
    /// Validates and normalizes a tracked search. The user must be present and
    /// the query must contain something other than whitespace.
    pub fn new(
        user_id: Option<&UserId>,
        query: &str,
        tags: &[String],
        product_id: Option<ProductId>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let user_id =
            user_id.filter(|user| !user.as_str().trim().is_empty()).ok_or_else(|| {
                DomainError::Validation("a user id is required to track searches".to_string())
            })?;

        let query = normalize_term(query);
        if query.is_empty() {
            return Err(DomainError::Validation("search query is required".to_string()));
        }

        let product_id = product_id.filter(|id| !id.as_str().trim().is_empty());

        Ok(Self {
            id: SearchHistoryId(Uuid::new_v4().to_string()),
            user_id: user_id.clone(),
            query,
            tags: normalize_tags(tags),
            product_id,
            created_at: now,
            expires_at: now + Duration::days(SEARCH_HISTORY_TTL_DAYS),
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
