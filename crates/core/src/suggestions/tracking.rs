use chrono::Utc;
use tracing::info;

use crate::domain::product::ProductId;
use crate::domain::search::SearchHistoryEntry;
use crate::domain::user::UserId;
use crate::errors::ApplicationError;
use crate::suggestions::store::SuggestionStores;

/// Appends storefront searches to the search history log.
#[derive(Clone)]
pub struct SearchTracker {
    stores: SuggestionStores,
}

impl SearchTracker {
    pub fn new(stores: SuggestionStores) -> Self {
        Self { stores }
    }

    /// Records one search for `user_id`. A missing user or blank query is a
    /// validation error and nothing is written.
    pub async fn record_search(
        &self,
        user_id: Option<&UserId>,
        query: &str,
        tags: &[String],
        product_id: Option<ProductId>,
    ) -> Result<SearchHistoryEntry, ApplicationError> {
        let entry = SearchHistoryEntry::new(user_id, query, tags, product_id, Utc::now())?;
        self.stores.searches.append(entry.clone()).await?;

        info!(
            event_name = "suggestions.search.recorded",
            user_id = %entry.user_id,
            tag_count = entry.tags.len(),
            has_product = entry.product_id.is_some(),
            "search recorded"
        );

        Ok(entry)
    }
}
