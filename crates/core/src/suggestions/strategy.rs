//! Candidate strategies. Each one reads a single signal source for a user and
//! returns at most [`MAX_SUGGESTIONS`] products in catalog order.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::policy::AutoStrategy;
use crate::domain::product::{Product, ProductId};
use crate::domain::user::UserId;
use crate::errors::StoreError;
use crate::suggestions::query::CatalogQuery;
use crate::suggestions::store::SuggestionStores;
use crate::suggestions::MAX_SUGGESTIONS;

/// Orders considered by the order-history strategy.
pub const ORDER_HISTORY_WINDOW: usize = 5;

/// Searches considered by the search-history strategy.
pub const SEARCH_HISTORY_WINDOW: usize = 10;

impl AutoStrategy {
    /// Runs the strategy for `user`. Store failures and timeouts degrade to
    /// an empty list and are only logged.
    pub async fn run(
        self,
        stores: &SuggestionStores,
        user_id: &UserId,
        timeout: Duration,
    ) -> Vec<Product> {
        match self {
            Self::OrderHistory => {
                isolated(self, user_id, timeout, order_history_candidates(stores, user_id)).await
            }
            Self::SearchHistory => {
                isolated(self, user_id, timeout, search_history_candidates(stores, user_id)).await
            }
            Self::Related => {
                isolated(self, user_id, timeout, related_candidates(stores, user_id)).await
            }
            Self::Hybrid => hybrid_candidates(stores, user_id, timeout).await,
        }
    }
}

/// Products sharing a category or tag with anything the user bought in their
/// last [`ORDER_HISTORY_WINDOW`] orders, excluding what they already bought.
pub async fn order_history_candidates(
    stores: &SuggestionStores,
    user_id: &UserId,
) -> Result<Vec<Product>, StoreError> {
    let orders = stores.orders.recent_orders(user_id, ORDER_HISTORY_WINDOW).await?;

    let mut purchased: Vec<ProductId> = Vec::new();
    for order in &orders {
        for id in order.menu_product_ids() {
            if !purchased.contains(&id) {
                purchased.push(id);
            }
        }
    }
    if purchased.is_empty() {
        return Ok(Vec::new());
    }

    let purchased_products = stores.catalog.find_by_ids(&purchased).await?;
    let query = CatalogQuery::new()
        .excluding(purchased)
        .in_categories(purchased_products.iter().map(|product| product.category.as_str()))
        .with_any_tag(purchased_products.iter().flat_map(|product| product.tags.iter()));

    find_candidates(stores, &query).await
}

/// Products tagged like, or named like, the user's last
/// [`SEARCH_HISTORY_WINDOW`] searches.
pub async fn search_history_candidates(
    stores: &SuggestionStores,
    user_id: &UserId,
) -> Result<Vec<Product>, StoreError> {
    let searches = stores.searches.recent_searches(user_id, SEARCH_HISTORY_WINDOW).await?;
    if searches.is_empty() {
        return Ok(Vec::new());
    }

    let query = CatalogQuery::new()
        .with_any_tag(searches.iter().flat_map(|entry| entry.tags.iter()))
        .containing_any(searches.iter().map(|entry| entry.query.as_str()));

    find_candidates(stores, &query).await
}

/// Other products from the categories of the user's most recent order.
pub async fn related_candidates(
    stores: &SuggestionStores,
    user_id: &UserId,
) -> Result<Vec<Product>, StoreError> {
    let orders = stores.orders.recent_orders(user_id, 1).await?;
    let Some(latest) = orders.first() else {
        return Ok(Vec::new());
    };

    let purchased = latest.menu_product_ids();
    if purchased.is_empty() {
        return Ok(Vec::new());
    }

    let purchased_products = stores.catalog.find_by_ids(&purchased).await?;
    let query = CatalogQuery::new()
        .excluding(purchased)
        .in_categories(purchased_products.iter().map(|product| product.category.as_str()));

    find_candidates(stores, &query).await
}

/// Runs the three single-source strategies concurrently and fuses them in
/// the fixed precedence order-history, search-history, related.
pub async fn hybrid_candidates(
    stores: &SuggestionStores,
    user_id: &UserId,
    timeout: Duration,
) -> Vec<Product> {
    let (by_orders, by_searches, related) = tokio::join!(
        isolated(
            AutoStrategy::OrderHistory,
            user_id,
            timeout,
            order_history_candidates(stores, user_id)
        ),
        isolated(
            AutoStrategy::SearchHistory,
            user_id,
            timeout,
            search_history_candidates(stores, user_id)
        ),
        isolated(AutoStrategy::Related, user_id, timeout, related_candidates(stores, user_id)),
    );

    debug!(
        event_name = "suggestions.strategy.hybrid_sources",
        user_id = %user_id,
        order_history = by_orders.len(),
        search_history = by_searches.len(),
        related = related.len(),
        "hybrid sources collected"
    );

    merge_distinct([by_orders, by_searches, related], MAX_SUGGESTIONS)
}

/// Concatenates `lists` in order, keeps the first occurrence of each product
/// id and stops at `limit`.
pub fn merge_distinct<I>(lists: I, limit: usize) -> Vec<Product>
where
    I: IntoIterator<Item = Vec<Product>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(limit);

    for product in lists.into_iter().flatten() {
        if merged.len() >= limit {
            break;
        }
        if seen.insert(product.id.clone()) {
            merged.push(product);
        }
    }

    merged
}

async fn find_candidates(
    stores: &SuggestionStores,
    query: &CatalogQuery,
) -> Result<Vec<Product>, StoreError> {
    if !query.has_criteria() {
        return Ok(Vec::new());
    }
    stores.catalog.find_matching(query, MAX_SUGGESTIONS).await
}

async fn isolated<F>(
    strategy: AutoStrategy,
    user_id: &UserId,
    timeout: Duration,
    work: F,
) -> Vec<Product>
where
    F: Future<Output = Result<Vec<Product>, StoreError>>,
{
    match tokio::time::timeout(timeout, work).await {
        Ok(Ok(mut products)) => {
            products.truncate(MAX_SUGGESTIONS);
            products
        }
        Ok(Err(error)) => {
            warn!(
                event_name = "suggestions.strategy.failed",
                strategy = %strategy,
                user_id = %user_id,
                error = %error,
                "strategy failed, continuing without its candidates"
            );
            Vec::new()
        }
        Err(_) => {
            warn!(
                event_name = "suggestions.strategy.timed_out",
                strategy = %strategy,
                user_id = %user_id,
                timeout_ms = timeout.as_millis() as u64,
                "strategy timed out, continuing without its candidates"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::merge_distinct;
    use crate::domain::product::Product;

    fn product(id: &str) -> Product {
        Product::new(id, id, "Coffee")
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|product| product.id.as_str()).collect()
    }

    #[test]
    fn merge_keeps_first_occurrence_position() {
        let merged = merge_distinct(
            [vec![product("x"), product("y")], vec![product("y"), product("z")], vec![]],
            3,
        );

        assert_eq!(ids(&merged), vec!["x", "y", "z"]);
    }

    #[test]
    fn merge_truncates_to_limit() {
        let merged = merge_distinct(
            [vec![product("a"), product("b")], vec![product("c"), product("d")]],
            3,
        );

        assert_eq!(ids(&merged), vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_of_empty_sources_is_empty() {
        let merged = merge_distinct([Vec::new(), Vec::new(), Vec::new()], 3);
        assert!(merged.is_empty());
    }
}
