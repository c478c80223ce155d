//! Storefront product suggestions.
//!
//! [`SuggestionResolver`] is the read path: it applies the admin policy,
//! runs the configured automatic strategy and fills the result up from the
//! curated defaults. [`AdminOverrideService`] edits that policy and
//! [`SearchTracker`] feeds the search-history strategy.

mod admin;
mod query;
mod resolver;
mod store;
mod strategy;
mod tracking;

use std::time::Duration;

pub use admin::{AdminOverrideService, DefaultsView, UserOverrideView};
pub use query::CatalogQuery;
pub use resolver::{SuggestionOutcome, SuggestionResolver};
pub use store::{
    resolve_in_order, OrderHistory, ProductCatalog, SearchHistoryLog, SuggestionPolicyStore,
    SuggestionStores,
};
pub use strategy::{
    hybrid_candidates, merge_distinct, order_history_candidates, related_candidates,
    search_history_candidates, ORDER_HISTORY_WINDOW, SEARCH_HISTORY_WINDOW,
};
pub use tracking::SearchTracker;

/// Upper bound on the number of products returned to a viewer.
pub const MAX_SUGGESTIONS: usize = 3;

/// Per-strategy deadline used when none is configured.
pub const DEFAULT_STRATEGY_TIMEOUT: Duration = Duration::from_millis(750);
