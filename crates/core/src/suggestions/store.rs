//! Storage ports consumed by the suggestion engine.
//!
//! `brewline-db` provides SQLite and in-memory implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::domain::policy::SuggestionPolicy;
use crate::domain::product::{Product, ProductId};
use crate::domain::search::SearchHistoryEntry;
use crate::domain::user::UserId;
use crate::errors::StoreError;
use crate::suggestions::query::CatalogQuery;

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Products with the given ids, in catalog order. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;

    /// First `limit` products matching `query`, in catalog order.
    async fn find_matching(
        &self,
        query: &CatalogQuery,
        limit: usize,
    ) -> Result<Vec<Product>, StoreError>;
}

#[async_trait]
pub trait OrderHistory: Send + Sync {
    /// Most recent orders for the user, newest first.
    async fn recent_orders(&self, user_id: &UserId, limit: usize)
        -> Result<Vec<Order>, StoreError>;
}

#[async_trait]
pub trait SearchHistoryLog: Send + Sync {
    async fn append(&self, entry: SearchHistoryEntry) -> Result<(), StoreError>;

    /// Most recent unexpired searches for the user, newest first.
    async fn recent_searches(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<SearchHistoryEntry>, StoreError>;
}

#[async_trait]
pub trait SuggestionPolicyStore: Send + Sync {
    /// Returns the policy, creating the default record on first use.
    async fn load_or_init(&self) -> Result<SuggestionPolicy, StoreError>;

    /// Replaces the stored policy. Concurrent writers race; the last save wins.
    async fn save(&self, policy: &SuggestionPolicy) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct SuggestionStores {
    pub catalog: Arc<dyn ProductCatalog>,
    pub orders: Arc<dyn OrderHistory>,
    pub searches: Arc<dyn SearchHistoryLog>,
    pub policy: Arc<dyn SuggestionPolicyStore>,
}

/// Resolves ids to products keeping the order of `ids`. Dangling ids are
/// dropped and repeated ids keep their first position.
///
/// The catalog is consulted even for an empty list, so an unreachable
/// catalog is reported rather than read as "no products".
pub async fn resolve_in_order(
    catalog: &dyn ProductCatalog,
    ids: &[ProductId],
) -> Result<Vec<Product>, StoreError> {
    let mut found = catalog
        .find_by_ids(ids)
        .await?
        .into_iter()
        .map(|product| (product.id.clone(), product))
        .collect::<HashMap<_, _>>();

    Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
}
