use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use brewline_core::domain::order::Order;
use brewline_core::domain::policy::SuggestionPolicy;
use brewline_core::domain::product::{Product, ProductId};
use brewline_core::domain::search::SearchHistoryEntry;
use brewline_core::domain::user::UserId;
use brewline_core::errors::StoreError;
use brewline_core::suggestions::{
    CatalogQuery, OrderHistory, ProductCatalog, SearchHistoryLog, SuggestionPolicyStore,
};

/// Catalog kept in insertion order. Saving an existing id replaces it in place.
#[derive(Default)]
pub struct InMemoryProductCatalog {
    products: RwLock<Vec<Product>>,
}

impl InMemoryProductCatalog {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self { products: RwLock::new(products) }
    }

    pub async fn save(&self, product: Product) {
        let mut products = self.products.write().await;
        match products.iter_mut().find(|existing| existing.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }
}

#[async_trait::async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|product| ids.contains(&product.id)).cloned().collect())
    }

    async fn find_matching(
        &self,
        query: &CatalogQuery,
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        if !query.has_criteria() {
            return Ok(Vec::new());
        }
        let products = self.products.read().await;
        Ok(products.iter().filter(|product| query.matches(product)).take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryOrderHistory {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderHistory {
    pub async fn save(&self, order: Order) {
        let mut orders = self.orders.write().await;
        orders.retain(|existing| existing.id != order.id);
        orders.push(order);
    }
}

#[async_trait::async_trait]
impl OrderHistory for InMemoryOrderHistory {
    async fn recent_orders(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut matching = orders
            .iter()
            .enumerate()
            .filter(|(_, order)| &order.user_id == user_id)
            .collect::<Vec<_>>();
        // Newest first; insertion order breaks ties.
        matching.sort_by(|(left_index, left), (right_index, right)| {
            right.created_at.cmp(&left.created_at).then(right_index.cmp(left_index))
        });
        Ok(matching.into_iter().take(limit).map(|(_, order)| order.clone()).collect())
    }
}

#[derive(Default)]
pub struct InMemorySearchHistoryLog {
    entries: RwLock<Vec<SearchHistoryEntry>>,
}

impl InMemorySearchHistoryLog {
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> u64 {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| !entry.is_expired(now));
        (before - entries.len()) as u64
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait::async_trait]
impl SearchHistoryLog for InMemorySearchHistoryLog {
    async fn append(&self, entry: SearchHistoryEntry) -> Result<(), StoreError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn recent_searches(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<SearchHistoryEntry>, StoreError> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        let mut matching = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| &entry.user_id == user_id && !entry.is_expired(now))
            .collect::<Vec<_>>();
        matching.sort_by(|(left_index, left), (right_index, right)| {
            right.created_at.cmp(&left.created_at).then(right_index.cmp(left_index))
        });
        Ok(matching.into_iter().take(limit).map(|(_, entry)| entry.clone()).collect())
    }
}

/// Policy held behind a lock; `None` until the first load creates the default.
#[derive(Default)]
pub struct InMemorySuggestionPolicyStore {
    policy: RwLock<Option<SuggestionPolicy>>,
}

impl InMemorySuggestionPolicyStore {
    pub fn with_policy(policy: SuggestionPolicy) -> Self {
        Self { policy: RwLock::new(Some(policy)) }
    }
}

#[async_trait::async_trait]
impl SuggestionPolicyStore for InMemorySuggestionPolicyStore {
    async fn load_or_init(&self) -> Result<SuggestionPolicy, StoreError> {
        let mut policy = self.policy.write().await;
        Ok(policy.get_or_insert_with(SuggestionPolicy::default).clone())
    }

    async fn save(&self, policy: &SuggestionPolicy) -> Result<(), StoreError> {
        *self.policy.write().await = Some(policy.clone());
        Ok(())
    }
}
