use std::sync::Arc;

use brewline_core::suggestions::SuggestionStores;

use crate::repositories::{
    SqlOrderHistory, SqlProductCatalog, SqlSearchHistoryLog, SqlSuggestionPolicyStore,
};
use crate::DbPool;

/// Wires every suggestion store to the same SQLite pool.
pub fn sql_stores(pool: &DbPool) -> SuggestionStores {
    SuggestionStores {
        catalog: Arc::new(SqlProductCatalog::new(pool.clone())),
        orders: Arc::new(SqlOrderHistory::new(pool.clone())),
        searches: Arc::new(SqlSearchHistoryLog::new(pool.clone())),
        policy: Arc::new(SqlSuggestionPolicyStore::new(pool.clone())),
    }
}

