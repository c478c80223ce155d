pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod stores;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{CatalogSeedDataset, SeedResult, VerificationResult};
pub use stores::sql_stores;
