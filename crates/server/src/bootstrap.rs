use brewline_core::config::{AppConfig, ConfigError};
use brewline_core::suggestions::SuggestionStores;
use brewline_core::StoreError;
use brewline_db::{connect_with_config, migrations, sql_stores, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub stores: SuggestionStores,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("suggestion policy could not be initialized: {0}")]
    Policy(#[source] StoreError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let stores = sql_stores(&db_pool);
    let policy = stores.policy.load_or_init().await.map_err(BootstrapError::Policy)?;
    info!(
        event_name = "system.bootstrap.policy_ready",
        correlation_id = "bootstrap",
        auto_enabled = policy.auto_enabled,
        auto_strategy = %policy.auto_strategy,
        default_count = policy.default_suggestions.len(),
        override_count = policy.user_overrides.len(),
        "suggestion policy loaded"
    );

    Ok(Application { config, db_pool, stores })
}

#[cfg(test)]
mod tests {
    use brewline_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use brewline_core::{AutoStrategy, SuggestionResolver};

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        let config = AppConfig::load(options)?;
        bootstrap_with_config(config).await
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_strategy_timeout() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                strategy_timeout_ms: Some(0),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let error = result.err().expect("bootstrap should reject the config");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("strategy_timeout_ms"));
    }

    #[tokio::test]
    async fn bootstrap_prepares_schema_and_policy() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
             AND name IN ('product', 'search_history', 'suggestion_policy', 'default_suggestion')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables");
        assert_eq!(table_count, 4);

        let policy_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suggestion_policy")
            .fetch_one(&app.db_pool)
            .await
            .expect("policy rows");
        assert_eq!(policy_rows, 1, "bootstrap initializes the policy singleton");

        let policy = app.stores.policy.load_or_init().await.expect("policy");
        assert_eq!(policy.auto_strategy, AutoStrategy::Hybrid);

        let outcome = SuggestionResolver::new(app.stores.clone())
            .with_strategy_timeout(app.config.suggestions.strategy_timeout())
            .get_suggestions(None)
            .await
            .expect("resolve on empty store");
        assert!(outcome.suggestions.is_empty());

        app.db_pool.close().await;
    }
}
