use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use brewline_core::domain::policy::{
    AutoStrategy, DefaultSuggestion, OverrideType, SuggestionPolicy, UserOverride,
};
use brewline_core::domain::product::ProductId;
use brewline_core::domain::user::UserId;
use brewline_core::errors::StoreError;
use brewline_core::suggestions::SuggestionPolicyStore;

use super::{encode_timestamp, parse_rfc3339, RepositoryError};
use crate::DbPool;

const POLICY_ID: i64 = 1;

/// Singleton policy spread over `suggestion_policy`, `default_suggestion`
/// and `user_suggestion_override`. `save` rewrites all three in one
/// transaction.
pub struct SqlSuggestionPolicyStore {
    pool: DbPool,
}

impl SqlSuggestionPolicyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self) -> Result<SuggestionPolicy, RepositoryError> {
        sqlx::query("INSERT INTO suggestion_policy (id) VALUES (?) ON CONFLICT(id) DO NOTHING")
            .bind(POLICY_ID)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query(
            "SELECT auto_enabled, auto_strategy, updated_at FROM suggestion_policy WHERE id = ?",
        )
        .bind(POLICY_ID)
        .fetch_one(&self.pool)
        .await?;

        let auto_strategy: String = row.try_get("auto_strategy")?;
        let updated_at: Option<String> = row.try_get("updated_at")?;

        let default_suggestions = sqlx::query(
            "SELECT product_id, display_order
             FROM default_suggestion
             WHERE policy_id = ?
             ORDER BY display_order",
        )
        .bind(POLICY_ID)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(default_suggestion_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let user_overrides = sqlx::query(
            "SELECT user_id, product_ids_json, override_type, assigned_at
             FROM user_suggestion_override
             WHERE policy_id = ?
             ORDER BY position",
        )
        .bind(POLICY_ID)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(user_override_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(SuggestionPolicy {
            default_suggestions,
            user_overrides,
            auto_enabled: row.try_get::<i64, _>("auto_enabled")? != 0,
            auto_strategy: AutoStrategy::from_str(&auto_strategy)
                .map_err(|err| RepositoryError::Decode(err.to_string()))?,
            updated_at: updated_at
                .as_deref()
                .map(|value| parse_rfc3339("updated_at", value))
                .transpose()?,
        })
    }

    async fn store(&self, policy: &SuggestionPolicy) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO suggestion_policy (id, auto_enabled, auto_strategy, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 auto_enabled = excluded.auto_enabled,
                 auto_strategy = excluded.auto_strategy,
                 updated_at = excluded.updated_at",
        )
        .bind(POLICY_ID)
        .bind(policy.auto_enabled)
        .bind(policy.auto_strategy.as_str())
        .bind(policy.updated_at.map(encode_timestamp))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM default_suggestion WHERE policy_id = ?")
            .bind(POLICY_ID)
            .execute(&mut *tx)
            .await?;
        for entry in &policy.default_suggestions {
            sqlx::query(
                "INSERT INTO default_suggestion (policy_id, product_id, display_order)
                 VALUES (?, ?, ?)",
            )
            .bind(POLICY_ID)
            .bind(entry.product_id.as_str())
            .bind(i64::from(entry.display_order))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM user_suggestion_override WHERE policy_id = ?")
            .bind(POLICY_ID)
            .execute(&mut *tx)
            .await?;
        for (position, entry) in policy.user_overrides.iter().enumerate() {
            let product_ids_json = serde_json::to_string(&entry.product_ids).map_err(|err| {
                RepositoryError::Decode(format!("could not encode override product ids: {err}"))
            })?;
            sqlx::query(
                "INSERT INTO user_suggestion_override
                    (policy_id, user_id, product_ids_json, override_type, assigned_at, position)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(POLICY_ID)
            .bind(entry.user_id.as_str())
            .bind(product_ids_json)
            .bind(entry.override_type.as_str())
            .bind(encode_timestamp(entry.assigned_at))
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SuggestionPolicyStore for SqlSuggestionPolicyStore {
    async fn load_or_init(&self) -> Result<SuggestionPolicy, StoreError> {
        Ok(self.load().await?)
    }

    async fn save(&self, policy: &SuggestionPolicy) -> Result<(), StoreError> {
        Ok(self.store(policy).await?)
    }
}

fn default_suggestion_from_row(row: &SqliteRow) -> Result<DefaultSuggestion, RepositoryError> {
    let display_order: i64 = row.try_get("display_order")?;
    Ok(DefaultSuggestion {
        product_id: ProductId(row.try_get("product_id")?),
        display_order: u32::try_from(display_order).map_err(|_| {
            RepositoryError::Decode(format!("invalid display order {display_order}"))
        })?,
    })
}

fn user_override_from_row(row: &SqliteRow) -> Result<UserOverride, RepositoryError> {
    let product_ids_json: String = row.try_get("product_ids_json")?;
    let override_type: String = row.try_get("override_type")?;
    let assigned_at: String = row.try_get("assigned_at")?;

    Ok(UserOverride {
        user_id: UserId(row.try_get("user_id")?),
        product_ids: serde_json::from_str(&product_ids_json).map_err(|err| {
            RepositoryError::Decode(format!(
                "invalid override product ids '{product_ids_json}': {err}"
            ))
        })?,
        override_type: OverrideType::from_str(&override_type)
            .map_err(|err| RepositoryError::Decode(err.to_string()))?,
        assigned_at: parse_rfc3339("assigned_at", &assigned_at)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use brewline_core::domain::policy::{
        AutoStrategy, OverrideType, SettingsUpdate, SuggestionPolicy,
    };
    use brewline_core::domain::product::ProductId;
    use brewline_core::domain::user::UserId;
    use brewline_core::suggestions::SuggestionPolicyStore;

    use super::SqlSuggestionPolicyStore;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlSuggestionPolicyStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlSuggestionPolicyStore::new(pool)
    }

    fn product_ids(ids: &[&str]) -> Vec<ProductId> {
        ids.iter().map(|id| ProductId((*id).to_string())).collect()
    }

    #[tokio::test]
    async fn first_load_creates_default_policy() {
        let store = setup().await;

        let policy = store.load_or_init().await.expect("load");
        assert_eq!(policy, SuggestionPolicy::default());

        let again = store.load_or_init().await.expect("load again");
        assert_eq!(again, policy);
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suggestion_policy")
            .fetch_one(&store.pool)
            .await
            .expect("count");
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn saved_policy_round_trips() {
        let store = setup().await;
        let now = Utc.with_ymd_and_hms(2026, 6, 2, 14, 30, 0).single().expect("timestamp");

        let mut policy = store.load_or_init().await.expect("load");
        policy.replace_defaults(&product_ids(&["latte", "scone", "mocha"]), now).expect("defaults");
        policy
            .assign_override(
                &UserId("ben".to_string()),
                &product_ids(&["tea", "scone", "latte"]),
                OverrideType::Manual,
                now,
            )
            .expect("override ben");
        policy
            .assign_override(
                &UserId("ana".to_string()),
                &product_ids(&["mocha", "latte", "tea"]),
                OverrideType::Auto,
                now,
            )
            .expect("override ana");
        policy.apply_settings(
            SettingsUpdate {
                auto_enabled: Some(false),
                auto_strategy: Some(AutoStrategy::Related),
            },
            now,
        );

        store.save(&policy).await.expect("save");
        let loaded = store.load_or_init().await.expect("reload");

        assert_eq!(loaded, policy);
    }

    #[tokio::test]
    async fn save_replaces_previous_lists() {
        let store = setup().await;
        let now = Utc::now();

        let mut policy = store.load_or_init().await.expect("load");
        policy.replace_defaults(&product_ids(&["a", "b", "c", "d"]), now).expect("first defaults");
        store.save(&policy).await.expect("first save");

        policy.replace_defaults(&product_ids(&["d", "c", "b"]), now).expect("second defaults");
        policy.clear_override(&UserId("nobody".to_string()), now);
        store.save(&policy).await.expect("second save");

        let loaded = store.load_or_init().await.expect("reload");
        assert_eq!(loaded.ordered_default_ids(), product_ids(&["d", "c", "b"]));
        assert!(loaded.user_overrides.is_empty());
    }
}
