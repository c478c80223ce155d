use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Seeded catalog rows: id and normalized category, in catalog order.
const SEED_PRODUCTS: &[(&str, &str)] = &[
    ("espresso", "coffee"),
    ("cappuccino", "coffee"),
    ("flat-white", "coffee"),
    ("cold-brew", "coffee"),
    ("matcha-latte", "tea"),
    ("chai-latte", "tea"),
    ("croissant", "pastry"),
    ("almond-croissant", "pastry"),
    ("banana-bread", "pastry"),
    ("avocado-toast", "food"),
];

const SEED_ORDERS: &[SeedOrderContract] = &[
    SeedOrderContract { order_id: "order-1001", user_id: "user-ana", line_count: 2 },
    SeedOrderContract { order_id: "order-1002", user_id: "user-ana", line_count: 2 },
    SeedOrderContract { order_id: "order-1003", user_id: "user-ben", line_count: 2 },
];

const SEED_DEFAULTS: &[&str] = &["croissant", "cold-brew", "chai-latte"];

/// Demo café dataset: a small menu, two customers with order history and
/// three curated default suggestions.
pub struct CatalogSeedDataset;

impl CatalogSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/catalog_seed.sql");

    /// Applies the seed. Rows that already exist are left untouched, and the
    /// defaults are only written when none are configured.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            products_seeded: SEED_PRODUCTS.len(),
            orders_seeded: SEED_ORDERS.len(),
            default_product_ids: SEED_DEFAULTS.to_vec(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let catalog: Vec<(String, String)> =
            sqlx::query_as("SELECT id, category_key FROM product ORDER BY rowid")
                .fetch_all(pool)
                .await?;
        let seeded_in_order = catalog
            .iter()
            .filter(|(id, _)| SEED_PRODUCTS.iter().any(|(seed_id, _)| seed_id == id))
            .map(|(id, category)| (id.as_str(), category.as_str()))
            .collect::<Vec<_>>();
        checks.push(("catalog-products", seeded_in_order == SEED_PRODUCTS));

        for order in SEED_ORDERS {
            let order_exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customer_order WHERE id = ?1 AND user_id = ?2)",
            )
            .bind(order.order_id)
            .bind(order.user_id)
            .fetch_one(pool)
            .await?;
            checks.push((order.order_id, order_exists == 1));

            let line_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM order_item WHERE order_id = ?1")
                    .bind(order.order_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((order.line_count_label(), line_count == order.line_count));
        }

        let policy_rows: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM suggestion_policy")
            .fetch_one(pool)
            .await?;
        checks.push(("suggestion-policy", policy_rows == 1));

        let defaults: Vec<String> = sqlx::query_scalar(
            "SELECT product_id FROM default_suggestion WHERE policy_id = 1 ORDER BY display_order",
        )
        .fetch_all(pool)
        .await?;
        checks.push(("default-suggestions", string_list_matches(&defaults, SEED_DEFAULTS)));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded orders and products. The policy is reset to an
    /// empty default list.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_orders =
            sql_array_from_ids(&SEED_ORDERS.iter().map(|order| order.order_id).collect::<Vec<_>>());
        let quoted_products =
            sql_array_from_ids(&SEED_PRODUCTS.iter().map(|(id, _)| *id).collect::<Vec<_>>());

        sqlx::query(&format!("DELETE FROM customer_order WHERE id IN {quoted_orders}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM product WHERE id IN {quoted_products}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM default_suggestion WHERE policy_id = 1").execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedOrderContract {
    order_id: &'static str,
    user_id: &'static str,
    line_count: i64,
}

impl SeedOrderContract {
    fn line_count_label(&self) -> &'static str {
        match self.order_id {
            "order-1001" => "order-1001-line-count",
            "order-1002" => "order-1002-line-count",
            _ => "order-1003-line-count",
        }
    }
}

fn string_list_matches(actual: &[String], expected: &[&str]) -> bool {
    actual.len() == expected.len() && actual.iter().zip(expected).all(|(a, b)| a == b)
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub orders_seeded: usize,
    pub default_product_ids: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
