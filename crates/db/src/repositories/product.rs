use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use brewline_core::domain::product::{normalize_tags, Product, ProductId};
use brewline_core::errors::StoreError;
use brewline_core::suggestions::{CatalogQuery, ProductCatalog};

use super::{encode_timestamp, RepositoryError};
use crate::DbPool;

/// Catalog backed by the `product` and `product_tag` tables. Catalog order is
/// insertion order (`rowid`); re-saving a product keeps its position.
pub struct SqlProductCatalog {
    pool: DbPool,
}

impl SqlProductCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Upserts `product`. Tags are stored normalized so tag filters match the
    /// in-memory catalog.
    pub async fn save(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO product (id, name, description, category, category_key, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 category = excluded.category,
                 category_key = excluded.category_key",
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.normalized_category())
        .bind(encode_timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM product_tag WHERE product_id = ?")
            .bind(product.id.as_str())
            .execute(&mut *tx)
            .await?;

        for tag in normalize_tags(&product.tags) {
            sqlx::query("INSERT INTO product_tag (product_id, tag) VALUES (?, ?)")
                .bind(product.id.as_str())
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, description, category FROM product ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        self.with_tags(rows).await
    }

    async fn select_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        // SQLite accepts an empty `IN ()` list, so an empty lookup still hits the pool.
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, description, category FROM product WHERE id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(") ORDER BY rowid");

        let rows = builder.build().fetch_all(&self.pool).await?;
        self.with_tags(rows).await
    }

    async fn select_matching(
        &self,
        query: &CatalogQuery,
        limit: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT p.id, p.name, p.description, p.category FROM product p WHERE 1 = 1",
        );

        if !query.exclude.is_empty() {
            builder.push(" AND p.id NOT IN (");
            let mut separated = builder.separated(", ");
            for id in &query.exclude {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");
        }

        builder.push(" AND (0 = 1");
        if !query.categories.is_empty() {
            builder.push(" OR p.category_key IN (");
            let mut separated = builder.separated(", ");
            for category in &query.categories {
                separated.push_bind(category.as_str());
            }
            separated.push_unseparated(")");
        }
        if !query.tags.is_empty() {
            builder.push(
                " OR EXISTS (SELECT 1 FROM product_tag t WHERE t.product_id = p.id AND t.tag IN (",
            );
            let mut separated = builder.separated(", ");
            for tag in &query.tags {
                separated.push_bind(tag.as_str());
            }
            separated.push_unseparated("))");
        }
        for term in &query.text_terms {
            builder
                .push(" OR instr(lower(p.name), ")
                .push_bind(term.as_str())
                .push(") > 0 OR instr(lower(p.description), ")
                .push_bind(term.as_str())
                .push(") > 0");
        }
        builder.push(") ORDER BY p.rowid LIMIT ").push_bind(limit as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;
        self.with_tags(rows).await
    }

    async fn with_tags(&self, rows: Vec<SqliteRow>) -> Result<Vec<Product>, RepositoryError> {
        let mut products = rows.iter().map(product_from_row).collect::<Result<Vec<_>, _>>()?;
        if products.is_empty() {
            return Ok(products);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT product_id, tag FROM product_tag WHERE product_id IN (",
        );
        let mut separated = builder.separated(", ");
        for product in &products {
            separated.push_bind(product.id.0.clone());
        }
        separated.push_unseparated(")");

        let mut tags: HashMap<String, BTreeSet<String>> = HashMap::new();
        for row in builder.build().fetch_all(&self.pool).await? {
            let product_id: String = row.try_get("product_id")?;
            let tag: String = row.try_get("tag")?;
            tags.entry(product_id).or_default().insert(tag);
        }

        for product in &mut products {
            if let Some(product_tags) = tags.remove(product.id.as_str()) {
                product.tags = product_tags;
            }
        }
        Ok(products)
    }
}

#[async_trait::async_trait]
impl ProductCatalog for SqlProductCatalog {
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        Ok(self.select_by_ids(ids).await?)
    }

    async fn find_matching(
        &self,
        query: &CatalogQuery,
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        if !query.has_criteria() || limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self.select_matching(query, limit).await?)
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        tags: BTreeSet::new(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use brewline_core::domain::product::{Product, ProductId};
    use brewline_core::errors::StoreError;
    use brewline_core::suggestions::{CatalogQuery, ProductCatalog};

    use super::SqlProductCatalog;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlProductCatalog {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlProductCatalog::new(pool)
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|product| product.id.as_str()).collect()
    }

    async fn seed(catalog: &SqlProductCatalog) {
        let products = [
            Product::new("latte", "Caffe Latte", "Coffee").with_tags(["Milk", "hot"]),
            Product::new("croissant", "Butter Croissant", "Pastry")
                .with_description("Flaky, baked every morning")
                .with_tags(["baked"]),
            Product::new("cold-brew", "Cold Brew", " coffee ").with_tags(["iced"]),
            Product::new("matcha", "Matcha Latte", "Tea").with_tags(["milk"]),
        ];
        for product in &products {
            catalog.save(product).await.expect("save product");
        }
    }

    #[tokio::test]
    async fn find_by_ids_returns_catalog_order_and_skips_unknown_ids() {
        let catalog = setup().await;
        seed(&catalog).await;

        let found = catalog
            .find_by_ids(&[
                ProductId("matcha".to_string()),
                ProductId("ghost".to_string()),
                ProductId("latte".to_string()),
            ])
            .await
            .expect("find by ids");

        assert_eq!(ids(&found), vec!["latte", "matcha"]);
        assert!(found[0].tags.contains("milk"));
    }

    #[tokio::test]
    async fn resaving_a_product_keeps_its_position_and_replaces_tags() {
        let catalog = setup().await;
        seed(&catalog).await;

        catalog
            .save(&Product::new("latte", "Oat Latte", "Coffee").with_tags(["oat"]))
            .await
            .expect("resave");

        let all = catalog.list_all().await.expect("list");
        assert_eq!(ids(&all), vec!["latte", "croissant", "cold-brew", "matcha"]);
        assert_eq!(all[0].name, "Oat Latte");
        assert_eq!(all[0].tags.iter().map(String::as_str).collect::<Vec<_>>(), vec!["oat"]);
    }

    #[tokio::test]
    async fn find_matching_applies_category_tag_and_text_criteria() {
        let catalog = setup().await;
        seed(&catalog).await;

        let by_category = catalog
            .find_matching(&CatalogQuery::new().in_categories(["COFFEE"]), 3)
            .await
            .expect("by category");
        assert_eq!(ids(&by_category), vec!["latte", "cold-brew"]);

        let by_tag = catalog
            .find_matching(
                &CatalogQuery::new()
                    .with_any_tag(["milk"])
                    .excluding([ProductId("latte".to_string())]),
                3,
            )
            .await
            .expect("by tag");
        assert_eq!(ids(&by_tag), vec!["matcha"]);

        let by_text = catalog
            .find_matching(&CatalogQuery::new().containing_any(["  MORNING "]), 3)
            .await
            .expect("by text");
        assert_eq!(ids(&by_text), vec!["croissant"]);
    }

    #[tokio::test]
    async fn find_matching_honours_limit_and_empty_query() {
        let catalog = setup().await;
        seed(&catalog).await;

        let limited = catalog
            .find_matching(&CatalogQuery::new().containing_any(["a"]), 2)
            .await
            .expect("limited");
        assert_eq!(ids(&limited), vec!["latte", "croissant"]);

        let empty = catalog.find_matching(&CatalogQuery::new(), 3).await.expect("empty query");
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn tags_set_directly_on_the_struct_are_stored_normalized() {
        let catalog = setup().await;
        let product = Product {
            id: ProductId("flat-white".to_string()),
            name: "Flat White".to_string(),
            description: String::new(),
            category: "Coffee".to_string(),
            tags: BTreeSet::from(["Milk".to_string(), " HOT ".to_string(), "  ".to_string()]),
        };
        catalog.save(&product).await.expect("save product");

        let by_tag = catalog
            .find_matching(&CatalogQuery::new().with_any_tag(["milk"]), 3)
            .await
            .expect("by tag");
        assert_eq!(ids(&by_tag), vec!["flat-white"]);
        let stored = by_tag[0].tags.iter().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(stored, vec!["hot", "milk"]);
    }

    #[tokio::test]
    async fn empty_id_lookup_still_reports_a_closed_pool() {
        let catalog = setup().await;
        assert!(catalog.find_by_ids(&[]).await.expect("empty lookup").is_empty());

        catalog.pool.close().await;
        let error = catalog.find_by_ids(&[]).await.expect_err("closed pool");

        assert!(matches!(error, StoreError::Unavailable(_)), "{error:?}");
    }
}
