use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use brewline_core::domain::order::{Order, OrderId, OrderItem, OrderItemType};
use brewline_core::domain::user::UserId;
use brewline_core::errors::StoreError;
use brewline_core::suggestions::OrderHistory;

use super::{encode_timestamp, parse_rfc3339, RepositoryError};
use crate::DbPool;

pub struct SqlOrderHistory {
    pool: DbPool,
}

impl SqlOrderHistory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces an order together with all of its lines.
    pub async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO customer_order (id, user_id, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 user_id = excluded.user_id,
                 created_at = excluded.created_at",
        )
        .bind(&order.id.0)
        .bind(order.user_id.as_str())
        .bind(encode_timestamp(order.created_at))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM order_item WHERE order_id = ?")
            .bind(&order.id.0)
            .execute(&mut *tx)
            .await?;

        for (line_no, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_item (order_id, line_no, item_type, item_id, quantity, price)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&order.id.0)
            .bind(line_no as i64)
            .bind(item.item_type.as_str())
            .bind(&item.item_id)
            .bind(i64::from(item.quantity))
            .bind(item.price.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn select_recent(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, created_at
             FROM customer_order
             WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(user_id.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id")?;
            let created_at: String = row.try_get("created_at")?;

            let items = sqlx::query(
                "SELECT item_type, item_id, quantity, price
                 FROM order_item
                 WHERE order_id = ?
                 ORDER BY line_no",
            )
            .bind(&id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(order_item_from_row)
            .collect::<Result<Vec<_>, _>>()?;

            orders.push(Order {
                id: OrderId(id),
                user_id: UserId(row.try_get("user_id")?),
                items,
                created_at: parse_rfc3339("created_at", &created_at)?,
            });
        }
        Ok(orders)
    }
}

#[async_trait::async_trait]
impl OrderHistory for SqlOrderHistory {
    async fn recent_orders(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self.select_recent(user_id, limit).await?)
    }
}

fn order_item_from_row(row: &SqliteRow) -> Result<OrderItem, RepositoryError> {
    let item_type: String = row.try_get("item_type")?;
    let quantity: i64 = row.try_get("quantity")?;
    let price: String = row.try_get("price")?;

    Ok(OrderItem {
        item_type: OrderItemType::from_str(&item_type).map_err(RepositoryError::Decode)?,
        item_id: row.try_get("item_id")?,
        quantity: u32::try_from(quantity).map_err(|_| {
            RepositoryError::Decode(format!("invalid order item quantity {quantity}"))
        })?,
        price: Decimal::from_str(&price).map_err(|err| {
            RepositoryError::Decode(format!("invalid order item price '{price}': {err}"))
        })?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use brewline_core::domain::order::{Order, OrderId, OrderItem, OrderItemType};
    use brewline_core::domain::user::UserId;
    use brewline_core::suggestions::OrderHistory;

    use super::SqlOrderHistory;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlOrderHistory {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlOrderHistory::new(pool)
    }

    fn order(id: &str, user: &str, minutes: i64, items: Vec<OrderItem>) -> Order {
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).single().expect("timestamp");
        Order {
            id: OrderId(id.to_string()),
            user_id: UserId(user.to_string()),
            items,
            created_at: base + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn recent_orders_are_newest_first_and_limited() {
        let history = setup().await;
        for (id, minutes) in [("o-1", 0), ("o-3", 20), ("o-2", 10)] {
            let items = vec![OrderItem::menu("latte", 1, Decimal::new(450, 2))];
            history
                .save(&order(id, "ana", minutes, items))
                .await
                .expect("save order");
        }
        history
            .save(&order("o-x", "ben", 30, vec![OrderItem::menu("mocha", 1, Decimal::new(500, 2))]))
            .await
            .expect("save other user");

        let recent =
            history.recent_orders(&UserId("ana".to_string()), 2).await.expect("recent orders");

        let ids: Vec<&str> = recent.iter().map(|order| order.id.0.as_str()).collect();
        assert_eq!(ids, vec!["o-3", "o-2"]);
    }

    #[tokio::test]
    async fn order_lines_keep_type_quantity_and_exact_price() {
        let history = setup().await;
        let saved = order(
            "o-1",
            "ana",
            0,
            vec![
                OrderItem::menu("latte", 2, Decimal::new(455, 2)),
                OrderItem {
                    item_type: OrderItemType::Workshop,
                    item_id: "latte-art-101".to_string(),
                    quantity: 1,
                    price: Decimal::new(3500, 2),
                },
            ],
        );
        history.save(&saved).await.expect("save order");

        let recent = history.recent_orders(&UserId("ana".to_string()), 5).await.expect("recent");

        assert_eq!(recent, vec![saved]);
    }
}
