use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// Which catalog an order line points into. Only `Menu` lines reference
/// products that can be suggested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemType {
    Menu,
    Artwork,
    Workshop,
}

impl OrderItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Artwork => "artwork",
            Self::Workshop => "workshop",
        }
    }
}

impl std::str::FromStr for OrderItemType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "menu" => Ok(Self::Menu),
            "artwork" => Ok(Self::Artwork),
            "workshop" => Ok(Self::Workshop),
            other => Err(format!("unknown order item type `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_type: OrderItemType,
    pub item_id: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl OrderItem {
    pub fn menu(product_id: impl Into<String>, quantity: u32, price: Decimal) -> Self {
        Self { item_type: OrderItemType::Menu, item_id: product_id.into(), quantity, price }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Distinct menu product ids in line order.
    pub fn menu_product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::new();
        for item in &self.items {
            if item.item_type != OrderItemType::Menu {
                continue;
            }
            let id = ProductId(item.item_id.clone());
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}
