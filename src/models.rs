use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub total_spent: i64,
    pub created_at: DateTime<Utc>,
}

/// What a product is, which also decides how (and whether) it is stocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Dish,
    Drink,
    Cigarette,
    Egg,
    Supplement,
    Service,
}

impl ProductType {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "dish" => Ok(ProductType::Dish),
            "drink" => Ok(ProductType::Drink),
            "cigarette" => Ok(ProductType::Cigarette),
            "egg" => Ok(ProductType::Egg),
            "supplement" => Ok(ProductType::Supplement),
            "service" => Ok(ProductType::Service),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "unknown product type: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Dish => "dish",
            ProductType::Drink => "drink",
            ProductType::Cigarette => "cigarette",
            ProductType::Egg => "egg",
            ProductType::Supplement => "supplement",
            ProductType::Service => "service",
        }
    }

    /// Prepared dishes, supplements and services are made to order and never
    /// tracked in the inventory ledger.
    pub fn is_stocked(&self) -> bool {
        matches!(
            self,
            ProductType::Drink | ProductType::Cigarette | ProductType::Egg
        )
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub product_type: String,
    pub price: i64,
    pub stock_unit: Option<String>,
    pub conversion_factor: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Stock {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub quantity_packets: Option<i32>,
    pub quantity_plates: Option<i32>,
    pub quantity_units: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub movement_type: String,
    pub quantity: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub order_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub client_id: Uuid,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    pub table_label: Option<String>,
    pub created_by: Uuid,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub is_supplement: bool,
    pub parent_item_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderSupplement {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub supplement_id: Uuid,
    pub supplement_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: i64,
    pub method: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

pub const ORDER_STATUSES: [&str; 5] = ["pending", "preparing", "ready", "completed", "cancelled"];
pub const PAYMENT_METHODS: [&str; 2] = ["cash", "wave"];

/// Completed and cancelled orders reject any further item or payment mutation.
pub fn is_terminal_status(status: &str) -> bool {
    status == "completed" || status == "cancelled"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_type_round_trips() {
        for name in ["dish", "drink", "cigarette", "egg", "supplement", "service"] {
            let parsed = ProductType::parse(name).unwrap();
            assert_eq!(parsed.as_str(), name);
        }
        assert!(ProductType::parse("beer").is_err());
    }

    #[test]
    fn only_physical_goods_are_stocked() {
        assert!(ProductType::Drink.is_stocked());
        assert!(ProductType::Cigarette.is_stocked());
        assert!(ProductType::Egg.is_stocked());
        assert!(!ProductType::Dish.is_stocked());
        assert!(!ProductType::Supplement.is_stocked());
        assert!(!ProductType::Service.is_stocked());
    }

    #[test]
    fn terminal_statuses() {
        assert!(is_terminal_status("completed"));
        assert!(is_terminal_status("cancelled"));
        assert!(!is_terminal_status("pending"));
        assert!(!is_terminal_status("ready"));
    }
}
