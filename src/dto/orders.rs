use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderSupplement, Payment};
use crate::pricing::LineTotal;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A modifier selection bound to the item at `parent_item_index` in the
/// request's item list.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderSupplementInput {
    pub supplement_id: Uuid,
    pub parent_item_index: usize,
}

/// Legacy pay-at-creation: records a first payment in the same transaction
/// that creates the order.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InitialPayment {
    pub amount: i64,
    pub method: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub client_id: Uuid,
    pub items: Vec<OrderItemInput>,
    #[serde(default)]
    pub supplements: Vec<OrderSupplementInput>,
    pub table_label: Option<String>,
    pub initial_payment: Option<InitialPayment>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemsRequest {
    pub items: Vec<OrderItemInput>,
    #[serde(default)]
    pub supplements: Vec<OrderSupplementInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CalculateOrderRequest {
    pub items: Vec<OrderItemInput>,
    #[serde(default)]
    pub supplements: Vec<OrderSupplementInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalculateOrderResponse {
    pub estimated_total: i64,
    pub breakdown: Vec<LineTotal>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub supplements: Vec<OrderSupplement>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentWithOrder {
    pub payment: Payment,
    pub order: Order,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentList {
    pub items: Vec<Payment>,
    pub total_paid: i64,
    pub remaining: i64,
}
