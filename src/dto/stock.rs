use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Stock, StockMovement};

/// Stock intake. Either `quantity` (raw base units) or `packs` + `units`
/// (packets/plates plus leftovers); both forms normalize to base units.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RestockRequest {
    pub quantity: Option<i32>,
    pub packs: Option<i32>,
    pub units: Option<i32>,
    /// "restock" adds to the current level, "adjustment" sets it outright.
    pub mode: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockMovementList {
    pub items: Vec<StockMovement>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockList {
    pub items: Vec<Stock>,
}
