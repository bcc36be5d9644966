use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

/// Supplement products offered for a dish.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferedSupplements {
    pub items: Vec<Product>,
}
