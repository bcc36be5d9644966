//! Order pricing. Pure calculation over already-resolved catalog prices,
//! shared by order persistence and the no-persistence preview endpoint.
//!
//! Supplements are priced per unit of their parent line and therefore scale
//! with the parent quantity: `(unit_price + supplement_unit_sum) * quantity`.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// One line of an order with its attached supplement prices, ready to price.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    /// Sum of the unit prices of the supplements attached to this line.
    pub supplement_unit_sum: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LineTotal {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub supplement_unit_sum: i64,
    pub total_price: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderPricing {
    pub total_amount: i64,
    pub lines: Vec<LineTotal>,
    pub warnings: Vec<String>,
}

/// `(unit_price + supplement_unit_sum) * quantity`.
pub fn item_total(unit_price: i64, quantity: i32, supplement_unit_sum: i64) -> AppResult<i64> {
    if quantity <= 0 {
        return Err(AppError::InvalidOrderData(
            "quantity must be a positive integer".into(),
        ));
    }
    if unit_price < 0 || supplement_unit_sum < 0 {
        return Err(AppError::InvalidOrderData(
            "prices must not be negative".into(),
        ));
    }
    unit_price
        .checked_add(supplement_unit_sum)
        .and_then(|per_unit| per_unit.checked_mul(quantity as i64))
        .ok_or_else(|| AppError::InvalidOrderData("order total overflow".into()))
}

/// Folds every line through [`item_total`] and sums the results.
///
/// Identical inputs always yield identical output; nothing here touches
/// persisted state.
pub fn order_total(lines: &[PricedLine]) -> AppResult<OrderPricing> {
    if lines.is_empty() {
        return Err(AppError::InvalidOrderData(
            "order must contain at least one item".into(),
        ));
    }

    let mut totals = Vec::with_capacity(lines.len());
    let mut warnings = Vec::new();
    let mut total_amount: i64 = 0;

    for line in lines {
        let total_price = item_total(line.unit_price, line.quantity, line.supplement_unit_sum)?;
        if line.quantity > 100 {
            warnings.push(format!(
                "unusually large quantity {} for {}",
                line.quantity, line.product_name
            ));
        }
        total_amount = total_amount
            .checked_add(total_price)
            .ok_or_else(|| AppError::InvalidOrderData("order total overflow".into()))?;
        totals.push(LineTotal {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            supplement_unit_sum: line.supplement_unit_sum,
            total_price,
        });
    }

    Ok(OrderPricing {
        total_amount,
        lines: totals,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(unit_price: i64, quantity: i32, supplement_unit_sum: i64) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            product_name: "test".into(),
            unit_price,
            quantity,
            supplement_unit_sum,
        }
    }

    #[test]
    fn supplement_scales_with_parent_quantity() {
        // price 1500, quantity 2, one supplement at 300 -> (1500+300)*2 = 3600
        assert_eq!(item_total(1500, 2, 300).unwrap(), 3600);
    }

    #[test]
    fn total_is_sum_of_line_formulas() {
        let lines = vec![line(1000, 3, 0), line(1500, 2, 300), line(250, 1, 0)];
        let pricing = order_total(&lines).unwrap();
        assert_eq!(pricing.total_amount, 3000 + 3600 + 250);
        assert_eq!(pricing.lines.len(), 3);
        assert_eq!(pricing.lines[1].total_price, 3600);
        assert!(pricing.warnings.is_empty());
    }

    #[test]
    fn empty_order_is_fatal() {
        assert!(matches!(
            order_total(&[]),
            Err(AppError::InvalidOrderData(_))
        ));
    }

    #[test]
    fn non_positive_quantity_is_fatal() {
        assert!(item_total(1000, 0, 0).is_err());
        assert!(item_total(1000, -2, 0).is_err());
    }

    #[test]
    fn negative_price_is_fatal() {
        assert!(item_total(-1, 1, 0).is_err());
        assert!(item_total(100, 1, -5).is_err());
    }

    #[test]
    fn oversized_quantity_is_a_warning_not_an_error() {
        let pricing = order_total(&[line(100, 150, 0)]).unwrap();
        assert_eq!(pricing.total_amount, 15_000);
        assert_eq!(pricing.warnings.len(), 1);
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(item_total(i64::MAX, 2, 0).is_err());
    }
}
