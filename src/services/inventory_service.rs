//! Inventory ledger: every stock change is an atomic quantity update plus an
//! append-only movement row, always inside the caller's transaction.

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit_best_effort,
    dto::stock::{LowStockList, RestockRequest, StockMovementList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_manager},
    models::{ProductType, Stock, StockMovement},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
    units::{split_base_units, to_base_units},
    entity::{
        products::{Entity as Products, Model as ProductModel},
        stock_movements::{
            ActiveModel as MovementActive, Column as MovementCol, Entity as StockMovements,
            Model as MovementModel,
        },
        stocks::{
            ActiveModel as StockActive, Column as StockCol, Entity as Stocks, Model as StockModel,
        },
    },
};

#[derive(Debug, Clone, Copy)]
pub struct StockChange {
    pub previous_stock: i32,
    pub new_stock: i32,
}

/// Decrements stock for a sale inside `txn`.
///
/// Non-stocked product types (dishes, supplements, services) are a no-op
/// success. The decrement itself is a single conditional update whose
/// affected-row count decides between success and `InsufficientStock`, so two
/// concurrent sales can never both take the last unit.
pub async fn decrement_for_sale(
    txn: &DatabaseTransaction,
    product: &ProductModel,
    requested: i32,
    order_id: Uuid,
    actor: Uuid,
) -> AppResult<Option<StockChange>> {
    let kind = ProductType::parse(&product.product_type)?;
    if !kind.is_stocked() {
        return Ok(None);
    }
    if requested <= 0 {
        return Err(AppError::InvalidOrderData(
            "quantity must be a positive integer".into(),
        ));
    }

    let result = Stocks::update_many()
        .col_expr(
            StockCol::Quantity,
            Expr::col(StockCol::Quantity).sub(requested),
        )
        .filter(StockCol::ProductId.eq(product.id))
        .filter(StockCol::Quantity.gte(requested))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        let available = Stocks::find()
            .filter(StockCol::ProductId.eq(product.id))
            .one(txn)
            .await?
            .map(|s| s.quantity)
            .unwrap_or(0);
        return Err(AppError::InsufficientStock {
            product_id: product.id,
            requested,
            available,
        });
    }

    let stock = Stocks::find()
        .filter(StockCol::ProductId.eq(product.id))
        .one(txn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("stock row missing after decrement")))?;

    let new_stock = stock.quantity;
    let previous_stock = new_stock + requested;

    refresh_secondary(txn, stock, kind, product.conversion_factor).await?;

    record_movement(
        txn,
        product.id,
        "sale",
        -requested,
        previous_stock,
        new_stock,
        Some(order_id),
        Some(actor),
    )
    .await?;

    tracing::debug!(
        product_id = %product.id,
        requested,
        new_stock,
        "stock decremented for sale"
    );

    Ok(Some(StockChange {
        previous_stock,
        new_stock,
    }))
}

/// Manager-only stock intake. Accepts raw base units or packs/plates plus
/// leftover units; `mode=restock` adds, `mode=adjustment` sets the level.
pub async fn restock(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: RestockRequest,
) -> AppResult<ApiResponse<Stock>> {
    ensure_manager(user)?;

    let mode = payload.mode.as_deref().unwrap_or("restock");
    if mode != "restock" && mode != "adjustment" {
        return Err(AppError::BadRequest("mode must be restock or adjustment".into()));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or(AppError::ProductNotFound)?;
    let kind = ProductType::parse(&product.product_type)?;
    if !kind.is_stocked() {
        return Err(AppError::BadRequest(format!(
            "product type {} is not stocked",
            product.product_type
        )));
    }

    let input_units = match payload.quantity {
        Some(q) if q >= 0 => q,
        Some(_) => {
            return Err(AppError::BadRequest("quantity must not be negative".into()));
        }
        None => to_base_units(
            payload.packs.unwrap_or(0),
            payload.units.unwrap_or(0),
            product.conversion_factor,
        )?,
    };

    // Lock the row so the previous/new chain in the ledger stays causal.
    let stock = Stocks::find()
        .filter(StockCol::ProductId.eq(product_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let stock = match stock {
        Some(s) => s,
        None => {
            StockActive {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                quantity: Set(0),
                quantity_packets: Set(None),
                quantity_plates: Set(None),
                quantity_units: Set(None),
                updated_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?
        }
    };

    let previous = stock.quantity;
    let new_quantity = match mode {
        "restock" => previous
            .checked_add(input_units)
            .ok_or_else(|| AppError::BadRequest("stock quantity overflow".into()))?,
        _ => input_units,
    };
    let delta = new_quantity - previous;
    if delta == 0 {
        return Err(AppError::BadRequest("stock level is unchanged".into()));
    }
    if new_quantity < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }

    let mut active: StockActive = stock.into();
    active.quantity = Set(new_quantity);
    let (packets, plates, units) = secondary_fields(kind, product.conversion_factor, new_quantity)?;
    active.quantity_packets = Set(packets);
    active.quantity_plates = Set(plates);
    active.quantity_units = Set(units);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    record_movement(
        &txn,
        product_id,
        mode,
        delta,
        previous,
        new_quantity,
        None,
        Some(user.user_id),
    )
    .await?;

    txn.commit().await?;

    log_audit_best_effort(
        &state.pool,
        Some(user.user_id),
        "stock_restock",
        Some("stocks"),
        Some(serde_json::json!({
            "product_id": product_id,
            "mode": mode,
            "delta": delta,
            "new_quantity": new_quantity,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Stock updated",
        stock_from_entity(updated),
        Some(Meta::empty()),
    ))
}

pub async fn get_stock(state: &AppState, product_id: Uuid) -> AppResult<ApiResponse<Stock>> {
    let stock = Stocks::find()
        .filter(StockCol::ProductId.eq(product_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Stock",
        stock_from_entity(stock),
        None,
    ))
}

pub async fn list_movements(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<StockMovementList>> {
    ensure_manager(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = StockMovements::find()
        .filter(MovementCol::ProductId.eq(product_id))
        .order_by_desc(MovementCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items: Vec<StockMovement> = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(movement_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Stock movements",
        StockMovementList { items },
        Some(meta),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    threshold: Option<i32>,
) -> AppResult<ApiResponse<LowStockList>> {
    ensure_manager(user)?;
    let threshold = threshold.unwrap_or(5);

    let items: Vec<Stock> = Stocks::find()
        .filter(StockCol::Quantity.lte(threshold))
        .order_by_asc(StockCol::Quantity)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(stock_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Low stock",
        LowStockList { items },
        Some(Meta::empty()),
    ))
}

/// Keeps the display-only packet/plate split consistent with the base total.
async fn refresh_secondary(
    txn: &DatabaseTransaction,
    stock: StockModel,
    kind: ProductType,
    conversion_factor: i32,
) -> AppResult<()> {
    let (packets, plates, units) = secondary_fields(kind, conversion_factor, stock.quantity)?;
    let mut active: StockActive = stock.into();
    active.quantity_packets = Set(packets);
    active.quantity_plates = Set(plates);
    active.quantity_units = Set(units);
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await?;
    Ok(())
}

fn secondary_fields(
    kind: ProductType,
    conversion_factor: i32,
    total: i32,
) -> AppResult<(Option<i32>, Option<i32>, Option<i32>)> {
    match kind {
        ProductType::Cigarette => {
            let (packets, units) = split_base_units(total, conversion_factor)?;
            Ok((Some(packets), None, Some(units)))
        }
        ProductType::Egg => {
            let (plates, units) = split_base_units(total, conversion_factor)?;
            Ok((None, Some(plates), Some(units)))
        }
        _ => Ok((None, None, None)),
    }
}

#[allow(clippy::too_many_arguments)]
async fn record_movement(
    txn: &DatabaseTransaction,
    product_id: Uuid,
    movement_type: &str,
    quantity: i32,
    previous_stock: i32,
    new_stock: i32,
    order_id: Option<Uuid>,
    created_by: Option<Uuid>,
) -> AppResult<()> {
    debug_assert_eq!(new_stock - previous_stock, quantity);
    MovementActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        movement_type: Set(movement_type.to_string()),
        quantity: Set(quantity),
        previous_stock: Set(previous_stock),
        new_stock: Set(new_stock),
        order_id: Set(order_id),
        created_by: Set(created_by),
        created_at: NotSet,
    }
    .insert(txn)
    .await?;
    Ok(())
}

pub fn stock_from_entity(model: StockModel) -> Stock {
    Stock {
        id: model.id,
        product_id: model.product_id,
        quantity: model.quantity,
        quantity_packets: model.quantity_packets,
        quantity_plates: model.quantity_plates,
        quantity_units: model.quantity_units,
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn movement_from_entity(model: MovementModel) -> StockMovement {
    StockMovement {
        id: model.id,
        product_id: model.product_id,
        movement_type: model.movement_type,
        quantity: model.quantity,
        previous_stock: model.previous_stock,
        new_stock: model.new_stock,
        order_id: model.order_id,
        created_by: model.created_by,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secondary_split_matches_conversion() {
        let (packets, plates, units) = secondary_fields(ProductType::Cigarette, 20, 65).unwrap();
        assert_eq!(packets, Some(3));
        assert_eq!(plates, None);
        assert_eq!(units, Some(5));

        let (packets, plates, units) = secondary_fields(ProductType::Egg, 30, 95).unwrap();
        assert_eq!(packets, None);
        assert_eq!(plates, Some(3));
        assert_eq!(units, Some(5));
    }

    #[test]
    fn unit_stocked_products_have_no_secondary_split() {
        let (packets, plates, units) = secondary_fields(ProductType::Drink, 1, 42).unwrap();
        assert_eq!((packets, plates, units), (None, None, None));
    }
}
