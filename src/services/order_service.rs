//! Order transaction coordinator. Every mutating entry point opens one SeaORM
//! transaction; pricing, persistence, inventory decrement and the optional
//! pay-at-creation payment either all commit or all roll back.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit_best_effort,
    dto::orders::{
        AddItemsRequest, CalculateOrderRequest, CalculateOrderResponse, CreateOrderRequest,
        OrderItemInput, OrderList, OrderSupplementInput, OrderWithDetails,
        UpdateOrderStatusRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{self, Order, OrderItem, OrderSupplement, ProductType},
    pricing::{self, PricedLine},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{inventory_service, payment_service},
    state::AppState,
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        order_supplements::{
            ActiveModel as OrderSupplementActive, Column as OrderSupplementCol,
            Entity as OrderSupplements, Model as OrderSupplementModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
        users::Entity as Users,
    },
};

/// One requested line with its catalog rows resolved.
struct ResolvedLine {
    product: ProductModel,
    quantity: i32,
    supplements: Vec<ProductModel>,
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;

    let client = Users::find_by_id(payload.client_id)
        .one(&txn)
        .await?
        .ok_or(AppError::ClientNotFound)?;
    if client.role != "client" {
        return Err(AppError::InvalidRole(format!(
            "user {} is not a client",
            client.id
        )));
    }

    let lines = resolve_lines(&txn, &payload.items, &payload.supplements).await?;
    let pricing = pricing::order_total(&priced_lines(&lines))?;
    for warning in &pricing.warnings {
        tracing::warn!(client_id = %client.id, %warning, "order validation warning");
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        client_id: Set(client.id),
        total_amount: Set(pricing.total_amount),
        status: Set("pending".into()),
        payment_status: Set("pending".into()),
        table_label: Set(payload.table_label.clone()),
        created_by: Set(user.user_id),
        paid_at: Set(None),
        completed_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let (items, supplements) = persist_lines(&txn, &order, &lines, user.user_id).await?;

    let order = match payload.initial_payment {
        Some(initial) => {
            let (_, updated) =
                payment_service::apply_payment(&txn, order, initial.amount, &initial.method, user.user_id)
                    .await?;
            updated
        }
        None => order,
    };

    txn.commit().await?;

    log_audit_best_effort(
        &state.pool,
        Some(user.user_id),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "client_id": order.client_id,
            "total_amount": order.total_amount,
            "table_label": order.table_label,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderWithDetails {
            order: order_from_entity(order),
            items: items.into_iter().map(order_item_from_entity).collect(),
            supplements: supplements
                .into_iter()
                .map(order_supplement_from_entity)
                .collect(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn add_items(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: AddItemsRequest,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if models::is_terminal_status(&order.status) {
        return Err(AppError::OrderClosed);
    }

    let total_paid = payment_service::total_paid(&txn, order.id).await?;
    if order.total_amount > 0 && total_paid >= order.total_amount {
        return Err(AppError::OrderAlreadyPaid);
    }

    let lines = resolve_lines(&txn, &payload.items, &payload.supplements).await?;
    let pricing = pricing::order_total(&priced_lines(&lines))?;

    let (_, _) = persist_lines(&txn, &order, &lines, user.user_id).await?;

    let new_total = order
        .total_amount
        .checked_add(pricing.total_amount)
        .ok_or_else(|| AppError::InvalidOrderData("order total overflow".into()))?;

    let was_paid = order.payment_status == "paid";
    let mut active: OrderActive = order.into();
    active.total_amount = Set(new_total);
    active.updated_at = Set(Utc::now().into());
    if was_paid && new_total > total_paid {
        active.payment_status = Set("pending".into());
        active.paid_at = Set(None);
    }
    let order = active.update(&txn).await?;

    let items = order_items(&txn, order.id).await?;
    let supplements = order_supplements(&txn, order.id).await?;

    txn.commit().await?;

    log_audit_best_effort(
        &state.pool,
        Some(user.user_id),
        "order_items_added",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "added_amount": pricing.total_amount,
            "total_amount": order.total_amount,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Items added",
        assemble_details(order, items, supplements),
        Some(Meta::empty()),
    ))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_staff(user)?;
    if !models::ORDER_STATUSES.contains(&payload.status.as_str()) {
        return Err(AppError::BadRequest("Invalid order status".into()));
    }

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if models::is_terminal_status(&order.status) {
        return Err(AppError::OrderClosed);
    }

    let mut active: OrderActive = order.into();
    active.status = Set(payload.status.clone());
    active.updated_at = Set(Utc::now().into());
    if payload.status == "completed" {
        active.completed_at = Set(Some(Utc::now().into()));
    }
    let order = active.update(&txn).await?;

    txn.commit().await?;

    log_audit_best_effort(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "status": order.status,
            "reason": payload.reason,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Prices a prospective order without persisting anything: no order row, no
/// stock check, no payment. Same catalog resolution and the same pure fold
/// as [`create_order`].
pub async fn calculate(
    state: &AppState,
    payload: CalculateOrderRequest,
) -> AppResult<ApiResponse<CalculateOrderResponse>> {
    let lines = resolve_lines(&state.orm, &payload.items, &payload.supplements).await?;
    let pricing = pricing::order_total(&priced_lines(&lines))?;

    Ok(ApiResponse::success(
        "Estimate",
        CalculateOrderResponse {
            estimated_total: pricing.total_amount,
            breakdown: pricing.lines,
            warnings: pricing.warnings,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = order_items(&state.orm, order.id).await?;
    let supplements = order_supplements(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "Order",
        assemble_details(order, items, supplements),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Resolves catalog rows for the requested items and modifier selections.
/// Unknown products fail, as do modifiers that are not supplement products or
/// point at a line that does not exist.
async fn resolve_lines<C: ConnectionTrait>(
    conn: &C,
    items: &[OrderItemInput],
    supplements: &[OrderSupplementInput],
) -> AppResult<Vec<ResolvedLine>> {
    if items.is_empty() {
        return Err(AppError::InvalidOrderData(
            "order must contain at least one item".into(),
        ));
    }
    for supplement in supplements {
        if supplement.parent_item_index >= items.len() {
            return Err(AppError::InvalidOrderData(format!(
                "supplement references item index {} out of range",
                supplement.parent_item_index
            )));
        }
    }

    let mut product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    product_ids.extend(supplements.iter().map(|s| s.supplement_id));
    product_ids.sort();
    product_ids.dedup();

    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut lines = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let product = products
            .get(&item.product_id)
            .cloned()
            .ok_or(AppError::ProductNotFound)?;

        let mut attached = Vec::new();
        for selection in supplements
            .iter()
            .filter(|s| s.parent_item_index == index)
        {
            let supplement = products
                .get(&selection.supplement_id)
                .cloned()
                .ok_or(AppError::ProductNotFound)?;
            if ProductType::parse(&supplement.product_type)? != ProductType::Supplement {
                return Err(AppError::InvalidOrderData(format!(
                    "product {} is not a supplement",
                    supplement.name
                )));
            }
            attached.push(supplement);
        }

        lines.push(ResolvedLine {
            product,
            quantity: item.quantity,
            supplements: attached,
        });
    }

    Ok(lines)
}

fn priced_lines(lines: &[ResolvedLine]) -> Vec<PricedLine> {
    lines
        .iter()
        .map(|line| PricedLine {
            product_id: line.product.id,
            product_name: line.product.name.clone(),
            unit_price: line.product.price,
            quantity: line.quantity,
            supplement_unit_sum: line.supplements.iter().map(|s| s.price).sum(),
        })
        .collect()
}

/// Persists the priced lines, materializes their supplements (one applied
/// instance per unit of the parent item) and decrements stock for each
/// non-supplement line.
async fn persist_lines(
    txn: &DatabaseTransaction,
    order: &OrderModel,
    lines: &[ResolvedLine],
    actor: Uuid,
) -> AppResult<(Vec<OrderItemModel>, Vec<OrderSupplementModel>)> {
    let mut items = Vec::with_capacity(lines.len());
    let mut supplements = Vec::new();

    for line in lines {
        let supplement_unit_sum: i64 = line.supplements.iter().map(|s| s.price).sum();
        let total_price =
            pricing::item_total(line.product.price, line.quantity, supplement_unit_sum)?;

        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product.id),
            product_name: Set(line.product.name.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.product.price),
            total_price: Set(total_price),
            is_supplement: Set(false),
            parent_item_id: Set(None),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;

        for supplement in &line.supplements {
            // One row per unit of the parent so a single serving's modifiers
            // stay independently addressable.
            for _ in 0..line.quantity {
                let row = OrderSupplementActive {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order.id),
                    order_item_id: Set(item.id),
                    supplement_id: Set(supplement.id),
                    supplement_name: Set(supplement.name.clone()),
                    quantity: Set(1),
                    unit_price: Set(supplement.price),
                    total_price: Set(supplement.price),
                    created_at: NotSet,
                }
                .insert(txn)
                .await?;
                supplements.push(row);
            }
        }

        inventory_service::decrement_for_sale(txn, &line.product, line.quantity, order.id, actor)
            .await?;

        items.push(item);
    }

    Ok((items, supplements))
}

async fn order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderItemModel>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?)
}

async fn order_supplements<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderSupplementModel>> {
    Ok(OrderSupplements::find()
        .filter(OrderSupplementCol::OrderId.eq(order_id))
        .order_by_asc(OrderSupplementCol::CreatedAt)
        .all(conn)
        .await?)
}

/// Folds legacy flagged-item modifier rows (`is_supplement = true` with a
/// parent) into the supplements list so old orders read the same as new ones.
/// The dedicated order_supplements table stays the single source of truth for
/// everything written by this service.
fn assemble_details(
    order: OrderModel,
    items: Vec<OrderItemModel>,
    supplements: Vec<OrderSupplementModel>,
) -> OrderWithDetails {
    let mut out_items = Vec::new();
    let mut out_supplements: Vec<OrderSupplement> = supplements
        .into_iter()
        .map(order_supplement_from_entity)
        .collect();

    for item in items {
        match (item.is_supplement, item.parent_item_id) {
            (true, Some(parent_id)) => out_supplements.push(OrderSupplement {
                id: item.id,
                order_id: item.order_id,
                order_item_id: parent_id,
                supplement_id: item.product_id,
                supplement_name: item.product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
                created_at: item.created_at.with_timezone(&Utc),
            }),
            _ => out_items.push(order_item_from_entity(item)),
        }
    }

    OrderWithDetails {
        order: order_from_entity(order),
        items: out_items,
        supplements: out_supplements,
    }
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        client_id: model.client_id,
        total_amount: model.total_amount,
        status: model.status,
        payment_status: model.payment_status,
        table_label: model.table_label,
        created_by: model.created_by,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        completed_at: model.completed_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_price: model.total_price,
        is_supplement: model.is_supplement,
        parent_item_id: model.parent_item_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_supplement_from_entity(model: OrderSupplementModel) -> OrderSupplement {
    OrderSupplement {
        id: model.id,
        order_id: model.order_id,
        order_item_id: model.order_item_id,
        supplement_id: model.supplement_id,
        supplement_name: model.supplement_name,
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_price: model.total_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
