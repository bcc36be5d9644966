use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::stock::{LowStockList, RestockRequest, StockMovementList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Stock,
    response::ApiResponse,
    routes::params::{LowStockQuery, Pagination},
    services::inventory_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/low", get(list_low_stock))
        .route("/{product_id}", get(get_stock).post(restock))
        .route("/{product_id}/movements", get(list_movements))
}

#[utoipa::path(
    get,
    path = "/api/stock/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Current stock level", body = ApiResponse<Stock>),
        (status = 404, description = "No stock row for product"),
    ),
    tag = "Stock"
)]
pub async fn get_stock(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Stock>>> {
    let resp = inventory_service::get_stock(&state, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/stock/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = RestockRequest,
    responses(
        (status = 200, description = "Stock updated", body = ApiResponse<Stock>),
        (status = 400, description = "Invalid restock input"),
        (status = 403, description = "Manager role required"),
    ),
    tag = "Stock"
)]
pub async fn restock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<RestockRequest>,
) -> AppResult<Json<ApiResponse<Stock>>> {
    let resp = inventory_service::restock(&state, &user, product_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/stock/{product_id}/movements",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Movement ledger, newest first", body = ApiResponse<StockMovementList>)
    ),
    tag = "Stock"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<StockMovementList>>> {
    let resp = inventory_service::list_movements(&state, &user, product_id, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/stock/low",
    params(("threshold" = Option<i32>, Query, description = "Base-unit threshold, default 5")),
    responses(
        (status = 200, description = "Stocks at or below the threshold", body = ApiResponse<LowStockList>)
    ),
    tag = "Stock"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<LowStockList>>> {
    let resp = inventory_service::list_low_stock(&state, &user, query.threshold).await?;
    Ok(Json(resp))
}
