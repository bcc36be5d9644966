//! Read-only catalog access. Product identity, pricing and unit-conversion
//! metadata are owned elsewhere; this core only consumes them.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::products::{OfferedSupplements, ProductList},
    error::{AppError, AppResult},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
    entity::{
        product_supplements::{Column as OfferCol, Entity as ProductSupplements},
        products::{Column, Entity as Products, Model as ProductModel},
    },
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(product_type) = query.product_type.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::ProductType.eq(product_type.clone()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(product_from_entity)
        .ok_or(AppError::ProductNotFound)?;
    Ok(ApiResponse::success("Product", result, None))
}

/// Supplement products offered for a dish, per the catalog's offer list.
pub async fn offered_supplements(
    state: &AppState,
    dish_id: Uuid,
) -> AppResult<ApiResponse<OfferedSupplements>> {
    Products::find_by_id(dish_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::ProductNotFound)?;

    let supplement_ids: Vec<Uuid> = ProductSupplements::find()
        .filter(OfferCol::DishId.eq(dish_id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|offer| offer.supplement_id)
        .collect();

    let items = if supplement_ids.is_empty() {
        Vec::new()
    } else {
        Products::find()
            .filter(Column::Id.is_in(supplement_ids))
            .order_by_asc(Column::Name)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect()
    };

    Ok(ApiResponse::success(
        "Offered supplements",
        OfferedSupplements { items },
        Some(Meta::empty()),
    ))
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        category_id: model.category_id,
        name: model.name,
        description: model.description,
        product_type: model.product_type,
        price: model.price,
        stock_unit: model.stock_unit,
        conversion_factor: model.conversion_factor,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
