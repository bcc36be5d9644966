use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{
            AddItemsRequest, CalculateOrderRequest, CalculateOrderResponse, CreateOrderRequest,
            InitialPayment, OrderItemInput, OrderList, OrderSupplementInput, OrderWithDetails,
            PaymentList, PaymentWithOrder, UpdateOrderStatusRequest,
        },
        payments::RecordPaymentRequest,
        products::{OfferedSupplements, ProductList},
        stock::{LowStockList, RestockRequest, StockMovementList},
    },
    models::{
        AuditEntry, Order, OrderItem, OrderSupplement, Payment, Product, Stock, StockMovement,
        User,
    },
    pricing::LineTotal,
    response::{ApiResponse, Meta},
    routes::{auth, health, orders, params, products as product_routes, stock},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::offered_supplements,
        orders::create_order,
        orders::list_orders,
        orders::calculate_order,
        orders::get_order,
        orders::add_items,
        orders::update_status,
        orders::record_payment,
        orders::list_payments,
        orders::order_history,
        stock::get_stock,
        stock::restock,
        stock::list_movements,
        stock::list_low_stock
    ),
    components(
        schemas(
            User,
            Product,
            Stock,
            StockMovement,
            Order,
            OrderItem,
            OrderSupplement,
            Payment,
            AuditEntry,
            OrderItemInput,
            OrderSupplementInput,
            InitialPayment,
            CreateOrderRequest,
            AddItemsRequest,
            UpdateOrderStatusRequest,
            CalculateOrderRequest,
            CalculateOrderResponse,
            LineTotal,
            RecordPaymentRequest,
            RestockRequest,
            OrderWithDetails,
            OrderList,
            PaymentWithOrder,
            PaymentList,
            ProductList,
            OfferedSupplements,
            StockMovementList,
            LowStockList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithDetails>,
            ApiResponse<OrderList>,
            ApiResponse<PaymentList>,
            ApiResponse<Stock>,
            ApiResponse<StockMovementList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Catalog", description = "Read-only product catalog"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Payments", description = "Installment payment endpoints"),
        (name = "Stock", description = "Inventory endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
