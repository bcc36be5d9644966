use bar_orders_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        orders::{
            AddItemsRequest, CalculateOrderRequest, CreateOrderRequest, InitialPayment,
            OrderItemInput, OrderSupplementInput, UpdateOrderStatusRequest,
        },
        payments::RecordPaymentRequest,
        stock::RestockRequest,
    },
    entity::{
        orders::Entity as Orders,
        products::ActiveModel as ProductActive,
        stocks::ActiveModel as StockActive,
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::Pagination,
    services::{inventory_service, order_service, payment_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, Set, Statement};
use uuid::Uuid;

// End-to-end flow against a real database: price an order with supplements,
// take it with stock decrement, pay it off in installments, then exercise the
// guards (insufficient stock, overpayment, closed orders) and the inventory
// ledger.
#[tokio::test]
async fn order_payment_and_inventory_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let manager_id = create_user(&state, "manager", "manager@example.com").await?;
    let server_id = create_user(&state, "server", "server@example.com").await?;
    let client_id = create_user(&state, "client", "client@example.com").await?;

    let dish = create_product(&state, "Grilled Chicken", "dish", 1500, 1).await?;
    let fries = create_product(&state, "Fries", "supplement", 300, 1).await?;
    let cola = create_product(&state, "Cola", "drink", 600, 1).await?;
    let cigarettes = create_product(&state, "Cigarettes", "cigarette", 250, 20).await?;
    create_stock(&state, cola, 10).await?;

    let server = AuthUser {
        user_id: server_id,
        role: "server".into(),
    };
    let manager = AuthUser {
        user_id: manager_id,
        role: "manager".into(),
    };

    // Price preview: (1500 + 300) * 2 = 3600, nothing persisted.
    let estimate = order_service::calculate(
        &state,
        CalculateOrderRequest {
            items: vec![OrderItemInput {
                product_id: dish,
                quantity: 2,
            }],
            supplements: vec![OrderSupplementInput {
                supplement_id: fries,
                parent_item_index: 0,
            }],
        },
    )
    .await?;
    assert_eq!(estimate.data.unwrap().estimated_total, 3600);
    assert_eq!(Orders::find().count(&state.orm).await?, 0);

    // Take the order: dish line plus two colas, total 3600 + 1200 = 4800.
    let created = order_service::create_order(
        &state,
        &server,
        CreateOrderRequest {
            client_id,
            items: vec![
                OrderItemInput {
                    product_id: dish,
                    quantity: 2,
                },
                OrderItemInput {
                    product_id: cola,
                    quantity: 2,
                },
            ],
            supplements: vec![OrderSupplementInput {
                supplement_id: fries,
                parent_item_index: 0,
            }],
            table_label: Some("T4".into()),
            initial_payment: None,
        },
    )
    .await?;
    let details = created.data.unwrap();
    let order = details.order;
    assert_eq!(order.total_amount, 4800);
    assert_eq!(order.payment_status, "pending");
    assert_eq!(details.items.len(), 2);
    // One applied supplement instance per unit of the parent item.
    assert_eq!(details.supplements.len(), 2);

    // Drinks are stocked; the sale took two.
    let stock = inventory_service::get_stock(&state, cola).await?;
    assert_eq!(stock.data.unwrap().quantity, 8);

    // Asking for more than is left fails and leaves no partial writes.
    let orders_before = Orders::find().count(&state.orm).await?;
    let err = order_service::create_order(
        &state,
        &server,
        CreateOrderRequest {
            client_id,
            items: vec![OrderItemInput {
                product_id: cola,
                quantity: 20,
            }],
            supplements: vec![],
            table_label: None,
            initial_payment: None,
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::InsufficientStock { available, .. } => assert_eq!(available, 8),
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(Orders::find().count(&state.orm).await?, orders_before);
    let stock = inventory_service::get_stock(&state, cola).await?;
    assert_eq!(stock.data.unwrap().quantity, 8);

    // Restock cigarettes as 3 packets + 5 loose = 65 base units.
    let restocked = inventory_service::restock(
        &state,
        &manager,
        cigarettes,
        RestockRequest {
            quantity: None,
            packs: Some(3),
            units: Some(5),
            mode: None,
        },
    )
    .await?;
    let cig_stock = restocked.data.unwrap();
    assert_eq!(cig_stock.quantity, 65);
    assert_eq!(cig_stock.quantity_packets, Some(3));
    assert_eq!(cig_stock.quantity_units, Some(5));

    let err = order_service::create_order(
        &state,
        &server,
        CreateOrderRequest {
            client_id,
            items: vec![OrderItemInput {
                product_id: cigarettes,
                quantity: 70,
            }],
            supplements: vec![],
            table_label: None,
            initial_payment: None,
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::InsufficientStock { available, .. } => assert_eq!(available, 65),
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // First installment leaves the order pending with the remainder tracked.
    let partial = payment_service::record_payment(
        &state,
        &server,
        order.id,
        RecordPaymentRequest {
            amount: 2000,
            method: "cash".into(),
        },
    )
    .await?;
    assert_eq!(partial.data.unwrap().order.payment_status, "pending");

    let listed = payment_service::list_payments(&state, order.id).await?;
    let listed = listed.data.unwrap();
    assert_eq!(listed.total_paid, 2000);
    assert_eq!(listed.remaining, 2800);

    // Paying more than the remainder is rejected.
    let err = payment_service::record_payment(
        &state,
        &server,
        order.id,
        RecordPaymentRequest {
            amount: 3000,
            method: "cash".into(),
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::OverPayment { remaining } => assert_eq!(remaining, 2800),
        other => panic!("expected OverPayment, got {other:?}"),
    }

    // Settling the order credits the client's lifetime spend by the order
    // total exactly once, not per installment.
    let settled = payment_service::record_payment(
        &state,
        &server,
        order.id,
        RecordPaymentRequest {
            amount: 2800,
            method: "wave".into(),
        },
    )
    .await?;
    let settled_order = settled.data.unwrap().order;
    assert_eq!(settled_order.payment_status, "paid");
    assert!(settled_order.paid_at.is_some());

    let client = Users::find_by_id(client_id)
        .one(&state.orm)
        .await?
        .expect("client row");
    assert_eq!(client.total_spent, 4800);

    // A fully paid order refuses further items.
    let err = order_service::add_items(
        &state,
        &server,
        order.id,
        AddItemsRequest {
            items: vec![OrderItemInput {
                product_id: cola,
                quantity: 1,
            }],
            supplements: vec![],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::OrderAlreadyPaid));

    // Completing the order closes it for every mutation.
    let updated = order_service::update_status(
        &state,
        &server,
        order.id,
        UpdateOrderStatusRequest {
            status: "completed".into(),
            reason: None,
        },
    )
    .await?;
    let updated = updated.data.unwrap();
    assert_eq!(updated.status, "completed");
    assert!(updated.completed_at.is_some());

    let err = payment_service::record_payment(
        &state,
        &server,
        order.id,
        RecordPaymentRequest {
            amount: 100,
            method: "cash".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::OrderClosed));

    let err = order_service::update_status(
        &state,
        &server,
        order.id,
        UpdateOrderStatusRequest {
            status: "pending".into(),
            reason: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::OrderClosed));

    // The movement ledger kept a causal previous/new chain for the cola sale.
    let movements = inventory_service::list_movements(
        &state,
        &manager,
        cola,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    let movements = movements.data.unwrap().items;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, "sale");
    assert_eq!(movements[0].quantity, -2);
    assert_eq!(movements[0].previous_stock, 10);
    assert_eq!(movements[0].new_stock, 8);
    assert_eq!(movements[0].order_id, Some(order.id));

    // Cola (8 left) shows up under a threshold of 8; cigarettes (65) do not.
    let low = inventory_service::list_low_stock(&state, &manager, Some(8)).await?;
    let low = low.data.unwrap().items;
    assert!(low.iter().any(|s| s.product_id == cola));
    assert!(!low.iter().any(|s| s.product_id == cigarettes));

    // Pay-at-creation: an exact-total initial payment rides the creation
    // transaction and settles the order on the spot.
    let prepaid = order_service::create_order(
        &state,
        &server,
        CreateOrderRequest {
            client_id,
            items: vec![OrderItemInput {
                product_id: dish,
                quantity: 1,
            }],
            supplements: vec![],
            table_label: None,
            initial_payment: Some(InitialPayment {
                amount: 1500,
                method: "cash".into(),
            }),
        },
    )
    .await?;
    let prepaid = prepaid.data.unwrap().order;
    assert_eq!(prepaid.total_amount, 1500);
    assert_eq!(prepaid.payment_status, "paid");
    assert!(prepaid.paid_at.is_some());

    let listed = payment_service::list_payments(&state, prepaid.id).await?;
    let listed = listed.data.unwrap();
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.total_paid, 1500);
    assert_eq!(listed.remaining, 0);

    // Settled at creation counts toward lifetime spend exactly once too.
    let client = Users::find_by_id(client_id)
        .one(&state.orm)
        .await?
        .expect("client row");
    assert_eq!(client.total_spent, 4800 + 1500);

    // An overpaying initial payment takes the whole creation down with it:
    // no order, no payment, no spend.
    let orders_before = Orders::find().count(&state.orm).await?;
    let err = order_service::create_order(
        &state,
        &server,
        CreateOrderRequest {
            client_id,
            items: vec![OrderItemInput {
                product_id: dish,
                quantity: 1,
            }],
            supplements: vec![],
            table_label: None,
            initial_payment: Some(InitialPayment {
                amount: 2000,
                method: "cash".into(),
            }),
        },
    )
    .await
    .unwrap_err();
    match err {
        AppError::OverPayment { remaining } => assert_eq!(remaining, 1500),
        other => panic!("expected OverPayment, got {other:?}"),
    }
    assert_eq!(Orders::find().count(&state.orm).await?, orders_before);
    let client = Users::find_by_id(client_id)
        .one(&state.orm)
        .await?
        .expect("client row");
    assert_eq!(client.total_spent, 4800 + 1500);

    // Appending items to an open, partially paid order: the new line is
    // stocked out, the total grows by its contribution, and the payment
    // status stays pending.
    let open = order_service::create_order(
        &state,
        &server,
        CreateOrderRequest {
            client_id,
            items: vec![OrderItemInput {
                product_id: cola,
                quantity: 1,
            }],
            supplements: vec![],
            table_label: None,
            initial_payment: None,
        },
    )
    .await?;
    let open = open.data.unwrap().order;
    assert_eq!(open.total_amount, 600);

    payment_service::record_payment(
        &state,
        &server,
        open.id,
        RecordPaymentRequest {
            amount: 300,
            method: "cash".into(),
        },
    )
    .await?;

    let grown = order_service::add_items(
        &state,
        &server,
        open.id,
        AddItemsRequest {
            items: vec![OrderItemInput {
                product_id: cola,
                quantity: 2,
            }],
            supplements: vec![],
        },
    )
    .await?;
    let grown = grown.data.unwrap();
    assert_eq!(grown.order.total_amount, 1800);
    assert_eq!(grown.order.payment_status, "pending");
    assert_eq!(grown.items.len(), 2);

    // 8 at the start of this scenario, minus 1 at creation and 2 more here.
    let stock = inventory_service::get_stock(&state, cola).await?;
    assert_eq!(stock.data.unwrap().quantity, 5);

    let movements = inventory_service::list_movements(
        &state,
        &manager,
        cola,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    let movements = movements.data.unwrap().items;
    assert_eq!(movements.len(), 3);
    assert_eq!(movements[0].quantity, -2);
    assert_eq!(movements[0].previous_stock, 7);
    assert_eq!(movements[0].new_stock, 5);
    assert_eq!(movements[0].order_id, Some(open.id));

    Ok(())
}

// Staff-only guards: clients can browse but never take orders or move stock.
#[tokio::test]
async fn client_accounts_cannot_mutate() -> anyhow::Result<()> {
    let client = AuthUser {
        user_id: Uuid::new_v4(),
        role: "client".into(),
    };
    let server = AuthUser {
        user_id: Uuid::new_v4(),
        role: "server".into(),
    };

    assert!(matches!(
        bar_orders_api::middleware::auth::ensure_staff(&client),
        Err(AppError::Forbidden)
    ));
    assert!(bar_orders_api::middleware::auth::ensure_staff(&server).is_ok());
    assert!(matches!(
        bar_orders_api::middleware::auth::ensure_manager(&server),
        Err(AppError::Forbidden)
    ));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payments, order_supplements, order_items, orders, stock_movements, stocks, product_supplements, audit_logs, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { pool, orm })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        total_spent: Set(0),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn create_product(
    state: &AppState,
    name: &str,
    product_type: &str,
    price: i64,
    conversion_factor: i32,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        category_id: Set(None),
        name: Set(name.to_string()),
        description: Set(None),
        product_type: Set(product_type.to_string()),
        price: Set(price),
        stock_unit: Set(None),
        conversion_factor: Set(conversion_factor),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}

async fn create_stock(state: &AppState, product_id: Uuid, quantity: i32) -> anyhow::Result<()> {
    StockActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        quantity: Set(quantity),
        quantity_packets: Set(None),
        quantity_plates: Set(None),
        quantity_units: Set(None),
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(())
}
