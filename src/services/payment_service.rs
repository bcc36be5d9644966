//! Payment ledger. The order's payment status is always derived from the sum
//! of recorded payments, re-read inside the same transaction that inserts the
//! new payment, behind a row lock on the order.

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit_best_effort,
    dto::{
        orders::{PaymentList, PaymentWithOrder},
        payments::RecordPaymentRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{self, Payment},
    response::{ApiResponse, Meta},
    services::order_service::order_from_entity,
    state::AppState,
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
        users::{Column as UserCol, Entity as Users},
    },
};

pub async fn record_payment(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: RecordPaymentRequest,
) -> AppResult<ApiResponse<PaymentWithOrder>> {
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

    let (payment, order) =
        apply_payment(&txn, order, payload.amount, &payload.method, user.user_id).await?;

    txn.commit().await?;

    log_audit_best_effort(
        &state.pool,
        Some(user.user_id),
        "payment_recorded",
        Some("payments"),
        Some(serde_json::json!({
            "order_id": order.id,
            "payment_id": payment.id,
            "amount": payment.amount,
            "method": payment.method,
            "payment_status": order.payment_status,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        PaymentWithOrder {
            payment: payment_from_entity(payment),
            order: order_from_entity(order),
        },
        Some(Meta::empty()),
    ))
}

/// Inserts one payment for a locked order and re-derives its payment status.
///
/// On the transition to fully paid the client's lifetime spend is credited
/// exactly once, by the order's total (never per payment), so installments
/// can never double-count.
pub(crate) async fn apply_payment(
    txn: &DatabaseTransaction,
    order: OrderModel,
    amount: i64,
    method: &str,
    actor: Uuid,
) -> AppResult<(PaymentModel, OrderModel)> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount);
    }
    if !models::PAYMENT_METHODS.contains(&method) {
        return Err(AppError::BadRequest(format!(
            "unknown payment method: {method}"
        )));
    }

    let previously_paid = total_paid(txn, order.id).await?;
    let remaining = order.total_amount - previously_paid;
    if amount > remaining {
        return Err(AppError::OverPayment { remaining });
    }

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        amount: Set(amount),
        method: Set(method.to_string()),
        created_by: Set(Some(actor)),
        created_at: NotSet,
    }
    .insert(txn)
    .await?;

    let new_total_paid = previously_paid + amount;
    let order = if new_total_paid >= order.total_amount {
        Users::update_many()
            .col_expr(
                UserCol::TotalSpent,
                Expr::col(UserCol::TotalSpent).add(order.total_amount),
            )
            .filter(UserCol::Id.eq(order.client_id))
            .exec(txn)
            .await?;

        let mut active: OrderActive = order.into();
        active.payment_status = Set("paid".into());
        active.paid_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await?
    } else {
        order
    };

    Ok((payment, order))
}

/// Sum of recorded payments for an order, read through the given connection
/// so callers inside a transaction see their own snapshot.
pub(crate) async fn total_paid(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<i64> {
    let payments = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .all(txn)
        .await?;
    Ok(payments.iter().map(|p| p.amount).sum())
}

pub async fn list_payments(
    state: &AppState,
    order_id: Uuid,
) -> AppResult<ApiResponse<PaymentList>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let payments: Vec<PaymentModel> = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .order_by_asc(PaymentCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let total_paid: i64 = payments.iter().map(|p| p.amount).sum();
    let remaining = order.total_amount - total_paid;

    Ok(ApiResponse::success(
        "Payments",
        PaymentList {
            items: payments.into_iter().map(payment_from_entity).collect(),
            total_paid,
            remaining,
        },
        Some(Meta::empty()),
    ))
}

fn payment_from_entity(model: PaymentModel) -> Payment {
    Payment {
        id: model.id,
        order_id: model.order_id,
        amount: model.amount,
        method: model.method,
        created_by: model.created_by,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
