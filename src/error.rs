use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Invalid order data: {0}")]
    InvalidOrderData(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Order is closed")]
    OrderClosed,

    #[error("Order is already fully paid")]
    OrderAlreadyPaid,

    #[error("Payment exceeds remaining balance of {remaining}")]
    OverPayment { remaining: i64 },

    #[error("Payment amount must be greater than 0")]
    InvalidAmount,

    #[error("Transaction conflict, retry the request")]
    TransactionConflict,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

/// Lock contention and serialization failures are retriable by the caller,
/// everything else from the ORM stays an opaque 500.
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        let msg = err.to_string();
        if msg.contains("could not serialize") || msg.contains("deadlock detected") {
            AppError::TransactionConflict
        } else {
            AppError::OrmError(err)
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl AppError {
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Some(serde_json::json!({
                "product_id": product_id,
                "requested": requested,
                "available": available,
            })),
            AppError::OverPayment { remaining } => {
                Some(serde_json::json!({ "remaining": remaining }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound | AppError::ClientNotFound | AppError::ProductNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidOrderData(_)
            | AppError::InvalidRole(_)
            | AppError::InsufficientStock { .. }
            | AppError::OrderClosed
            | AppError::OrderAlreadyPaid
            | AppError::OverPayment { .. }
            | AppError::InvalidAmount
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TransactionConflict => StatusCode::CONFLICT,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "internal error");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                details: self.details(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
