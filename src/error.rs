use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

/// Rejections raised while placing an order or moving it through its lifecycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("No order items")]
    NoOrderItems,

    #[error("Invalid shipping address")]
    InvalidShippingAddress,

    #[error("Order item {index} is missing a product")]
    MissingProduct { index: usize },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Invalid quantity for product {product}")]
    InvalidQuantity { product: String },

    #[error("Insufficient stock for {name}")]
    InsufficientStock { name: String },

    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    #[error("Insufficient stock for variant {name}")]
    InsufficientVariantStock { name: String },

    #[error("Order already paid")]
    AlreadyPaid,

    #[error("Order already delivered")]
    AlreadyDelivered,

    #[error("Order already cancelled")]
    AlreadyCancelled,

    #[error("Order is cancelled")]
    OrderCancelled,

    #[error("Cannot deliver an unpaid order")]
    CannotDeliverUnpaidOrder,

    #[error("Cannot ship an unpaid order")]
    CannotShipUnpaidOrder,

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl OrderError {
    pub fn status(&self) -> StatusCode {
        match self {
            OrderError::AlreadyPaid
            | OrderError::AlreadyDelivered
            | OrderError::AlreadyCancelled
            | OrderError::OrderCancelled
            | OrderError::CannotDeliverUnpaidOrder
            | OrderError::CannotShipUnpaidOrder
            | OrderError::InvalidTransition { .. } => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable name, returned next to the human message.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::NoOrderItems => "NoOrderItems",
            OrderError::InvalidShippingAddress => "InvalidShippingAddress",
            OrderError::MissingProduct { .. } => "MissingProduct",
            OrderError::ProductNotFound(_) => "ProductNotFound",
            OrderError::InvalidQuantity { .. } => "InvalidQuantity",
            OrderError::InsufficientStock { .. } => "InsufficientStock",
            OrderError::VariantNotFound(_) => "VariantNotFound",
            OrderError::InsufficientVariantStock { .. } => "InsufficientVariantStock",
            OrderError::AlreadyPaid => "AlreadyPaid",
            OrderError::AlreadyDelivered => "AlreadyDelivered",
            OrderError::AlreadyCancelled => "AlreadyCancelled",
            OrderError::OrderCancelled => "OrderCancelled",
            OrderError::CannotDeliverUnpaidOrder => "CannotDeliverUnpaidOrder",
            OrderError::CannotShipUnpaidOrder => "CannotShipUnpaidOrder",
            OrderError::InvalidTransition { .. } => "InvalidTransition",
        }
    }

    pub fn product_not_found(id: impl ToString) -> Self {
        OrderError::ProductNotFound(id.to_string())
    }

    pub fn variant_not_found(id: impl ToString) -> Self {
        OrderError::VariantNotFound(id.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict {0}")]
    Conflict(String),

    #[error("{0}")]
    Order(#[from] OrderError),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Order(err) => err.status(),
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NotFound",
            AppError::BadRequest(_) => "ValidationError",
            AppError::Forbidden => "AuthorizationError",
            AppError::Conflict(_) => "ConflictError",
            AppError::Order(err) => err.code(),
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => "StorageError",
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                code: self.code(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}
