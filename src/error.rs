use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::response::Envelope;
use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure a request can end in.
///
/// Each variant maps to exactly one HTTP status; the `Display` text is the
/// message placed in the response envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Access denied. Insufficient permissions.")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("Category with this name already exists")]
    DuplicateCategory,

    #[error("Duplicate value for field 'sku': {0}")]
    DuplicateSku(String),

    #[error("Duplicate value for field '{field}': {value}")]
    DuplicateField { field: String, value: String },

    #[error("Invalid category ID")]
    InvalidCategory,

    #[error("Cannot delete category with existing products")]
    CategoryInUse,

    #[error("You have already rated this product")]
    AlreadyRated,

    #[error("No rating found for this product")]
    RatingNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Invalid role")]
    InvalidRole,

    #[error("{0}")]
    Validation(String),

    #[error("The resource was modified concurrently, retry the request")]
    Conflict,

    #[error("Internal Server Error")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field, value } if field == "sku" => ApiError::DuplicateSku(value),
            StoreError::Duplicate { field, value } if field == "email" => {
                log::debug!("duplicate email rejected by store: {}", value);
                ApiError::DuplicateEmail
            }
            StoreError::Duplicate { field, value } => ApiError::DuplicateField { field, value },
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::AccountDeactivated => StatusCode::FORBIDDEN,
            ApiError::UserNotFound
            | ApiError::ProductNotFound
            | ApiError::CategoryNotFound
            | ApiError::RatingNotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(detail) = self {
            log::error!("request failed: {}", detail);
        }
        HttpResponse::build(self.status_code()).json(Envelope::<()>::failure(self.to_string()))
    }
}
