//! Typed error handling for the storefront
//!
//! Every service in the crate returns [`ShopError`], so callers can match on
//! the specific failure (an empty cart, a product that ran out of stock, an
//! order that can no longer be cancelled) instead of inspecting strings.
//!
//! # Error Categories
//!
//! - Domain rejections: [`ShopError::NotFound`], [`ShopError::InsufficientStock`],
//!   [`ShopError::ProductUnavailable`], [`ShopError::EmptyCart`],
//!   [`ShopError::ShippingAddressRequired`], [`ShopError::InvalidTransition`]
//! - Request problems: [`ShopError::Validation`], [`ShopError::Unauthorized`],
//!   [`ShopError::Forbidden`], [`ShopError::DuplicateAccount`]
//! - Infrastructure: [`StorageError`], [`ConfigError`], [`ShopError::Internal`]
//!
//! # Example
//!
//! ```rust,ignore
//! match engine.checkout(user_id, request).await {
//!     Ok(order) => println!("placed {}", order.order_number),
//!     Err(ShopError::InsufficientStock { product_name, available, .. }) => {
//!         println!("only {} left of {}", available, product_name);
//!     }
//!     Err(e) => eprintln!("checkout failed: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::core::entity::OrderStatus;

/// Name reported for a product that no longer exists in the catalog
pub const UNKNOWN_PRODUCT: &str = "unknown product";

/// The main error type for the storefront
#[derive(Debug, Error)]
pub enum ShopError {
    /// Referenced entity is absent (or belongs to another user)
    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: &'static str, id: Uuid },

    /// Requested quantity exceeds the current stock of a product
    #[error(
        "Insufficient stock for {product_name}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: Uuid,
        product_name: String,
        requested: i32,
        available: i32,
    },

    /// Product exists but is not for sale (inactive or removed)
    #[error("Product {product_name} is not available")]
    ProductUnavailable {
        product_id: Uuid,
        product_name: String,
    },

    /// Checkout was attempted with no cart lines
    #[error("Cart is empty")]
    EmptyCart,

    /// Checkout was attempted without a shipping address
    #[error("Shipping address is required")]
    ShippingAddressRequired,

    /// Illegal order status change
    #[error("Order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Uniqueness collision (order number). Retried internally by checkout.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Request payload failed validation
    #[error("Validation failed: {}", format_field_errors(.0))]
    Validation(Vec<FieldValidationError>),

    /// Missing or invalid bearer credential
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Authenticated, but not allowed to perform the operation
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Username or email already registered
    #[error("An account with this {field} already exists")]
    DuplicateAccount { field: &'static str },

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single field validation error
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn format_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ShopError {
    /// Shorthand for a single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ShopError::Validation(vec![FieldValidationError {
            field: field.into(),
            message: message.into(),
        }])
    }

    /// A product that could not be found while being put in a cart or order
    pub fn unknown_product(product_id: Uuid) -> Self {
        ShopError::ProductUnavailable {
            product_id,
            product_name: UNKNOWN_PRODUCT.to_string(),
        }
    }

    /// A cart line whose merged quantity no longer fits in an `i32`
    pub fn cart_quantity_overflow() -> Self {
        ShopError::invalid("quantity", "cart quantity is too large")
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ShopError::NotFound { .. } => StatusCode::NOT_FOUND,
            ShopError::InsufficientStock { .. }
            | ShopError::ProductUnavailable { .. }
            | ShopError::EmptyCart
            | ShopError::ShippingAddressRequired
            | ShopError::InvalidTransition { .. }
            | ShopError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopError::Conflict { .. } | ShopError::DuplicateAccount { .. } => StatusCode::CONFLICT,
            ShopError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ShopError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ShopError::Storage(e) => e.status_code(),
            ShopError::Config(_) | ShopError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ShopError::NotFound { .. } => "NOT_FOUND",
            ShopError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            ShopError::ProductUnavailable { .. } => "PRODUCT_UNAVAILABLE",
            ShopError::EmptyCart => "EMPTY_CART",
            ShopError::ShippingAddressRequired => "SHIPPING_ADDRESS_REQUIRED",
            ShopError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ShopError::Conflict { .. } => "CONFLICT",
            ShopError::Validation(_) => "VALIDATION_ERROR",
            ShopError::Unauthorized { .. } => "UNAUTHORIZED",
            ShopError::Forbidden { .. } => "FORBIDDEN",
            ShopError::DuplicateAccount { .. } => "DUPLICATE_ACCOUNT",
            ShopError::Storage(_) => "STORAGE_ERROR",
            ShopError::Config(_) => "CONFIG_ERROR",
            ShopError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the operation that produced this error may succeed if re-run
    ///
    /// Only transient storage failures and order-number collisions qualify;
    /// validation failures are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ShopError::Conflict { .. } => true,
            ShopError::Storage(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    /// Get additional details for the error
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ShopError::NotFound { resource, id } => Some(serde_json::json!({
                "resource": resource,
                "id": id.to_string()
            })),
            ShopError::InsufficientStock {
                product_id,
                product_name,
                requested,
                available,
            } => Some(serde_json::json!({
                "productId": product_id.to_string(),
                "productName": product_name,
                "requested": requested,
                "available": available
            })),
            ShopError::ProductUnavailable {
                product_id,
                product_name,
            } => Some(serde_json::json!({
                "productId": product_id.to_string(),
                "productName": product_name
            })),
            ShopError::InvalidTransition { from, to } => Some(serde_json::json!({
                "from": from.as_str(),
                "to": to.as_str()
            })),
            ShopError::Validation(errors) => Some(serde_json::json!({ "fields": errors })),
            _ => None,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failure that may succeed on retry (deadlock, serialization failure, lock timeout)
    #[error("Transient {backend} failure: {message}")]
    Transient {
        backend: &'static str,
        message: String,
    },

    /// Connection error
    #[error("Failed to connect to {backend}: {message}")]
    Connection {
        backend: &'static str,
        message: String,
    },

    /// Query execution error
    #[error("{backend} query error: {message}")]
    Query {
        backend: &'static str,
        message: String,
    },

    /// Data integrity error (a stored row violates a domain invariant)
    #[error("Data integrity error: {message}")]
    Integrity { message: String },

    /// Retries were exhausted
    #[error("{operation} gave up after {attempts} attempts: {message}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        message: String,
    },
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::Transient { .. } | StorageError::RetriesExhausted { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error for a poisoned in-process lock
    pub fn poisoned(what: impl std::fmt::Display) -> Self {
        StorageError::Integrity {
            message: format!("lock poisoned: {}", what),
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration file
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("IO error: {message}")]
    IoError { message: String },
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldValidationError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ShopError::Validation(fields)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError {
            message: err.to_string(),
        }
    }
}
