//! Checkout and the order lifecycle
//!
//! - [`CheckoutEngine`]: validates a cart against the live catalog, prices
//!   it and commits the order atomically
//! - [`OrderService`]: cancellation with stock restore, admin status
//!   changes, payment recording and order queries
//! - [`RetryPolicy`]: how transient commit failures are retried

pub mod engine;
pub mod lifecycle;
pub mod retry;

pub use engine::{CheckoutEngine, CheckoutRequest};
pub use lifecycle::OrderService;
pub use retry::{BackoffStrategy, RetryPolicy};
