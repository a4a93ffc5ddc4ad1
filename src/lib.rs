//! # Storefront
//!
//! An e-commerce backend centred on the cart-to-order transition: stock is
//! re-validated against the live catalog, totals are priced by a single
//! [`PricingPolicy`](core::pricing::PricingPolicy), and the order, its line
//! snapshots, the stock decrement and the cart cleanup commit atomically.
//!
//! ## Features
//!
//! - **Checkout with inventory reconciliation**: all-or-nothing, retried on
//!   transient storage failures and order-number collisions
//! - **Order lifecycle**: cancellation with stock restore, admin status
//!   changes, payment recording
//! - **Pluggable storage**: in-memory (default) or PostgreSQL (`postgres`
//!   feature) behind the [`ShopStore`](core::service::ShopStore) traits
//! - **REST exposure**: axum routes with bearer sessions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use storefront::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = InMemoryStore::new();
//!     store.upsert_product(Product::new("Canvas Tote", dec!(19.90), 40)).await?;
//!
//!     ServerBuilder::new()
//!         .with_config(StoreConfig::load()?)
//!         .with_store(store)
//!         .serve("127.0.0.1:3000")
//!         .await
//! }
//! ```

pub mod accounts;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthContext, AuthPolicy},
        entity::{CartLine, Order, OrderLine, OrderStatus, Product, User},
        error::{ConfigError, ShopError, StorageError},
        order_number::{OrderNumberGenerator, RandomOrderNumbers},
        pricing::{PriceBreakdown, PricingPolicy},
        service::{AccountStore, CartStore, CatalogStore, CheckoutPlan, OrderStore, ShopStore},
    };

    // === Services ===
    pub use crate::accounts::{AccountService, LoginRequest, RegisterRequest};
    pub use crate::cart::{CartService, CartSummary};
    pub use crate::checkout::{CheckoutEngine, CheckoutRequest, OrderService, RetryPolicy};

    // === Storage ===
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresStore;

    // === Config ===
    pub use crate::config::StoreConfig;

    // === Server ===
    pub use crate::server::{RestExposure, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use rust_decimal::Decimal;
    pub use rust_decimal_macros::dec;
    pub use uuid::Uuid;
}
