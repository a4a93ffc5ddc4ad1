//! Shared test harness for storage backend testing
//!
//! Provides seeding helpers and the `checkout_suite!` macro, which runs the
//! cart, checkout and cancellation contract against any [`ShopStore`].
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod store_harness;
//! use store_harness::*;
//!
//! checkout_suite!(InMemoryStore::new());
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod checkout_tests;

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use storefront::checkout::{CheckoutEngine, CheckoutRequest, RetryPolicy};
use storefront::core::entity::{Product, User};
use storefront::core::order_number::RandomOrderNumbers;
use storefront::core::pricing::PricingPolicy;
use storefront::core::service::{AccountStore, CatalogStore, ShopStore};
use uuid::Uuid;

/// Register a customer directly in the store and return its id
///
/// Backends with foreign keys need the user row before any cart line.
pub async fn seed_user<S: ShopStore>(store: &S, username: &str) -> Uuid {
    let user = User::new(
        username,
        format!("{}@example.com", username),
        "not-a-real-hash",
    );
    store.create_user(user).await.unwrap().id
}

pub async fn seed_product<S: ShopStore>(
    store: &S,
    name: &str,
    price: Decimal,
    stock: i32,
) -> Product {
    store
        .upsert_product(Product::new(name, price, stock))
        .await
        .unwrap()
}

pub async fn stock_of<S: ShopStore>(store: &S, product_id: &Uuid) -> i32 {
    store.get_product(product_id).await.unwrap().stock_quantity
}

/// A checkout engine over `store` with default pricing and a short backoff
pub fn engine_for(store: Arc<dyn ShopStore>) -> CheckoutEngine {
    CheckoutEngine::new(
        store,
        Arc::new(PricingPolicy::default()),
        Arc::new(RandomOrderNumbers::new()),
        RetryPolicy::new(3),
    )
}

pub fn shipping() -> CheckoutRequest {
    CheckoutRequest::new("12 Harbour Street", "Izmir").with_payment_method("card")
}

/// Keep `created_at` strictly increasing between consecutive orders
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}
