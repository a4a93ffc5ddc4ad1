//! Macro-generated contract suite for `ShopStore` backends.
//!
//! The `checkout_suite!` macro generates a test module that drives a backend
//! through the cart and checkout services: cart merging, checkout pricing and
//! inventory reconciliation, all-or-nothing failures, cancellation and
//! concurrent checkouts competing for the same stock.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod store_harness;
//!
//! use store_harness::*;
//! use storefront::storage::InMemoryStore;
//!
//! checkout_suite!(InMemoryStore::new());
//! ```

/// Generate the checkout conformance suite.
///
/// `$factory` must evaluate to a fresh, empty store implementing
/// `ShopStore + Clone + 'static`. It is re-evaluated for each test.
#[macro_export]
macro_rules! checkout_suite {
    ($factory:expr) => {
        mod checkout_contract_tests {
            use super::*;
            use rust_decimal_macros::dec;
            use std::collections::HashSet;
            use std::sync::Arc;
            use storefront::cart::CartService;
            use storefront::core::entity::OrderStatus;
            use storefront::core::error::ShopError;
            use storefront::core::pricing::PricingPolicy;
            use storefront::core::service::{CartStore, OrderStore, ShopStore};

            fn cart_for(store: Arc<dyn ShopStore>) -> CartService {
                CartService::new(store, Arc::new(PricingPolicy::default()))
            }

            // ==================================================================
            // Cart
            // ==================================================================

            #[tokio::test]
            async fn test_adding_same_product_merges_lines() {
                let store = $factory;
                let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
                let cart = cart_for(shared);
                let user = seed_user(&store, "merge").await;
                let mug = seed_product(&store, "Enamel Mug", dec!(12.50), 10).await;

                cart.add_item(user, mug.id, 2).await.unwrap();
                cart.add_item(user, mug.id, 3).await.unwrap();

                let lines = store.cart_lines(&user).await.unwrap();
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].quantity, 5);

                let summary = cart.summary(user).await.unwrap();
                assert_eq!(summary.total_items, 5);
                assert_eq!(summary.totals.subtotal, dec!(62.50));
            }

            #[tokio::test]
            async fn test_cart_add_beyond_stock_is_rejected() {
                let store = $factory;
                let cart = cart_for(Arc::new(store.clone()));
                let user = seed_user(&store, "greedy").await;
                let lamp = seed_product(&store, "Desk Lamp", dec!(45), 2).await;

                cart.add_item(user, lamp.id, 2).await.unwrap();
                let err = cart.add_item(user, lamp.id, 1).await.unwrap_err();

                assert!(matches!(
                    err,
                    ShopError::InsufficientStock {
                        requested: 3,
                        available: 2,
                        ..
                    }
                ));
                assert_eq!(store.cart_lines(&user).await.unwrap()[0].quantity, 2);
            }

            #[tokio::test]
            async fn test_cart_merge_beyond_i32_is_rejected() {
                let store = $factory;
                let cart = cart_for(Arc::new(store.clone()));
                let user = seed_user(&store, "hoarder").await;
                let pin = seed_product(&store, "Enamel Pin", dec!(3), 5).await;

                cart.add_item(user, pin.id, 1).await.unwrap();

                let err = cart.add_item(user, pin.id, i32::MAX).await.unwrap_err();
                assert!(matches!(err, ShopError::Validation(_)));

                let err = store
                    .add_to_cart_line(&user, &pin.id, i32::MAX)
                    .await
                    .unwrap_err();
                assert!(matches!(err, ShopError::Validation(_)));

                let lines = store.cart_lines(&user).await.unwrap();
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].quantity, 1);
            }

            // ==================================================================
            // Checkout
            // ==================================================================

            #[tokio::test]
            async fn test_checkout_prices_and_reconciles_inventory() {
                let store = $factory;
                let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
                let user = seed_user(&store, "buyer").await;
                let kettle = seed_product(&store, "Kettle", dec!(100), 5).await;
                cart_for(shared.clone()).add_item(user, kettle.id, 1).await.unwrap();

                let order = engine_for(shared).checkout(user, &shipping()).await.unwrap();

                assert_eq!(order.status, OrderStatus::Pending);
                assert!(order.order_number.starts_with("ORD-"));
                assert_eq!(order.subtotal, dec!(100));
                assert_eq!(order.shipping_cost, dec!(15));
                assert_eq!(order.tax_amount, dec!(18));
                assert_eq!(order.grand_total, dec!(133.00));
                assert_eq!(order.lines.len(), 1);
                assert_eq!(order.lines[0].product_name, "Kettle");
                assert_eq!(order.lines[0].unit_price, dec!(100));
                assert_eq!(order.payment_method.as_deref(), Some("card"));

                assert_eq!(stock_of(&store, &kettle.id).await, 4);
                assert!(store.cart_lines(&user).await.unwrap().is_empty());

                let stored = store.get_order(&order.id).await.unwrap().unwrap();
                assert_eq!(stored.grand_total, dec!(133));
                assert_eq!(stored.lines.len(), 1);
            }

            #[tokio::test]
            async fn test_free_shipping_over_threshold() {
                let store = $factory;
                let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
                let user = seed_user(&store, "bulk").await;
                let chair = seed_product(&store, "Chair", dec!(80), 5).await;
                cart_for(shared.clone()).add_item(user, chair.id, 2).await.unwrap();

                let order = engine_for(shared).checkout(user, &shipping()).await.unwrap();

                assert_eq!(order.shipping_cost, dec!(0));
                assert_eq!(order.grand_total, dec!(188.80));
            }

            #[tokio::test]
            async fn test_empty_cart_creates_nothing() {
                let store = $factory;
                let user = seed_user(&store, "empty").await;

                let err = engine_for(Arc::new(store.clone()))
                    .checkout(user, &shipping())
                    .await
                    .unwrap_err();

                assert!(matches!(err, ShopError::EmptyCart));
                assert!(store.list_orders(&user).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_shortfall_on_one_line_changes_nothing() {
                let store = $factory;
                let user = seed_user(&store, "short").await;
                let plenty = seed_product(&store, "Notebook", dec!(4), 50).await;
                let scarce = seed_product(&store, "Fountain Pen", dec!(30), 2).await;
                store.add_to_cart_line(&user, &plenty.id, 5).await.unwrap();
                store.add_to_cart_line(&user, &scarce.id, 3).await.unwrap();

                let err = engine_for(Arc::new(store.clone()))
                    .checkout(user, &shipping())
                    .await
                    .unwrap_err();

                assert!(matches!(
                    err,
                    ShopError::InsufficientStock {
                        requested: 3,
                        available: 2,
                        ..
                    }
                ));
                assert_eq!(stock_of(&store, &plenty.id).await, 50);
                assert_eq!(stock_of(&store, &scarce.id).await, 2);
                assert_eq!(store.cart_lines(&user).await.unwrap().len(), 2);
                assert!(store.list_orders(&user).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_missing_address_is_rejected_before_commit() {
                let store = $factory;
                let user = seed_user(&store, "nowhere").await;
                let mug = seed_product(&store, "Mug", dec!(9), 3).await;
                store.add_to_cart_line(&user, &mug.id, 1).await.unwrap();

                let request = storefront::checkout::CheckoutRequest::new("  ", "Izmir");
                let err = engine_for(Arc::new(store.clone()))
                    .checkout(user, &request)
                    .await
                    .unwrap_err();

                assert!(matches!(err, ShopError::ShippingAddressRequired));
                assert_eq!(stock_of(&store, &mug.id).await, 3);
            }

            // ==================================================================
            // Cancellation
            // ==================================================================

            #[tokio::test]
            async fn test_cancel_pending_restores_stock() {
                let store = $factory;
                let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
                let user = seed_user(&store, "regret").await;
                let rug = seed_product(&store, "Rug", dec!(60), 4).await;
                store.add_to_cart_line(&user, &rug.id, 3).await.unwrap();
                let order = engine_for(shared).checkout(user, &shipping()).await.unwrap();
                assert_eq!(stock_of(&store, &rug.id).await, 1);

                let cancelled = store.cancel_order(&user, &order.id).await.unwrap();

                assert_eq!(cancelled.status, OrderStatus::Cancelled);
                assert_eq!(stock_of(&store, &rug.id).await, 4);

                let again = store.cancel_order(&user, &order.id).await.unwrap_err();
                assert!(matches!(again, ShopError::InvalidTransition { .. }));
                assert_eq!(stock_of(&store, &rug.id).await, 4);
            }

            #[tokio::test]
            async fn test_cancel_shipped_is_rejected() {
                let store = $factory;
                let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
                let user = seed_user(&store, "late").await;
                let vase = seed_product(&store, "Vase", dec!(25), 2).await;
                store.add_to_cart_line(&user, &vase.id, 1).await.unwrap();
                let order = engine_for(shared).checkout(user, &shipping()).await.unwrap();

                for status in [
                    OrderStatus::Confirmed,
                    OrderStatus::Processing,
                    OrderStatus::Shipped,
                ] {
                    store.update_order_status(&order.id, status).await.unwrap();
                }

                let err = store.cancel_order(&user, &order.id).await.unwrap_err();

                assert!(matches!(
                    err,
                    ShopError::InvalidTransition {
                        from: OrderStatus::Shipped,
                        to: OrderStatus::Cancelled
                    }
                ));
                assert_eq!(stock_of(&store, &vase.id).await, 1);
                let stored = store.get_order(&order.id).await.unwrap().unwrap();
                assert_eq!(stored.status, OrderStatus::Shipped);
            }

            #[tokio::test]
            async fn test_cancel_other_users_order_is_not_found() {
                let store = $factory;
                let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
                let owner = seed_user(&store, "owner").await;
                let stranger = seed_user(&store, "stranger").await;
                let lamp = seed_product(&store, "Lamp", dec!(20), 2).await;
                store.add_to_cart_line(&owner, &lamp.id, 1).await.unwrap();
                let order = engine_for(shared).checkout(owner, &shipping()).await.unwrap();

                let err = store.cancel_order(&stranger, &order.id).await.unwrap_err();

                assert!(matches!(err, ShopError::NotFound { .. }));
                assert_eq!(stock_of(&store, &lamp.id).await, 1);
            }

            // ==================================================================
            // Listing
            // ==================================================================

            #[tokio::test]
            async fn test_orders_listed_newest_first() {
                let store = $factory;
                let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
                let engine = engine_for(shared);
                let user = seed_user(&store, "regular").await;
                let tea = seed_product(&store, "Tea", dec!(7), 10).await;

                store.add_to_cart_line(&user, &tea.id, 1).await.unwrap();
                let first = engine.checkout(user, &shipping()).await.unwrap();
                tick().await;
                store.add_to_cart_line(&user, &tea.id, 2).await.unwrap();
                let second = engine.checkout(user, &shipping()).await.unwrap();

                let orders = store.list_orders(&user).await.unwrap();
                let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
                assert_eq!(ids, vec![second.id, first.id]);
                assert_eq!(orders[0].lines[0].quantity, 2);
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
            async fn test_last_unit_is_sold_once() {
                let store = $factory;
                let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
                let engine = Arc::new(engine_for(shared));
                let camera = seed_product(&store, "Camera", dec!(300), 1).await;

                let mut buyers = Vec::new();
                for name in ["first", "second"] {
                    let user = seed_user(&store, name).await;
                    store.add_to_cart_line(&user, &camera.id, 1).await.unwrap();
                    buyers.push(user);
                }

                let handles: Vec<_> = buyers
                    .iter()
                    .map(|user| {
                        let engine = engine.clone();
                        let user = *user;
                        tokio::spawn(async move { engine.checkout(user, &shipping()).await })
                    })
                    .collect();

                let mut placed = 0;
                let mut short = 0;
                for handle in handles {
                    match handle.await.unwrap() {
                        Ok(_) => placed += 1,
                        Err(ShopError::InsufficientStock { .. }) => short += 1,
                        Err(other) => panic!("unexpected checkout error: {:?}", other),
                    }
                }

                assert_eq!((placed, short), (1, 1));
                assert_eq!(stock_of(&store, &camera.id).await, 0);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
            async fn test_concurrent_checkouts_get_distinct_numbers() {
                let store = $factory;
                let shared: Arc<dyn ShopStore> = Arc::new(store.clone());
                let engine = Arc::new(engine_for(shared));
                let soap = seed_product(&store, "Soap", dec!(3), 100).await;

                let mut handles = Vec::new();
                for i in 0..6 {
                    let user = seed_user(&store, &format!("crowd{}", i)).await;
                    store.add_to_cart_line(&user, &soap.id, 2).await.unwrap();
                    let engine = engine.clone();
                    handles.push(tokio::spawn(async move {
                        engine.checkout(user, &shipping()).await
                    }));
                }

                let mut numbers = HashSet::new();
                for handle in handles {
                    let order = handle.await.unwrap().unwrap();
                    numbers.insert(order.order_number);
                }

                assert_eq!(numbers.len(), 6);
                assert_eq!(stock_of(&store, &soap.id).await, 88);
            }
        }
    };
}
