//! Cart-to-order conversion with inventory reconciliation

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::retry::RetryPolicy;
use crate::core::entity::{CartLine, Order, OrderLine, OrderStatus};
use crate::core::error::{ShopError, StorageError};
use crate::core::order_number::OrderNumberGenerator;
use crate::core::pricing::PricingPolicy;
use crate::core::service::{CartStore, CatalogStore, CheckoutPlan, OrderStore, ShopStore};

/// Shipping and payment details supplied at checkout
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub shipping_address: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub shipping_city: String,

    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub payment_method: Option<String>,

    #[validate(length(max = 20, message = "must be at most 20 characters"))]
    pub shipping_postal_code: Option<String>,

    #[validate(length(max = 20, message = "must be at most 20 characters"))]
    pub shipping_phone: Option<String>,

    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    pub fn new(shipping_address: impl Into<String>, shipping_city: impl Into<String>) -> Self {
        Self {
            shipping_address: shipping_address.into(),
            shipping_city: shipping_city.into(),
            ..Self::default()
        }
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }
}

/// Stored when the shopper leaves the city blank
pub const DEFAULT_SHIPPING_CITY: &str = "Not specified";
/// Stored when the shopper picks no payment method
pub const DEFAULT_PAYMENT_METHOD: &str = "Cash on Delivery";

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Turns a user's cart into a `Pending` order
///
/// Validation (empty cart, missing address, availability, stock) happens
/// before anything is written. The write itself is a single
/// [`OrderStore::commit_checkout`](crate::core::service::OrderStore::commit_checkout)
/// call, which re-checks stock under lock. Transient storage failures and
/// order-number collisions are retried according to the [`RetryPolicy`],
/// re-reading the cart and catalog on every attempt.
pub struct CheckoutEngine {
    store: Arc<dyn ShopStore>,
    pricing: Arc<PricingPolicy>,
    order_numbers: Arc<dyn OrderNumberGenerator>,
    retry: RetryPolicy,
}

impl CheckoutEngine {
    pub fn new(
        store: Arc<dyn ShopStore>,
        pricing: Arc<PricingPolicy>,
        order_numbers: Arc<dyn OrderNumberGenerator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            pricing,
            order_numbers,
            retry,
        }
    }

    /// Convert the cart of `user_id` into an order
    pub async fn checkout(
        &self,
        user_id: Uuid,
        request: &CheckoutRequest,
    ) -> Result<Order, ShopError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_checkout(user_id, request).await {
                Ok(order) => {
                    tracing::info!(
                        user_id = %user_id,
                        order_id = %order.id,
                        order_number = %order.order_number,
                        grand_total = %order.grand_total,
                        attempt,
                        "checkout committed"
                    );
                    return Ok(order);
                }
                Err(err) if self.retry.should_retry(&err, attempt) => {
                    let delay = self.retry.backoff.delay_for_retry(attempt);
                    tracing::warn!(
                        user_id = %user_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "checkout attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_retryable() => {
                    tracing::error!(user_id = %user_id, attempt, error = %err, "checkout retries exhausted");
                    return Err(StorageError::RetriesExhausted {
                        operation: "checkout",
                        attempts: attempt,
                        message: err.to_string(),
                    }
                    .into());
                }
                Err(err) => {
                    tracing::debug!(user_id = %user_id, error = %err, "checkout rejected");
                    return Err(err);
                }
            }
        }
    }

    async fn try_checkout(
        &self,
        user_id: Uuid,
        request: &CheckoutRequest,
    ) -> Result<Order, ShopError> {
        let cart = self.store.cart_lines(&user_id).await?;
        if cart.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        if request.shipping_address.trim().is_empty() {
            return Err(ShopError::ShippingAddressRequired);
        }

        let plan = self.plan(user_id, request, &cart).await?;
        self.store.commit_checkout(&plan).await
    }

    /// Validate every line against the live catalog and price the order
    async fn plan(
        &self,
        user_id: Uuid,
        request: &CheckoutRequest,
        cart: &[CartLine],
    ) -> Result<CheckoutPlan, ShopError> {
        let order_id = Uuid::new_v4();
        let mut lines = Vec::with_capacity(cart.len());

        for cart_line in cart {
            let product = match self.store.get_product(&cart_line.product_id).await {
                Ok(product) => product,
                Err(ShopError::NotFound { .. }) => {
                    return Err(ShopError::unknown_product(cart_line.product_id));
                }
                Err(e) => return Err(e),
            };
            product.ensure_available(cart_line.quantity)?;
            lines.push(OrderLine::snapshot(order_id, &product, cart_line.quantity));
        }

        let totals = self
            .pricing
            .quote_lines(lines.iter().map(|line| (line.unit_price, line.quantity)));

        let order = Order {
            id: order_id,
            order_number: self.order_numbers.next_number(),
            user_id,
            created_at: Utc::now(),
            updated_at: None,
            status: OrderStatus::Pending,
            subtotal: totals.subtotal,
            shipping_cost: totals.shipping_cost,
            tax_amount: totals.tax_amount,
            grand_total: totals.grand_total,
            shipping_address: request.shipping_address.trim().to_string(),
            shipping_city: match request.shipping_city.trim() {
                "" => DEFAULT_SHIPPING_CITY.to_string(),
                city => city.to_string(),
            },
            shipping_postal_code: non_blank(&request.shipping_postal_code),
            shipping_phone: non_blank(&request.shipping_phone),
            payment_method: Some(
                non_blank(&request.payment_method)
                    .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            ),
            notes: non_blank(&request.notes),
            paid_at: None,
            lines,
        };

        Ok(CheckoutPlan {
            order,
            cart_line_ids: cart.iter().map(|line| line.id).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Product;
    use crate::core::order_number::RandomOrderNumbers;
    use crate::storage::InMemoryStore;
    use rust_decimal_macros::dec;

    fn engine(store: &InMemoryStore) -> CheckoutEngine {
        CheckoutEngine::new(
            Arc::new(store.clone()),
            Arc::new(PricingPolicy::default()),
            Arc::new(RandomOrderNumbers::new()),
            RetryPolicy::none(),
        )
    }

    #[tokio::test]
    async fn test_checkout_prices_and_clears_cart() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let book = store
            .upsert_product(Product::new("Field Notes", dec!(25), 10))
            .await
            .unwrap();
        store.add_to_cart_line(&user, &book.id, 4).await.unwrap();

        let order = engine(&store)
            .checkout(
                user,
                &CheckoutRequest::new("4 Harbour Road", "Bodrum").with_payment_method("card"),
            )
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, dec!(100));
        assert_eq!(order.shipping_cost, dec!(15));
        assert_eq!(order.tax_amount, dec!(18.00));
        assert_eq!(order.grand_total, dec!(133.00));
        assert_eq!(order.payment_method.as_deref(), Some("card"));
        assert_eq!(order.lines.len(), 1);

        assert_eq!(store.get_product(&book.id).await.unwrap().stock_quantity, 6);
        assert!(store.cart_lines(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_is_checked_before_address() {
        let store = InMemoryStore::new();
        let err = engine(&store)
            .checkout(Uuid::new_v4(), &CheckoutRequest::new("", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::EmptyCart));
    }

    #[tokio::test]
    async fn test_blank_address_is_rejected() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let product = store
            .upsert_product(Product::new("Pen", dec!(3), 5))
            .await
            .unwrap();
        store.add_to_cart_line(&user, &product.id, 1).await.unwrap();

        let err = engine(&store)
            .checkout(user, &CheckoutRequest::new("   ", "Ankara"))
            .await
            .unwrap_err();

        assert!(matches!(err, ShopError::ShippingAddressRequired));
        assert_eq!(store.cart_lines(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_product_fails_whole_checkout() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let live = store
            .upsert_product(Product::new("Pen", dec!(3), 5))
            .await
            .unwrap();
        let retired = store
            .upsert_product(Product::new("Quill", dec!(9), 5))
            .await
            .unwrap();
        store.add_to_cart_line(&user, &live.id, 1).await.unwrap();
        store.add_to_cart_line(&user, &retired.id, 1).await.unwrap();
        store.upsert_product(retired.clone().inactive()).await.unwrap();

        let err = engine(&store)
            .checkout(user, &CheckoutRequest::new("1 Main St", "Ankara"))
            .await
            .unwrap_err();

        assert!(matches!(err, ShopError::ProductUnavailable { .. }));
        assert_eq!(store.get_product(&live.id).await.unwrap().stock_quantity, 5);
        assert!(store.list_orders(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_optional_fields_are_normalised() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let product = store
            .upsert_product(Product::new("Pen", dec!(3), 5))
            .await
            .unwrap();
        store.add_to_cart_line(&user, &product.id, 1).await.unwrap();

        let request = CheckoutRequest {
            shipping_phone: Some("  ".into()),
            notes: Some(" leave at door ".into()),
            ..CheckoutRequest::new(" 1 Main St ", "Ankara")
        };
        let order = engine(&store).checkout(user, &request).await.unwrap();

        assert_eq!(order.shipping_address, "1 Main St");
        assert_eq!(order.shipping_phone, None);
        assert_eq!(order.notes.as_deref(), Some("leave at door"));
    }

    #[tokio::test]
    async fn test_blank_city_and_payment_get_defaults() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let product = store
            .upsert_product(Product::new("Pen", dec!(3), 5))
            .await
            .unwrap();
        store.add_to_cart_line(&user, &product.id, 1).await.unwrap();

        let request = CheckoutRequest {
            payment_method: Some(" ".into()),
            ..CheckoutRequest::new("1 Main St", "  ")
        };
        let order = engine(&store).checkout(user, &request).await.unwrap();

        assert_eq!(order.shipping_city, "Not specified");
        assert_eq!(order.payment_method.as_deref(), Some("Cash on Delivery"));
    }

    #[tokio::test]
    async fn test_deleted_product_is_reported_by_readable_name() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let ghost = Uuid::new_v4();
        store.add_to_cart_line(&user, &ghost, 1).await.unwrap();

        let err = engine(&store)
            .checkout(user, &CheckoutRequest::new("1 Main St", "Ankara"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShopError::ProductUnavailable { product_id, ref product_name }
                if product_id == ghost && product_name == "unknown product"
        ));
        assert_eq!(store.cart_lines(&user).await.unwrap().len(), 1);
    }
}
