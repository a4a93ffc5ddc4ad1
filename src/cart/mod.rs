//! Shopping cart operations and the priced cart summary

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::entity::CartLine;
use crate::core::error::ShopError;
use crate::core::pricing::{PriceBreakdown, PricingPolicy};
use crate::core::service::{CartStore, CatalogStore, ShopStore};

/// Body of `POST /cart/add`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
}

/// Body of `PUT /cart/{lineId}`; zero or less removes the line
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartLineRequest {
    pub quantity: i32,
}

/// One priced line of the cart summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub is_available: bool,
    pub available_stock: i32,
}

/// The cart as the shopper sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartItemView>,
    pub total_items: i32,
    #[serde(flatten)]
    pub totals: PriceBreakdown,
}

/// Cart operations for a single user at a time
pub struct CartService {
    store: Arc<dyn ShopStore>,
    pricing: Arc<PricingPolicy>,
}

impl CartService {
    pub fn new(store: Arc<dyn ShopStore>, pricing: Arc<PricingPolicy>) -> Self {
        Self { store, pricing }
    }

    /// Add `quantity` units of a product, merging with an existing line
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine, ShopError> {
        if quantity < 1 {
            return Err(ShopError::invalid("quantity", "must be at least 1"));
        }

        let product = match self.store.get_product(&product_id).await {
            Ok(product) => product,
            Err(ShopError::NotFound { .. }) => return Err(ShopError::unknown_product(product_id)),
            Err(e) => return Err(e),
        };
        let wanted = self
            .store
            .cart_lines(&user_id)
            .await?
            .iter()
            .filter(|line| line.product_id == product_id)
            .try_fold(quantity, |total, line| total.checked_add(line.quantity))
            .ok_or_else(ShopError::cart_quantity_overflow)?;
        product.ensure_available(wanted)?;

        let line = self
            .store
            .add_to_cart_line(&user_id, &product_id, quantity)
            .await?;
        tracing::debug!(user_id = %user_id, product_id = %product_id, quantity = line.quantity, "cart line added");
        Ok(line)
    }

    /// Set a line's quantity; `None` when a non-positive quantity removed it
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        line_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartLine>, ShopError> {
        let line = self
            .store
            .get_cart_line(&user_id, &line_id)
            .await?
            .ok_or(ShopError::NotFound {
                resource: "CartLine",
                id: line_id,
            })?;

        if quantity <= 0 {
            self.store.delete_cart_line(&user_id, &line_id).await?;
            return Ok(None);
        }

        let product = self.store.get_product(&line.product_id).await?;
        product.ensure_available(quantity)?;

        self.store
            .set_cart_line_quantity(&user_id, &line_id, quantity)
            .await
    }

    /// Remove a line, returning whether it existed
    pub async fn remove_item(&self, user_id: Uuid, line_id: Uuid) -> Result<bool, ShopError> {
        self.store.delete_cart_line(&user_id, &line_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<u64, ShopError> {
        let removed = self.store.clear_cart(&user_id).await?;
        tracing::debug!(user_id = %user_id, removed, "cart cleared");
        Ok(removed)
    }

    /// Priced view of the cart, using current catalog prices and stock
    pub async fn summary(&self, user_id: Uuid) -> Result<CartSummary, ShopError> {
        let lines = self.store.cart_lines(&user_id).await?;
        let mut items = Vec::with_capacity(lines.len());

        for line in lines {
            let product = match self.store.get_product(&line.product_id).await {
                Ok(product) => product,
                // Product removed from the catalog; the line cannot be priced
                Err(ShopError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            items.push(CartItemView {
                id: line.id,
                product_id: product.id,
                line_total: product.price * Decimal::from(line.quantity),
                is_available: product.can_fulfil(line.quantity),
                available_stock: product.stock_quantity,
                product_name: product.name,
                product_price: product.price,
                quantity: line.quantity,
            });
        }

        let totals = if items.is_empty() {
            PriceBreakdown {
                subtotal: Decimal::ZERO,
                shipping_cost: Decimal::ZERO,
                tax_amount: Decimal::ZERO,
                grand_total: Decimal::ZERO,
            }
        } else {
            self.pricing
                .quote_lines(items.iter().map(|item| (item.product_price, item.quantity)))
        };

        Ok(CartSummary {
            total_items: items.iter().map(|item| item.quantity).sum(),
            items,
            totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Product;
    use crate::storage::InMemoryStore;
    use rust_decimal_macros::dec;

    async fn service_with(products: &[Product]) -> (CartService, InMemoryStore) {
        let store = InMemoryStore::new();
        for product in products {
            store.upsert_product(product.clone()).await.unwrap();
        }
        let service = CartService::new(
            Arc::new(store.clone()),
            Arc::new(PricingPolicy::default()),
        );
        (service, store)
    }

    #[tokio::test]
    async fn test_add_counts_existing_quantity_against_stock() {
        let mug = Product::new("Mug", dec!(12), 5);
        let (cart, _) = service_with(std::slice::from_ref(&mug)).await;
        let user = Uuid::new_v4();

        cart.add_item(user, mug.id, 3).await.unwrap();
        let err = cart.add_item(user, mug.id, 3).await.unwrap_err();

        assert!(matches!(
            err,
            ShopError::InsufficientStock {
                requested: 6,
                available: 5,
                ..
            }
        ));
        let summary = cart.summary(user).await.unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity_and_inactive_product() {
        let retired = Product::new("Old Mug", dec!(12), 5).inactive();
        let (cart, _) = service_with(std::slice::from_ref(&retired)).await;
        let user = Uuid::new_v4();

        assert!(matches!(
            cart.add_item(user, retired.id, 0).await,
            Err(ShopError::Validation(_))
        ));
        assert!(matches!(
            cart.add_item(user, retired.id, 1).await,
            Err(ShopError::ProductUnavailable { ref product_name, .. }) if product_name == "Old Mug"
        ));
        assert!(matches!(
            cart.add_item(user, Uuid::new_v4(), 1).await,
            Err(ShopError::ProductUnavailable { ref product_name, .. }) if product_name == "unknown product"
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_quantity_that_overflows_line() {
        let mug = Product::new("Mug", dec!(12), 5);
        let (cart, _) = service_with(std::slice::from_ref(&mug)).await;
        let user = Uuid::new_v4();
        cart.add_item(user, mug.id, 1).await.unwrap();

        let err = cart.add_item(user, mug.id, i32::MAX).await.unwrap_err();

        assert!(matches!(err, ShopError::Validation(_)));
        let summary = cart.summary(user).await.unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_line() {
        let mug = Product::new("Mug", dec!(12), 5);
        let (cart, _) = service_with(std::slice::from_ref(&mug)).await;
        let user = Uuid::new_v4();
        let line = cart.add_item(user, mug.id, 2).await.unwrap();

        assert_eq!(
            cart.update_quantity(user, line.id, 4)
                .await
                .unwrap()
                .map(|l| l.quantity),
            Some(4)
        );
        assert!(matches!(
            cart.update_quantity(user, line.id, 6).await,
            Err(ShopError::InsufficientStock { .. })
        ));
        assert!(cart.update_quantity(user, line.id, 0).await.unwrap().is_none());
        assert!(cart.summary(user).await.unwrap().items.is_empty());
        assert!(matches!(
            cart.update_quantity(user, line.id, 1).await,
            Err(ShopError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_summary_prices_with_policy() {
        let shirt = Product::new("Shirt", dec!(40), 10);
        let socks = Product::new("Socks", dec!(10), 1);
        let (cart, store) = service_with(&[shirt.clone(), socks.clone()]).await;
        let user = Uuid::new_v4();
        cart.add_item(user, shirt.id, 2).await.unwrap();
        cart.add_item(user, socks.id, 1).await.unwrap();

        // Someone else buys the last pair of socks
        store
            .upsert_product(Product {
                stock_quantity: 0,
                ..socks.clone()
            })
            .await
            .unwrap();

        let summary = cart.summary(user).await.unwrap();
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.totals.subtotal, dec!(90));
        assert_eq!(summary.totals.shipping_cost, dec!(15));
        assert_eq!(summary.totals.tax_amount, dec!(16.20));
        assert_eq!(summary.totals.grand_total, dec!(121.20));

        let socks_view = summary
            .items
            .iter()
            .find(|item| item.product_id == socks.id)
            .unwrap();
        assert!(!socks_view.is_available);
        assert_eq!(socks_view.available_stock, 0);
    }

    #[tokio::test]
    async fn test_empty_summary_is_all_zero() {
        let (cart, _) = service_with(&[]).await;
        let summary = cart.summary(Uuid::new_v4()).await.unwrap();
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.totals.grand_total, Decimal::ZERO);
        assert_eq!(summary.totals.shipping_cost, Decimal::ZERO);
    }

    #[test]
    fn test_summary_serializes_flat_camel_case() {
        let summary = CartSummary {
            items: vec![],
            total_items: 0,
            totals: PricingPolicy::default().quote(dec!(10)),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("totalItems").is_some());
        assert!(json.get("shippingCost").is_some());
        assert!(json.get("grandTotal").is_some());
    }
}
