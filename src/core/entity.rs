//! Domain records: products, cart lines, orders and accounts
//!
//! Orders capture their lines by value. An [`OrderLine`] keeps the product
//! name, SKU and unit price as they were at checkout, so later catalog edits
//! never rewrite order history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::error::ShopError;

// =============================================================================
// Catalog
// =============================================================================

/// A sellable product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Create an active product with the given price and stock
    pub fn new(name: impl Into<String>, price: Decimal, stock_quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            sku: None,
            price,
            stock_quantity,
            is_active: true,
            category_id: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// True when the product is for sale and has at least `quantity` units
    pub fn can_fulfil(&self, quantity: i32) -> bool {
        self.is_active && self.stock_quantity >= quantity
    }

    /// Check that `quantity` units can be taken from this product
    pub fn ensure_available(&self, quantity: i32) -> Result<(), ShopError> {
        if !self.is_active {
            return Err(ShopError::ProductUnavailable {
                product_id: self.id,
                product_name: self.name.clone(),
            });
        }
        if self.stock_quantity < quantity {
            return Err(ShopError::InsufficientStock {
                product_id: self.id,
                product_name: self.name.clone(),
                requested: quantity,
                available: self.stock_quantity,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One (user, product, quantity) record of an item not yet ordered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartLine {
    pub fn new(user_id: Uuid, product_id: Uuid, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            quantity,
            added_at: Utc::now(),
            updated_at: None,
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order lifecycle status
///
/// ```text
/// Pending -> Confirmed -> Processing -> Shipped -> Delivered -> Returned
///    \          \
///     +----------+--> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Returned => "Returned",
        }
    }

    /// Orders may be cancelled until they enter processing
    pub fn can_be_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    /// Whether `next` is a legal successor of this status
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (*self, next) {
            (Pending, Confirmed)
            | (Confirmed, Processing)
            | (Processing, Shipped)
            | (Shipped, Delivered)
            | (Delivered, Returned) => true,
            (from, Cancelled) => from.can_be_cancelled(),
            _ => false,
        }
    }

    /// Validate a move to `next`, returning the new status
    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, ShopError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ShopError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;

    /// Case-insensitive parse of a status name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ShopError::invalid("status", format!("unknown order status '{}'", s)))
    }
}

/// Snapshot of a purchased product inside an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_sku: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

impl OrderLine {
    /// Capture `product` as it is right now
    pub fn snapshot(order_id: Uuid, product: &Product, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id: product.id,
            product_name: product.name.clone(),
            product_sku: product.sku.clone(),
            unit_price: product.price,
            quantity,
            line_total: product.price * Decimal::from(quantity),
        }
    }
}

/// A placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub shipping_address: String,
    pub shipping_city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Total number of units across all lines
    pub fn total_items(&self) -> i32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled()
    }

    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Move to `next` through the lifecycle graph
    pub fn apply_status(&mut self, next: OrderStatus, at: DateTime<Utc>) -> Result<(), ShopError> {
        self.status = self.status.transition(next)?;
        self.updated_at = Some(at);
        Ok(())
    }

    /// Record payment. Returns false when the order was already paid, in
    /// which case the original timestamp is kept.
    pub fn record_payment(&mut self, at: DateTime<Utc>) -> Result<bool, ShopError> {
        if self.is_paid() {
            return Ok(false);
        }
        if self.status == OrderStatus::Cancelled {
            return Err(ShopError::invalid(
                "status",
                "cancelled orders cannot be paid",
            ));
        }
        self.paid_at = Some(at);
        self.updated_at = Some(at);
        Ok(true)
    }
}

// =============================================================================
// Accounts
// =============================================================================

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_ADMIN: &str = "admin";

/// A registered shopper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            roles: vec![ROLE_CUSTOMER.to_string()],
            created_at: Utc::now(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_forward_lifecycle() {
        let delivered = OrderStatus::Pending
            .transition(OrderStatus::Confirmed)
            .and_then(|s| s.transition(OrderStatus::Processing))
            .and_then(|s| s.transition(OrderStatus::Shipped))
            .and_then(|s| s.transition(OrderStatus::Delivered))
            .unwrap();
        assert_eq!(delivered, OrderStatus::Delivered);
        assert!(delivered.can_transition_to(OrderStatus::Returned));
    }

    #[test]
    fn test_cancellation_window() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_skipping_states_is_rejected() {
        let err = OrderStatus::Pending
            .transition(OrderStatus::Shipped)
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Shipped
            }
        ));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Returned));
        assert!(!OrderStatus::Returned.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!(" Pending ".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_line_snapshot_is_by_value() {
        let mut product = Product::new("Wool Scarf", dec!(24.50), 10).with_sku("SCARF-01");
        let line = OrderLine::snapshot(Uuid::new_v4(), &product, 3);

        product.name = "Renamed Scarf".to_string();
        product.price = dec!(99.00);

        assert_eq!(line.product_name, "Wool Scarf");
        assert_eq!(line.unit_price, dec!(24.50));
        assert_eq!(line.line_total, dec!(73.50));
        assert_eq!(line.product_sku.as_deref(), Some("SCARF-01"));
    }

    #[test]
    fn test_ensure_available() {
        let product = Product::new("Cap", dec!(10), 2);
        assert!(product.ensure_available(2).is_ok());
        assert!(matches!(
            product.ensure_available(3),
            Err(ShopError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            })
        ));

        let retired = Product::new("Old Cap", dec!(10), 5).inactive();
        assert!(matches!(
            retired.ensure_available(1),
            Err(ShopError::ProductUnavailable { .. })
        ));
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::new("ayla", "ayla@example.com", "$argon2id$secret");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["roles"][0], "customer");
    }
}
