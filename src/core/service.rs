//! Storage traits for the catalog, carts, orders and accounts
//!
//! The services in [`crate::cart`], [`crate::checkout`] and
//! [`crate::accounts`] hold their logic; backends only persist. The one
//! exception is transactional work that must happen under a lock
//! ([`OrderStore::commit_checkout`], [`OrderStore::cancel_order`]), where the
//! backend applies the domain checks from [`crate::core::entity`] inside its
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::entity::{CartLine, Order, OrderStatus, Product, User};
use crate::core::error::ShopError;

/// Read access to products (plus seeding)
///
/// Reads must reflect the latest committed stock; implementations keep no
/// cache.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Get a product by ID, `NotFound` if absent
    async fn get_product(&self, id: &Uuid) -> Result<Product, ShopError>;

    /// List active products ordered by name
    async fn list_products(&self) -> Result<Vec<Product>, ShopError>;

    /// Insert or replace a product
    async fn upsert_product(&self, product: Product) -> Result<Product, ShopError>;
}

/// Per-user cart lines, unique per (user, product)
#[async_trait]
pub trait CartStore: Send + Sync {
    /// All lines of a user's cart, oldest first
    async fn cart_lines(&self, user_id: &Uuid) -> Result<Vec<CartLine>, ShopError>;

    /// A single line, `None` if absent or owned by someone else
    async fn get_cart_line(
        &self,
        user_id: &Uuid,
        line_id: &Uuid,
    ) -> Result<Option<CartLine>, ShopError>;

    /// Create the (user, product) line or add `quantity` to the existing one
    async fn add_to_cart_line(
        &self,
        user_id: &Uuid,
        product_id: &Uuid,
        quantity: i32,
    ) -> Result<CartLine, ShopError>;

    /// Overwrite a line's quantity, `None` if the line is gone
    async fn set_cart_line_quantity(
        &self,
        user_id: &Uuid,
        line_id: &Uuid,
        quantity: i32,
    ) -> Result<Option<CartLine>, ShopError>;

    /// Delete one line, returning whether it existed
    async fn delete_cart_line(&self, user_id: &Uuid, line_id: &Uuid) -> Result<bool, ShopError>;

    /// Delete every line of a user's cart, returning how many were removed
    async fn clear_cart(&self, user_id: &Uuid) -> Result<u64, ShopError>;
}

/// Everything needed to turn a validated cart into an order
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    /// The order to create, status `Pending`, with its snapshot lines
    pub order: Order,
    /// Cart lines converted into the order, deleted on commit
    pub cart_line_ids: Vec<Uuid>,
}

/// Orders and their lifecycle
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomically create the order and its lines, decrement stock for every
    /// line and delete the converted cart lines.
    ///
    /// Stock is re-checked under lock; a shortfall fails the whole commit
    /// with `InsufficientStock` or `ProductUnavailable`. A taken order number
    /// fails with `Conflict`. Nothing is written on failure.
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<Order, ShopError>;

    /// Atomically cancel an order owned by `user_id`, restoring stock for
    /// every line. `InvalidTransition` when the order can no longer be
    /// cancelled.
    async fn cancel_order(&self, user_id: &Uuid, order_id: &Uuid) -> Result<Order, ShopError>;

    /// Apply an administrative status change. Never touches stock.
    async fn update_order_status(
        &self,
        order_id: &Uuid,
        next: OrderStatus,
    ) -> Result<Order, ShopError>;

    /// Record the payment-received timestamp (first write wins)
    async fn mark_order_paid(
        &self,
        user_id: &Uuid,
        order_id: &Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Order, ShopError>;

    /// A user's orders, newest first
    async fn list_orders(&self, user_id: &Uuid) -> Result<Vec<Order>, ShopError>;

    /// An order with its lines, `None` if absent
    async fn get_order(&self, order_id: &Uuid) -> Result<Option<Order>, ShopError>;
}

/// Registered users
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a user; `DuplicateAccount` on a taken username or email
    async fn create_user(&self, user: User) -> Result<User, ShopError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ShopError>;

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>, ShopError>;
}

/// A complete storage backend
pub trait ShopStore: CatalogStore + CartStore + OrderStore + AccountStore {}

impl<T> ShopStore for T where T: CatalogStore + CartStore + OrderStore + AccountStore {}
