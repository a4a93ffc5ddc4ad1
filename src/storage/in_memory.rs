//! In-memory storage backend for tests and development
//!
//! All state sits behind a single `RwLock`, so a checkout or cancellation
//! validates and mutates under one write guard and concurrent checkouts are
//! serialized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::core::entity::{CartLine, Order, OrderStatus, Product, User};
use crate::core::error::{ShopError, StorageError, UNKNOWN_PRODUCT};
use crate::core::service::{AccountStore, CartStore, CatalogStore, CheckoutPlan, OrderStore};

#[derive(Default)]
struct State {
    products: HashMap<Uuid, Product>,
    cart_lines: HashMap<Uuid, CartLine>,
    orders: HashMap<Uuid, Order>,
    order_numbers: HashSet<String>,
    users: HashMap<Uuid, User>,
}

/// In-memory storage backend
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, ShopError> {
        self.state
            .read()
            .map_err(|e| StorageError::poisoned(e).into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, ShopError> {
        self.state
            .write()
            .map_err(|e| StorageError::poisoned(e).into())
    }
}

fn order_not_found(id: &Uuid) -> ShopError {
    ShopError::NotFound {
        resource: "Order",
        id: *id,
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_product(&self, id: &Uuid) -> Result<Product, ShopError> {
        self.read()?
            .products
            .get(id)
            .cloned()
            .ok_or(ShopError::NotFound {
                resource: "Product",
                id: *id,
            })
    }

    async fn list_products(&self) -> Result<Vec<Product>, ShopError> {
        let state = self.read()?;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn upsert_product(&self, product: Product) -> Result<Product, ShopError> {
        self.write()?.products.insert(product.id, product.clone());
        Ok(product)
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn cart_lines(&self, user_id: &Uuid) -> Result<Vec<CartLine>, ShopError> {
        let state = self.read()?;
        let mut lines: Vec<CartLine> = state
            .cart_lines
            .values()
            .filter(|line| &line.user_id == user_id)
            .cloned()
            .collect();
        lines.sort_by_key(|line| line.added_at);
        Ok(lines)
    }

    async fn get_cart_line(
        &self,
        user_id: &Uuid,
        line_id: &Uuid,
    ) -> Result<Option<CartLine>, ShopError> {
        Ok(self
            .read()?
            .cart_lines
            .get(line_id)
            .filter(|line| &line.user_id == user_id)
            .cloned())
    }

    async fn add_to_cart_line(
        &self,
        user_id: &Uuid,
        product_id: &Uuid,
        quantity: i32,
    ) -> Result<CartLine, ShopError> {
        let mut state = self.write()?;

        let existing = state
            .cart_lines
            .values_mut()
            .find(|line| &line.user_id == user_id && &line.product_id == product_id);

        if let Some(line) = existing {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or_else(ShopError::cart_quantity_overflow)?;
            line.updated_at = Some(Utc::now());
            return Ok(line.clone());
        }

        let line = CartLine::new(*user_id, *product_id, quantity);
        state.cart_lines.insert(line.id, line.clone());
        Ok(line)
    }

    async fn set_cart_line_quantity(
        &self,
        user_id: &Uuid,
        line_id: &Uuid,
        quantity: i32,
    ) -> Result<Option<CartLine>, ShopError> {
        let mut state = self.write()?;
        Ok(state
            .cart_lines
            .get_mut(line_id)
            .filter(|line| &line.user_id == user_id)
            .map(|line| {
                line.quantity = quantity;
                line.updated_at = Some(Utc::now());
                line.clone()
            }))
    }

    async fn delete_cart_line(&self, user_id: &Uuid, line_id: &Uuid) -> Result<bool, ShopError> {
        let mut state = self.write()?;
        let owned = state
            .cart_lines
            .get(line_id)
            .is_some_and(|line| &line.user_id == user_id);
        if owned {
            state.cart_lines.remove(line_id);
        }
        Ok(owned)
    }

    async fn clear_cart(&self, user_id: &Uuid) -> Result<u64, ShopError> {
        let mut state = self.write()?;
        let before = state.cart_lines.len();
        state.cart_lines.retain(|_, line| &line.user_id != user_id);
        Ok((before - state.cart_lines.len()) as u64)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<Order, ShopError> {
        let mut state = self.write()?;
        let order = &plan.order;

        if state.order_numbers.contains(&order.order_number) {
            return Err(ShopError::Conflict {
                message: format!("order number {} already exists", order.order_number),
            });
        }

        // Validate every line before touching anything
        let mut requested: HashMap<Uuid, i32> = HashMap::new();
        for line in &order.lines {
            *requested.entry(line.product_id).or_default() += line.quantity;
        }
        for (product_id, quantity) in &requested {
            match state.products.get(product_id) {
                Some(product) => product.ensure_available(*quantity)?,
                None => {
                    let name = order
                        .lines
                        .iter()
                        .find(|line| &line.product_id == product_id)
                        .map(|line| line.product_name.clone())
                        .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());
                    return Err(ShopError::ProductUnavailable {
                        product_id: *product_id,
                        product_name: name,
                    });
                }
            }
        }

        let now = Utc::now();
        for (product_id, quantity) in &requested {
            if let Some(product) = state.products.get_mut(product_id) {
                product.stock_quantity -= quantity;
                product.updated_at = Some(now);
            }
        }
        for line_id in &plan.cart_line_ids {
            state.cart_lines.remove(line_id);
        }
        state.order_numbers.insert(order.order_number.clone());
        state.orders.insert(order.id, order.clone());

        Ok(order.clone())
    }

    async fn cancel_order(&self, user_id: &Uuid, order_id: &Uuid) -> Result<Order, ShopError> {
        let mut state = self.write()?;
        let now = Utc::now();

        let order = state
            .orders
            .get_mut(order_id)
            .filter(|order| &order.user_id == user_id)
            .ok_or_else(|| order_not_found(order_id))?;
        order.apply_status(OrderStatus::Cancelled, now)?;
        let cancelled = order.clone();

        for line in &cancelled.lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock_quantity += line.quantity;
                product.updated_at = Some(now);
            }
        }

        Ok(cancelled)
    }

    async fn update_order_status(
        &self,
        order_id: &Uuid,
        next: OrderStatus,
    ) -> Result<Order, ShopError> {
        let mut state = self.write()?;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| order_not_found(order_id))?;
        order.apply_status(next, Utc::now())?;
        Ok(order.clone())
    }

    async fn mark_order_paid(
        &self,
        user_id: &Uuid,
        order_id: &Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Order, ShopError> {
        let mut state = self.write()?;
        let order = state
            .orders
            .get_mut(order_id)
            .filter(|order| &order.user_id == user_id)
            .ok_or_else(|| order_not_found(order_id))?;
        order.record_payment(paid_at)?;
        Ok(order.clone())
    }

    async fn list_orders(&self, user_id: &Uuid) -> Result<Vec<Order>, ShopError> {
        let state = self.read()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| &order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn get_order(&self, order_id: &Uuid) -> Result<Option<Order>, ShopError> {
        Ok(self.read()?.orders.get(order_id).cloned())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn create_user(&self, user: User) -> Result<User, ShopError> {
        let mut state = self.write()?;
        for existing in state.users.values() {
            if existing.username.eq_ignore_ascii_case(&user.username) {
                return Err(ShopError::DuplicateAccount { field: "username" });
            }
            if existing.email.eq_ignore_ascii_case(&user.email) {
                return Err(ShopError::DuplicateAccount { field: "email" });
            }
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ShopError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>, ShopError> {
        Ok(self.read()?.users.get(id).cloned())
    }
}
