//! PostgreSQL storage backend using sqlx.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! storefront = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! # Schema
//!
//! Tables are created by the migrations in `./migrations`, applied with
//! [`PostgresStore::migrate`]. Order numbers are unique by constraint
//! (`ux_orders_order_number`), and cart lines are unique per (user, product).
//!
//! # Concurrency
//!
//! Checkout and cancellation run in a single READ COMMITTED transaction.
//! Product rows are locked with `SELECT ... FOR UPDATE` in ascending id order
//! so two overlapping checkouts cannot deadlock on each other, and stock is
//! re-validated after the lock is held. Serialization failures, deadlocks
//! and lock timeouts surface as [`StorageError::Transient`] and are retried
//! by the checkout engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{PgConnection, Postgres, Transaction};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use uuid::Uuid;

use crate::core::entity::{CartLine, Order, OrderLine, OrderStatus, Product, User};
use crate::core::error::{ShopError, StorageError, UNKNOWN_PRODUCT};
use crate::core::service::{AccountStore, CartStore, CatalogStore, CheckoutPlan, OrderStore};

const BACKEND: &str = "PostgreSQL";

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// SQLSTATE codes worth retrying: serialization_failure, deadlock_detected,
/// lock_not_available
const TRANSIENT_CODES: &[&str] = &["40001", "40P01", "55P03"];

fn storage_error(context: &str, err: sqlx::Error) -> ShopError {
    let message = format!("{}: {}", context, err);
    let error = match &err {
        sqlx::Error::Database(db)
            if db
                .code()
                .is_some_and(|code| TRANSIENT_CODES.contains(&&*code)) =>
        {
            StorageError::Transient {
                backend: BACKEND,
                message,
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StorageError::Transient {
            backend: BACKEND,
            message,
        },
        sqlx::Error::PoolClosed => StorageError::Connection {
            backend: BACKEND,
            message,
        },
        _ => StorageError::Query {
            backend: BACKEND,
            message,
        },
    };
    error.into()
}

/// Name of the unique constraint an error violated, if any
fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

fn integrity(message: impl Into<String>) -> ShopError {
    StorageError::Integrity {
        message: message.into(),
    }
    .into()
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

const PRODUCT_COLUMNS: &str = "id, name, description, sku, price, stock_quantity, is_active, \
     category_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    sku: Option<String>,
    price: Decimal,
    stock_quantity: i32,
    is_active: bool,
    category_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            sku: row.sku,
            price: row.price,
            stock_quantity: row.stock_quantity,
            is_active: row.is_active,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CART_COLUMNS: &str = "id, user_id, product_id, quantity, added_at, updated_at";

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    added_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            added_at: row.added_at,
            updated_at: row.updated_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, created_at, updated_at, status, subtotal, \
     shipping_cost, tax_amount, grand_total, shipping_address, shipping_city, \
     shipping_postal_code, shipping_phone, payment_method, notes, paid_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    status: String,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax_amount: Decimal,
    grand_total: Decimal,
    shipping_address: String,
    shipping_city: String,
    shipping_postal_code: Option<String>,
    shipping_phone: Option<String>,
    payment_method: Option<String>,
    notes: Option<String>,
    paid_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, ShopError> {
        let status: OrderStatus = self.status.parse().map_err(|_| {
            integrity(format!(
                "order {} has unknown status '{}'",
                self.id, self.status
            ))
        })?;

        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            status,
            subtotal: self.subtotal,
            shipping_cost: self.shipping_cost,
            tax_amount: self.tax_amount,
            grand_total: self.grand_total,
            shipping_address: self.shipping_address,
            shipping_city: self.shipping_city,
            shipping_postal_code: self.shipping_postal_code,
            shipping_phone: self.shipping_phone,
            payment_method: self.payment_method,
            notes: self.notes,
            paid_at: self.paid_at,
            lines,
        })
    }
}

const ORDER_LINE_COLUMNS: &str =
    "id, order_id, product_id, product_name, product_sku, unit_price, quantity, line_total";

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    product_sku: Option<String>,
    unit_price: Decimal,
    quantity: i32,
    line_total: Decimal,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_sku: row.product_sku,
            unit_price: row.unit_price,
            quantity: row.quantity,
            line_total: row.line_total,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, roles, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            roles: row.roles,
            created_at: row.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// PostgresStore
// ---------------------------------------------------------------------------

/// Storage backend backed by PostgreSQL.
///
/// # Example
///
/// ```rust,ignore
/// use storefront::storage::PostgresStore;
///
/// let store = PostgresStore::connect("postgres://localhost/shop", 10).await?;
/// store.migrate().await?;
/// ```
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, ShopError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection {
                backend: BACKEND,
                message: e.to_string(),
            })?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled migrations (idempotent)
    pub async fn migrate(&self) -> Result<(), ShopError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Query {
                backend: BACKEND,
                message: format!("migration failed: {}", e),
            })?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, ShopError> {
        self.pool
            .begin()
            .await
            .map_err(|e| storage_error("failed to begin transaction", e))
    }

    /// Attach lines to a batch of order rows, preserving row order
    async fn hydrate_orders(
        conn: &mut PgConnection,
        rows: Vec<OrderRow>,
    ) -> Result<Vec<Order>, ShopError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let sql = format!(
            "SELECT {} FROM order_lines WHERE order_id = ANY($1) ORDER BY order_id, position",
            ORDER_LINE_COLUMNS
        );
        let line_rows = sqlx::query_as::<_, OrderLineRow>(&sql)
            .bind(&ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| storage_error("failed to load order lines", e))?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in line_rows {
            lines.entry(row.order_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let order_lines = lines.remove(&row.id).unwrap_or_default();
                row.into_order(order_lines)
            })
            .collect()
    }

    /// Lock an order row for update, scoped to `user_id` when given
    async fn lock_order(
        conn: &mut PgConnection,
        order_id: &Uuid,
        user_id: Option<&Uuid>,
    ) -> Result<Order, ShopError> {
        let sql = format!(
            "SELECT {} FROM orders WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2) FOR UPDATE",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .bind(user_id.copied())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| storage_error("failed to lock order", e))?
            .ok_or(ShopError::NotFound {
                resource: "Order",
                id: *order_id,
            })?;

        let mut orders = Self::hydrate_orders(conn, vec![row]).await?;
        orders
            .pop()
            .ok_or_else(|| integrity(format!("order {} vanished while locked", order_id)))
    }

    async fn write_order_state(conn: &mut PgConnection, order: &Order) -> Result<(), ShopError> {
        sqlx::query("UPDATE orders SET status = $2, paid_at = $3, updated_at = $4 WHERE id = $1")
            .bind(order.id)
            .bind(order.status.as_str())
            .bind(order.paid_at)
            .bind(order.updated_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| storage_error("failed to update order", e))?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn get_product(&self, id: &Uuid) -> Result<Product, ShopError> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("failed to get product", e))?
            .map(Product::from)
            .ok_or(ShopError::NotFound {
                resource: "Product",
                id: *id,
            })
    }

    async fn list_products(&self) -> Result<Vec<Product>, ShopError> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active ORDER BY name",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("failed to list products", e))?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn upsert_product(&self, product: Product) -> Result<Product, ShopError> {
        sqlx::query(
            "INSERT INTO products (id, name, description, sku, price, stock_quantity, is_active, \
                 category_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, \
                 description = EXCLUDED.description, sku = EXCLUDED.sku, price = EXCLUDED.price, \
                 stock_quantity = EXCLUDED.stock_quantity, is_active = EXCLUDED.is_active, \
                 category_id = EXCLUDED.category_id, updated_at = EXCLUDED.updated_at",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(product.is_active)
        .bind(product.category_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error("failed to upsert product", e))?;

        Ok(product)
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn cart_lines(&self, user_id: &Uuid) -> Result<Vec<CartLine>, ShopError> {
        let sql = format!(
            "SELECT {} FROM cart_lines WHERE user_id = $1 ORDER BY added_at, id",
            CART_COLUMNS
        );
        let rows = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("failed to load cart", e))?;
        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn get_cart_line(
        &self,
        user_id: &Uuid,
        line_id: &Uuid,
    ) -> Result<Option<CartLine>, ShopError> {
        let sql = format!(
            "SELECT {} FROM cart_lines WHERE id = $1 AND user_id = $2",
            CART_COLUMNS
        );
        let row = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(line_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("failed to get cart line", e))?;
        Ok(row.map(CartLine::from))
    }

    async fn add_to_cart_line(
        &self,
        user_id: &Uuid,
        product_id: &Uuid,
        quantity: i32,
    ) -> Result<CartLine, ShopError> {
        let line = CartLine::new(*user_id, *product_id, quantity);
        let sql = format!(
            "INSERT INTO cart_lines (id, user_id, product_id, quantity, added_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, product_id) DO UPDATE \
                 SET quantity = cart_lines.quantity + EXCLUDED.quantity, \
                     updated_at = EXCLUDED.added_at \
                 WHERE cart_lines.quantity <= {} - EXCLUDED.quantity \
             RETURNING {}",
            i32::MAX,
            CART_COLUMNS
        );
        // No row comes back when the merged quantity would overflow
        let row = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(line.id)
            .bind(line.user_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.added_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("failed to add cart line", e))?;
        row.map(CartLine::from)
            .ok_or_else(ShopError::cart_quantity_overflow)
    }

    async fn set_cart_line_quantity(
        &self,
        user_id: &Uuid,
        line_id: &Uuid,
        quantity: i32,
    ) -> Result<Option<CartLine>, ShopError> {
        let sql = format!(
            "UPDATE cart_lines SET quantity = $3, updated_at = $4 \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            CART_COLUMNS
        );
        let row = sqlx::query_as::<_, CartLineRow>(&sql)
            .bind(line_id)
            .bind(user_id)
            .bind(quantity)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("failed to update cart line", e))?;
        Ok(row.map(CartLine::from))
    }

    async fn delete_cart_line(&self, user_id: &Uuid, line_id: &Uuid) -> Result<bool, ShopError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE id = $1 AND user_id = $2")
            .bind(line_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("failed to delete cart line", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: &Uuid) -> Result<u64, ShopError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("failed to clear cart", e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<Order, ShopError> {
        let order = &plan.order;
        let mut tx = self.begin().await?;

        // BTreeMap keeps lock acquisition in ascending product id order
        let mut requested: BTreeMap<Uuid, i32> = BTreeMap::new();
        for line in &order.lines {
            *requested.entry(line.product_id).or_default() += line.quantity;
        }
        let ids: Vec<Uuid> = requested.keys().copied().collect();

        let sql = format!(
            "SELECT {} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            PRODUCT_COLUMNS
        );
        let locked: HashMap<Uuid, Product> = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| storage_error("failed to lock products", e))?
            .into_iter()
            .map(|row| (row.id, Product::from(row)))
            .collect();

        for (product_id, quantity) in &requested {
            match locked.get(product_id) {
                Some(product) => product.ensure_available(*quantity)?,
                None => {
                    let product_name = order
                        .lines
                        .iter()
                        .find(|line| &line.product_id == product_id)
                        .map(|line| line.product_name.clone())
                        .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());
                    return Err(ShopError::ProductUnavailable {
                        product_id: *product_id,
                        product_name,
                    });
                }
            }
        }

        let inserted = sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, created_at, updated_at, status, \
                 subtotal, shipping_cost, tax_amount, grand_total, shipping_address, \
                 shipping_city, shipping_postal_code, shipping_phone, payment_method, notes, paid_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.status.as_str())
        .bind(order.subtotal)
        .bind(order.shipping_cost)
        .bind(order.tax_amount)
        .bind(order.grand_total)
        .bind(&order.shipping_address)
        .bind(&order.shipping_city)
        .bind(&order.shipping_postal_code)
        .bind(&order.shipping_phone)
        .bind(&order.payment_method)
        .bind(&order.notes)
        .bind(order.paid_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            return Err(match unique_violation(&err).as_deref() {
                Some("ux_orders_order_number") => ShopError::Conflict {
                    message: format!("order number {} already exists", order.order_number),
                },
                _ => storage_error("failed to insert order", err),
            });
        }

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_lines (id, order_id, product_id, product_name, product_sku, \
                     unit_price, quantity, line_total, position) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(line.id)
            .bind(order.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(&line.product_sku)
            .bind(line.unit_price)
            .bind(line.quantity)
            .bind(line.line_total)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("failed to insert order line", e))?;
        }

        let now = Utc::now();
        for (product_id, quantity) in &requested {
            sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = $3 \
                 WHERE id = $1",
            )
            .bind(product_id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("failed to decrement stock", e))?;
        }

        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND id = ANY($2)")
            .bind(order.user_id)
            .bind(&plan.cart_line_ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("failed to clear converted cart lines", e))?;

        tx.commit()
            .await
            .map_err(|e| storage_error("failed to commit checkout", e))?;

        Ok(order.clone())
    }

    async fn cancel_order(&self, user_id: &Uuid, order_id: &Uuid) -> Result<Order, ShopError> {
        let mut tx = self.begin().await?;
        let now = Utc::now();

        let mut order = Self::lock_order(&mut tx, order_id, Some(user_id)).await?;
        order.apply_status(OrderStatus::Cancelled, now)?;
        Self::write_order_state(&mut tx, &order).await?;

        let mut restored: BTreeMap<Uuid, i32> = BTreeMap::new();
        for line in &order.lines {
            *restored.entry(line.product_id).or_default() += line.quantity;
        }
        for (product_id, quantity) in &restored {
            sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = $3 \
                 WHERE id = $1",
            )
            .bind(product_id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("failed to restore stock", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| storage_error("failed to commit cancellation", e))?;
        Ok(order)
    }

    async fn update_order_status(
        &self,
        order_id: &Uuid,
        next: OrderStatus,
    ) -> Result<Order, ShopError> {
        let mut tx = self.begin().await?;

        let mut order = Self::lock_order(&mut tx, order_id, None).await?;
        order.apply_status(next, Utc::now())?;
        Self::write_order_state(&mut tx, &order).await?;

        tx.commit()
            .await
            .map_err(|e| storage_error("failed to commit status change", e))?;
        Ok(order)
    }

    async fn mark_order_paid(
        &self,
        user_id: &Uuid,
        order_id: &Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Order, ShopError> {
        let mut tx = self.begin().await?;

        let mut order = Self::lock_order(&mut tx, order_id, Some(user_id)).await?;
        if order.record_payment(paid_at)? {
            Self::write_order_state(&mut tx, &order).await?;
        }

        tx.commit()
            .await
            .map_err(|e| storage_error("failed to commit payment", e))?;
        Ok(order)
    }

    async fn list_orders(&self, user_id: &Uuid) -> Result<Vec<Order>, ShopError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| storage_error("failed to acquire connection", e))?;

        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| storage_error("failed to list orders", e))?;

        Self::hydrate_orders(&mut conn, rows).await
    }

    async fn get_order(&self, order_id: &Uuid) -> Result<Option<Order>, ShopError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| storage_error("failed to acquire connection", e))?;

        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| storage_error("failed to get order", e))?;

        match row {
            Some(row) => Ok(Self::hydrate_orders(&mut conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn create_user(&self, user: User) -> Result<User, ShopError> {
        let inserted = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, roles, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.roles)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(user),
            Err(err) => Err(match unique_violation(&err).as_deref() {
                Some("ux_users_username") => ShopError::DuplicateAccount { field: "username" },
                Some("ux_users_email") => ShopError::DuplicateAccount { field: "email" },
                _ => storage_error("failed to create user", err),
            }),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ShopError> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("failed to find user", e))?;
        Ok(row.map(User::from))
    }

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>, ShopError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("failed to get user", e))?;
        Ok(row.map(User::from))
    }
}
