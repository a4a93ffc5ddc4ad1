//! Order lifecycle after checkout: cancellation, status changes, payment

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::auth::{AuthContext, AuthPolicy};
use crate::core::entity::{Order, OrderStatus};
use crate::core::error::ShopError;
use crate::core::service::{OrderStore, ShopStore};

/// Operations on placed orders
///
/// Orders are only ever visible to their owner; someone else's order id
/// behaves exactly like an unknown one.
pub struct OrderService {
    store: Arc<dyn ShopStore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn ShopStore>) -> Self {
        Self { store }
    }

    /// Cancel one of the caller's orders and put its stock back
    pub async fn cancel(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, ShopError> {
        let order = self.store.cancel_order(&user_id, &order_id).await?;
        tracing::info!(
            user_id = %user_id,
            order_id = %order.id,
            order_number = %order.order_number,
            restored_items = order.total_items(),
            "order cancelled"
        );
        Ok(order)
    }

    /// Administrative move along the lifecycle
    ///
    /// Cancellation is not available here since it must restore stock; use
    /// [`cancel`](Self::cancel).
    pub async fn update_status(
        &self,
        actor: &AuthContext,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<Order, ShopError> {
        AuthPolicy::AdminOnly.enforce(actor)?;

        if next == OrderStatus::Cancelled {
            return Err(ShopError::invalid(
                "status",
                "orders are cancelled through the cancel operation",
            ));
        }

        let order = self.store.update_order_status(&order_id, next).await?;
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            status = %order.status,
            "order status updated"
        );
        Ok(order)
    }

    /// Mark one of the caller's orders as paid
    pub async fn record_payment(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, ShopError> {
        let order = self
            .store
            .mark_order_paid(&user_id, &order_id, Utc::now())
            .await?;
        tracing::info!(order_id = %order.id, paid_at = ?order.paid_at, "payment recorded");
        Ok(order)
    }

    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<Order>, ShopError> {
        self.store.list_orders(&user_id).await
    }

    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, ShopError> {
        self.store
            .get_order(&order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(ShopError::NotFound {
                resource: "Order",
                id: order_id,
            })
    }
}
