//! Checkout and order endpoints

use axum::Json;
use axum::extract::{Path, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::checkout::CheckoutRequest;
use crate::core::entity::{Order, OrderStatus};
use crate::core::error::ShopError;
use crate::core::extractors::{CurrentUser, ValidatedJson};
use crate::server::host::ServerHost;

/// Response of `POST /order/create-from-cart`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn create_from_cart(
    State(host): State<ServerHost>,
    user: CurrentUser,
    ValidatedJson(request): ValidatedJson<CheckoutRequest>,
) -> Result<Json<OrderCreated>, ShopError> {
    let order = host.checkout.checkout(user.user_id, &request).await?;
    Ok(Json(OrderCreated {
        order_id: order.id,
        order_number: order.order_number,
        total_amount: order.grand_total,
    }))
}

pub async fn cancel_order(
    State(host): State<ServerHost>,
    user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Value>, ShopError> {
    let order = host.orders.cancel(user.user_id, order_id).await?;
    Ok(Json(json!({
        "message": "Order cancelled",
        "orderId": order.id
    })))
}

pub async fn list_orders(
    State(host): State<ServerHost>,
    user: CurrentUser,
) -> Result<Json<Vec<Order>>, ShopError> {
    Ok(Json(host.orders.list_orders(user.user_id).await?))
}

pub async fn get_order(
    State(host): State<ServerHost>,
    user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ShopError> {
    Ok(Json(host.orders.get_order(user.user_id, order_id).await?))
}

pub async fn update_order_status(
    State(host): State<ServerHost>,
    user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, ShopError> {
    let next: OrderStatus = request.status.parse()?;
    let order = host
        .orders
        .update_status(&user.context, order_id, next)
        .await?;
    Ok(Json(json!({
        "message": "Order status updated",
        "orderId": order.id,
        "newStatus": order.status
    })))
}

pub async fn pay_order(
    State(host): State<ServerHost>,
    user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ShopError> {
    Ok(Json(host.orders.record_payment(user.user_id, order_id).await?))
}
