//! Cart endpoints; every mutation answers with the refreshed summary

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::cart::{AddToCartRequest, CartSummary, UpdateCartLineRequest};
use crate::core::error::ShopError;
use crate::core::extractors::{CurrentUser, ValidatedJson};
use crate::server::host::ServerHost;

pub async fn get_cart(
    State(host): State<ServerHost>,
    user: CurrentUser,
) -> Result<Json<CartSummary>, ShopError> {
    Ok(Json(host.cart.summary(user.user_id).await?))
}

pub async fn add_to_cart(
    State(host): State<ServerHost>,
    user: CurrentUser,
    ValidatedJson(request): ValidatedJson<AddToCartRequest>,
) -> Result<Json<CartSummary>, ShopError> {
    host.cart
        .add_item(user.user_id, request.product_id, request.quantity)
        .await?;
    Ok(Json(host.cart.summary(user.user_id).await?))
}

pub async fn update_cart_line(
    State(host): State<ServerHost>,
    user: CurrentUser,
    Path(line_id): Path<Uuid>,
    Json(request): Json<UpdateCartLineRequest>,
) -> Result<Json<CartSummary>, ShopError> {
    host.cart
        .update_quantity(user.user_id, line_id, request.quantity)
        .await?;
    Ok(Json(host.cart.summary(user.user_id).await?))
}

pub async fn remove_cart_line(
    State(host): State<ServerHost>,
    user: CurrentUser,
    Path(line_id): Path<Uuid>,
) -> Result<Json<CartSummary>, ShopError> {
    if !host.cart.remove_item(user.user_id, line_id).await? {
        return Err(ShopError::NotFound {
            resource: "CartLine",
            id: line_id,
        });
    }
    Ok(Json(host.cart.summary(user.user_id).await?))
}

pub async fn clear_cart(
    State(host): State<ServerHost>,
    user: CurrentUser,
) -> Result<Json<Value>, ShopError> {
    let removed = host.cart.clear(user.user_id).await?;
    Ok(Json(json!({
        "message": "Cart cleared",
        "removedItems": removed
    })))
}
