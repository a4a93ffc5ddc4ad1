//! Product listing

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::core::entity::Product;
use crate::core::error::ShopError;
use crate::core::service::CatalogStore;
use crate::server::host::ServerHost;

pub async fn list_products(
    State(host): State<ServerHost>,
) -> Result<Json<Vec<Product>>, ShopError> {
    Ok(Json(host.store.list_products().await?))
}

/// Inactive products are hidden like missing ones
pub async fn get_product(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ShopError> {
    let product = host.store.get_product(&id).await?;
    if !product.is_active {
        return Err(ShopError::NotFound {
            resource: "Product",
            id,
        });
    }
    Ok(Json(product))
}
