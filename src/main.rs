//! Storefront server binary
//!
//! Configuration comes from the YAML file named by `STOREFRONT_CONFIG`
//! (default `storefront.yaml`). Logging honours `RUST_LOG`.

use anyhow::{Context, Result};
use std::sync::Arc;
use storefront::config::StoreConfig;
use storefront::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront=info,tower_http=info")),
        )
        .init();

    let config = StoreConfig::load().context("failed to load configuration")?;
    let store = open_store(&config).await?;
    seed_catalog(store.as_ref(), &config).await?;

    let bind = config.server.bind.clone();
    ServerBuilder::new()
        .with_config(config)
        .with_shared_store(store)
        .serve(&bind)
        .await
}

#[cfg(feature = "postgres")]
async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ShopStore>> {
    if let Some(url) = &config.database.url {
        let store = PostgresStore::connect(url, config.database.max_connections).await?;
        store.migrate().await?;
        tracing::info!("using PostgreSQL storage");
        return Ok(Arc::new(store));
    }
    tracing::info!("no database url configured, using in-memory storage");
    Ok(Arc::new(InMemoryStore::new()))
}

#[cfg(not(feature = "postgres"))]
async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ShopStore>> {
    if config.database.url.is_some() {
        tracing::warn!("database.url is set but the postgres feature is disabled; using in-memory storage");
    }
    Ok(Arc::new(InMemoryStore::new()))
}

/// Insert the configured products when the catalog is empty
async fn seed_catalog(store: &dyn ShopStore, config: &StoreConfig) -> Result<()> {
    if config.catalog.is_empty() || !store.list_products().await?.is_empty() {
        return Ok(());
    }
    for product in config.seed_products() {
        tracing::info!(product_id = %product.id, name = %product.name, "seeding product");
        store.upsert_product(product).await?;
    }
    Ok(())
}
