//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::host::ServerHost;
use crate::config::StoreConfig;
use crate::core::order_number::{OrderNumberGenerator, RandomOrderNumbers};
use crate::core::service::ShopStore;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the storefront HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(StoreConfig::load()?)
///     .with_store(InMemoryStore::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: StoreConfig,
    store: Option<Arc<dyn ShopStore>>,
    order_numbers: Option<Arc<dyn OrderNumberGenerator>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with the default configuration
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            store: None,
            order_numbers: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the storage backend (required)
    pub fn with_store(mut self, store: impl ShopStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set an already shared storage backend
    pub fn with_shared_store(mut self, store: Arc<dyn ShopStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default `ORD-YYYYMMDD-XXXXXX` generator
    pub fn with_order_numbers(mut self, generator: impl OrderNumberGenerator + 'static) -> Self {
        self.order_numbers = Some(Arc::new(generator));
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for endpoints outside the storefront surface, such as
    /// webhooks or admin tooling.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let admin = Router::new().route("/admin/ping", get(|| async { "pong" }));
    ///
    /// ServerBuilder::new()
    ///     .with_store(store)
    ///     .with_custom_routes(admin)
    ///     .build()?;
    /// ```
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the application state
    ///
    /// Validates the configuration and wires every service to the store.
    pub fn build_host(mut self) -> Result<ServerHost> {
        self.config.validate()?;

        let store = self
            .store
            .take()
            .ok_or_else(|| anyhow::anyhow!("A store is required. Call .with_store()"))?;
        let order_numbers = self
            .order_numbers
            .take()
            .unwrap_or_else(|| Arc::new(RandomOrderNumbers::new()));

        Ok(ServerHost::from_builder_components(
            self.config,
            store,
            order_numbers,
        ))
    }

    /// Build the final REST router
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = self.build_host()?;
        RestExposure::build_router(host, custom_routes)
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    ///
    /// # Example
    ///
    /// ```ignore
    /// ServerBuilder::new()
    ///     .with_store(store)
    ///     .serve("127.0.0.1:3000").await?;
    /// ```
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
