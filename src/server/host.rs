//! Server host holding the application state
//!
//! The host owns the configuration, the storage backend and every service
//! built on top of it. It is cheap to clone (all fields are `Arc`s) and is
//! used directly as the axum router state.

use axum::extract::FromRef;
use chrono::Duration;
use std::sync::Arc;

use crate::accounts::AccountService;
use crate::cart::CartService;
use crate::checkout::{CheckoutEngine, OrderService, RetryPolicy};
use crate::config::StoreConfig;
use crate::core::auth::SessionRegistry;
use crate::core::order_number::OrderNumberGenerator;
use crate::core::service::ShopStore;

/// Host context containing all application state
///
/// # Example
///
/// ```rust,ignore
/// let host = ServerHost::from_builder_components(config, store, order_numbers);
/// let app = RestExposure::build_router(host, vec![])?;
/// ```
#[derive(Clone)]
pub struct ServerHost {
    /// Validated configuration
    pub config: Arc<StoreConfig>,

    /// Storage backend shared by every service
    pub store: Arc<dyn ShopStore>,

    /// Bearer sessions
    pub sessions: Arc<SessionRegistry>,

    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutEngine>,
    pub orders: Arc<OrderService>,
    pub accounts: Arc<AccountService>,
}

impl ServerHost {
    /// Wire the services together from builder components
    pub fn from_builder_components(
        config: StoreConfig,
        store: Arc<dyn ShopStore>,
        order_numbers: Arc<dyn OrderNumberGenerator>,
    ) -> Self {
        let pricing = Arc::new(config.pricing.clone());
        let sessions = Arc::new(SessionRegistry::new(Duration::minutes(
            config.auth.session_ttl_minutes,
        )));

        let cart = CartService::new(store.clone(), pricing.clone());
        let checkout = CheckoutEngine::new(
            store.clone(),
            pricing,
            order_numbers,
            RetryPolicy::from_config(&config.checkout),
        );
        let orders = OrderService::new(store.clone());
        let accounts = AccountService::new(store.clone(), sessions.clone())
            .with_admin_usernames(config.auth.admin_usernames.clone());

        Self {
            config: Arc::new(config),
            store,
            sessions,
            cart: Arc::new(cart),
            checkout: Arc::new(checkout),
            orders: Arc::new(orders),
            accounts: Arc::new(accounts),
        }
    }
}

impl FromRef<ServerHost> for Arc<SessionRegistry> {
    fn from_ref(host: &ServerHost) -> Self {
        host.sessions.clone()
    }
}
