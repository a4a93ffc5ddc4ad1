//! Route table for the storefront endpoints

use axum::Router;
use axum::routing::{get, post, put};

use super::handlers::{auth, cart, catalog, order};
use super::host::ServerHost;

/// Build the storefront routes
///
/// - POST /auth/register, POST /auth/login, POST /auth/logout, GET /auth/profile
/// - GET /products, GET /products/{id}
/// - GET|DELETE /cart, POST /cart/add, PUT|DELETE /cart/{line_id}
/// - POST /order/create-from-cart, GET /order
/// - GET|DELETE /order/{id}, PUT /order/{id}/status, POST /order/{id}/pay
pub fn build_shop_routes(host: ServerHost) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/profile", get(auth::profile))
        .route("/products", get(catalog::list_products))
        .route("/products/{id}", get(catalog::get_product))
        .route("/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route(
            "/cart/{line_id}",
            put(cart::update_cart_line).delete(cart::remove_cart_line),
        )
        .route("/order", get(order::list_orders))
        .route("/order/create-from-cart", post(order::create_from_cart))
        .route(
            "/order/{id}",
            get(order::get_order).delete(order::cancel_order),
        )
        .route("/order/{id}/status", put(order::update_order_status))
        .route("/order/{id}/pay", post(order::pay_order))
        .with_state(host)
}
