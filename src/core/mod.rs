//! Core module containing the domain types, storage traits and errors

pub mod auth;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod order_number;
pub mod pricing;
pub mod service;

pub use auth::{AuthContext, AuthPolicy, PasswordHasher, SessionRegistry};
pub use entity::{CartLine, Order, OrderLine, OrderStatus, Product, User};
pub use error::{ConfigError, ShopError, StorageError};
pub use extractors::{CurrentUser, ValidatedJson};
pub use order_number::{OrderNumberGenerator, RandomOrderNumbers};
pub use pricing::{PriceBreakdown, PricingPolicy};
pub use service::{AccountStore, CartStore, CatalogStore, CheckoutPlan, OrderStore, ShopStore};
