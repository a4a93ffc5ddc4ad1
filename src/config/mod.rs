//! Configuration loading and validation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::entity::Product;
use crate::core::error::ConfigError;
use crate::core::pricing::PricingPolicy;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "STOREFRONT_CONFIG";

/// Configuration file read when [`CONFIG_ENV`] is unset
pub const DEFAULT_CONFIG_FILE: &str = "storefront.yaml";

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Checkout retry settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Total commit attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; grows linearly after that
    pub retry_backoff_ms: u64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 25,
        }
    }
}

/// Session and role settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_minutes: i64,
    /// Usernames granted the `admin` role when they register
    pub admin_usernames: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: 60 * 24,
            admin_usernames: Vec::new(),
        }
    }
}

/// Database settings; without a URL the in-memory store is used
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

/// A product inserted at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SeedProduct {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SeedProduct {
    pub fn to_product(&self) -> Product {
        let mut product = Product::new(&self.name, self.price, self.stock);
        product.sku = self.sku.clone();
        product.description = self.description.clone();
        product
    }
}

/// Complete storefront configuration
///
/// Every section is optional in the YAML file:
///
/// ```yaml
/// server:
///   bind: 0.0.0.0:8080
/// pricing:
///   free_shipping_threshold: 150
///   flat_shipping_fee: 15
///   tax_rate: 0.18
/// checkout:
///   max_attempts: 3
/// auth:
///   admin_usernames: [ops]
/// catalog:
///   - name: Canvas Tote
///     price: 19.90
///     stock: 40
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub server: ServerConfig,
    pub pricing: PricingPolicy,
    pub checkout: CheckoutConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub catalog: Vec<SeedProduct>,
}

impl StoreConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `STOREFRONT_CONFIG`, or `storefront.yaml`
    ///
    /// A missing default file yields the default configuration; a missing
    /// file that was named explicitly is an error.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_yaml_file(path),
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_yaml_file(DEFAULT_CONFIG_FILE)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pricing.validate()?;

        if self.checkout.max_attempts == 0 {
            return Err(invalid(
                "checkout.max_attempts",
                "0",
                "at least one attempt is required",
            ));
        }
        if self.auth.session_ttl_minutes <= 0 {
            return Err(invalid(
                "auth.session_ttl_minutes",
                self.auth.session_ttl_minutes,
                "must be positive",
            ));
        }
        if self.database.max_connections == 0 {
            return Err(invalid(
                "database.max_connections",
                "0",
                "must be positive",
            ));
        }

        for (i, seed) in self.catalog.iter().enumerate() {
            if seed.name.trim().is_empty() {
                return Err(invalid(
                    format!("catalog[{}].name", i),
                    "",
                    "must not be empty",
                ));
            }
            if seed.price.is_sign_negative() {
                return Err(invalid(
                    format!("catalog[{}].price", i),
                    seed.price,
                    "must not be negative",
                ));
            }
            if seed.stock < 0 {
                return Err(invalid(
                    format!("catalog[{}].stock", i),
                    seed.stock,
                    "must not be negative",
                ));
            }
        }

        Ok(())
    }

    /// Products to seed into an empty catalog
    pub fn seed_products(&self) -> Vec<Product> {
        self.catalog.iter().map(SeedProduct::to_product).collect()
    }

    pub fn is_admin_username(&self, username: &str) -> bool {
        self.auth
            .admin_usernames
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(username))
    }
}

fn invalid(
    field: impl Into<String>,
    value: impl ToString,
    message: impl Into<String>,
) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        message: message.into(),
    }
}
