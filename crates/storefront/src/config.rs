//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Remote backend (all three or none)
//! - `COMMERCE_BASE_URL` - REST API root, e.g. `https://shop.example/wp-json/wc/v3/`
//! - `COMMERCE_CONSUMER_KEY` - API consumer key
//! - `COMMERCE_CONSUMER_SECRET` - API consumer secret (high entropy)
//!
//! ## Optional
//! - `SHOPFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPFRONT_PORT` - Listen port (default: 3000)
//! - `SHOPFRONT_DATA_DIR` - Directory for cart/orders/wishlist files (default: ./data)
//! - `COMMERCE_CONNECT_TIMEOUT_SECS` - Connect timeout (default: 15)
//! - `COMMERCE_REQUEST_TIMEOUT_SECS` - Whole-request timeout (default: 20)
//! - `FREE_DELIVERY_THRESHOLD` - After-discount amount with free delivery (default: 500)
//! - `DELIVERY_FEE` - Fee below the threshold (default: 50)
//! - `PROMO_DISCOUNT_RATE` - Promotional rate on the subtotal, e.g. 0.05 (default: 0)
//! - `MINIMUM_ORDER_AMOUNT` - Smallest subtotal accepted at checkout (default: 0)
//! - `CATALOG_PRODUCT_TTL_SECS` (default: 300)
//! - `CATALOG_CATEGORY_TTL_SECS` (default: 900)
//! - `CATALOG_PAYMENT_METHOD_TTL_SECS` (default: 3600)
//! - `CATALOG_MAX_ENTRIES` (default: 1000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use shopfront_core::Money;
use thiserror::Error;
use url::Url;

use crate::catalog::CatalogTtls;
use crate::pricing::PricingConfig;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory holding the persisted stores
    pub data_dir: PathBuf,
    /// Remote commerce backend, `None` when not configured
    pub commerce: Option<CommerceConfig>,
    pub pricing: PricingConfig,
    /// Smallest subtotal accepted at checkout
    pub minimum_order_amount: Money,
    pub catalog: CatalogConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Remote commerce backend configuration.
///
/// Implements `Debug` manually to redact the consumer secret.
#[derive(Clone)]
pub struct CommerceConfig {
    /// REST API root. Always ends with `/`.
    pub base_url: Url,
    pub consumer_key: String,
    pub consumer_secret: SecretString,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("base_url", &self.base_url.as_str())
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Catalog cache sizing and freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    pub ttls: CatalogTtls,
    pub max_entries: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttls: CatalogTtls::default(),
            max_entries: 1000,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            data_dir: PathBuf::from("./data"),
            commerce: None,
            pricing: PricingConfig::default(),
            minimum_order_amount: Money::ZERO,
            catalog: CatalogConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if the
    /// consumer secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_parsed_or_default("SHOPFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default("SHOPFRONT_PORT", "3000")?;
        let data_dir = PathBuf::from(get_env_or_default("SHOPFRONT_DATA_DIR", "./data"));

        let pricing = PricingConfig {
            free_delivery_threshold: Money::new(get_parsed_or_default(
                "FREE_DELIVERY_THRESHOLD",
                "500",
            )?),
            delivery_fee: Money::new(get_parsed_or_default("DELIVERY_FEE", "50")?),
            discount_rate: get_rate("PROMO_DISCOUNT_RATE")?,
        };
        let minimum_order_amount = Money::new(get_parsed_or_default("MINIMUM_ORDER_AMOUNT", "0")?);

        let catalog = CatalogConfig {
            ttls: CatalogTtls {
                products: get_secs("CATALOG_PRODUCT_TTL_SECS", "300")?,
                categories: get_secs("CATALOG_CATEGORY_TTL_SECS", "900")?,
                payment_methods: get_secs("CATALOG_PAYMENT_METHOD_TTL_SECS", "3600")?,
            },
            max_entries: get_parsed_or_default("CATALOG_MAX_ENTRIES", "1000")?,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            commerce: CommerceConfig::from_env()?,
            pricing,
            minimum_order_amount,
            catalog,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CommerceConfig {
    /// Build a backend config for `base_url`, normalising the trailing slash.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(
        base_url: &str,
        consumer_key: impl Into<String>,
        consumer_secret: SecretString,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            consumer_key: consumer_key.into(),
            consumer_secret,
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(20),
        })
    }

    /// Load the backend config. Returns `None` unless the base URL, key and
    /// secret are all set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(base_url), Some(consumer_key), Some(_)) = (
            get_optional_env("COMMERCE_BASE_URL"),
            get_optional_env("COMMERCE_CONSUMER_KEY"),
            get_optional_env("COMMERCE_CONSUMER_SECRET"),
        ) else {
            return Ok(None);
        };

        let mut config = Self::new(
            &base_url,
            consumer_key,
            get_validated_secret("COMMERCE_CONSUMER_SECRET")?,
        )?;
        config.connect_timeout = get_secs("COMMERCE_CONNECT_TIMEOUT_SECS", "15")?;
        config.request_timeout = get_secs("COMMERCE_REQUEST_TIMEOUT_SECS", "20")?;
        Ok(Some(config))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a whole number of seconds.
fn get_secs(key: &str, default: &str) -> Result<Duration, ConfigError> {
    get_parsed_or_default::<u64>(key, default).map(Duration::from_secs)
}

/// Parse a rate in `[0, 1]`.
fn get_rate(key: &str) -> Result<Decimal, ConfigError> {
    let rate: Decimal = get_parsed_or_default(key, "0")?;
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0 and 1 (got {rate})"),
        ));
    }
    Ok(rate)
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("COMMERCE_BASE_URL".to_string(), msg);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    // Url::join drops the last path segment unless it ends with a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key pair issued by the backend."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
