//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BUILDMART_API_URL` - Base URL of the Buildmart REST API
//!
//! ## Optional
//! - `BUILDMART_API_TOKEN` - Static bearer token for the API (high entropy)
//! - `BUILDMART_SYNC_DEBOUNCE_MS` - Cart sync debounce window (default: 3000)
//! - `BUILDMART_CATALOG_CACHE_TTL_SECS` - Product cache TTL (default: 300)
//! - `BUILDMART_FLAT_SHIPPING_FEE` - Delivery fee at or below minimum order (default: 150)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cart::{DEFAULT_DEBOUNCE, PricingRules};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
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

/// Storefront cart engine configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Base URL of the REST API
    pub api_url: Url,
    /// Static bearer token, when the API is not reached through a session
    pub api_token: Option<SecretString>,
    /// Inactivity window before dirty cart lines are synced
    pub sync_debounce: Duration,
    /// Product catalog cache TTL
    pub catalog_cache_ttl: Duration,
    /// Pricing constants
    pub pricing: PricingRules,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("sync_debounce", &self.sync_debounce)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .field("pricing", &self.pricing)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = get_required(&lookup, "BUILDMART_API_URL")?;
        let api_url = Url::parse(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BUILDMART_API_URL".to_string(), e.to_string()))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "BUILDMART_API_URL".to_string(),
                format!("unsupported scheme '{}'", api_url.scheme()),
            ));
        }

        let api_token = lookup("BUILDMART_API_TOKEN")
            .filter(|token| !token.is_empty())
            .map(|token| {
                validate_secret_strength(&token, "BUILDMART_API_TOKEN")?;
                Ok::<_, ConfigError>(SecretString::from(token))
            })
            .transpose()?;

        let sync_debounce = get_parsed::<u64>(&lookup, "BUILDMART_SYNC_DEBOUNCE_MS")?
            .map_or(DEFAULT_DEBOUNCE, Duration::from_millis);
        let catalog_cache_ttl = Duration::from_secs(
            get_parsed::<u64>(&lookup, "BUILDMART_CATALOG_CACHE_TTL_SECS")?
                .unwrap_or(DEFAULT_CATALOG_CACHE_TTL_SECS),
        );

        let mut pricing = PricingRules::default();
        if let Some(fee) = get_parsed::<Decimal>(&lookup, "BUILDMART_FLAT_SHIPPING_FEE")? {
            if fee.is_sign_negative() {
                return Err(ConfigError::InvalidEnvVar(
                    "BUILDMART_FLAT_SHIPPING_FEE".to_string(),
                    "must not be negative".to_string(),
                ));
            }
            pricing.flat_shipping_fee = fee;
        }

        Ok(Self {
            api_url,
            api_token,
            sync_debounce,
            catalog_cache_ttl,
            pricing,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional variable parsed as `T`.
fn get_parsed<T>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
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

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    const STRONG_TOKEN: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength(STRONG_TOKEN, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("BUILDMART_API_URL", "https://api.buildmart.test/v1")]).unwrap();
        assert_eq!(config.api_url.as_str(), "https://api.buildmart.test/v1");
        assert!(config.api_token.is_none());
        assert_eq!(config.sync_debounce, Duration::from_millis(3000));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.pricing, PricingRules::default());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_api_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "BUILDMART_API_URL"));
    }

    #[test]
    fn test_invalid_api_url() {
        let err = load(&[("BUILDMART_API_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
        let err = load(&[("BUILDMART_API_URL", "ftp://files.buildmart.test")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BUILDMART_API_URL", "http://localhost:8080"),
            ("BUILDMART_API_TOKEN", STRONG_TOKEN),
            ("BUILDMART_SYNC_DEBOUNCE_MS", "500"),
            ("BUILDMART_CATALOG_CACHE_TTL_SECS", "60"),
            ("BUILDMART_FLAT_SHIPPING_FEE", "200.50"),
        ])
        .unwrap();
        assert_eq!(
            config.api_token.as_ref().unwrap().expose_secret(),
            STRONG_TOKEN
        );
        assert_eq!(config.sync_debounce, Duration::from_millis(500));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.pricing.flat_shipping_fee, Decimal::new(20050, 2));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = load(&[
            ("BUILDMART_API_URL", "http://localhost:8080"),
            ("BUILDMART_SYNC_DEBOUNCE_MS", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "BUILDMART_SYNC_DEBOUNCE_MS"));

        let err = load(&[
            ("BUILDMART_API_URL", "http://localhost:8080"),
            ("BUILDMART_FLAT_SHIPPING_FEE", "-1"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_placeholder_token_is_rejected() {
        let err = load(&[
            ("BUILDMART_API_URL", "http://localhost:8080"),
            ("BUILDMART_API_TOKEN", "changeme"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = load(&[
            ("BUILDMART_API_URL", "http://localhost:8080"),
            ("BUILDMART_API_TOKEN", STRONG_TOKEN),
        ])
        .unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("localhost:8080"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(STRONG_TOKEN));
    }
}
