// src/config/app.rs
use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL_SECS};
use crate::payments::paypal::{PaypalCredentials, PaypalMode};
use crate::payments::razorpay::{self, RazorpayCredentials};
use crate::postal::PostalEndpoints;

pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PAYMENT_TIMEOUT_SECS: u64 = 30;

/// Runtime settings, read once at startup. Everything except gateway
/// credentials has a default; without credentials the payment routes answer
/// with a 500 instead of calling out.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub razorpay: Option<RazorpayCredentials>,
    pub razorpay_api_base: String,
    pub paypal: Option<PaypalCredentials>,
    pub paypal_mode: PaypalMode,
    /// Overrides the mode's API host (tests, proxies).
    pub paypal_api_base: Option<String>,
    pub postal: PostalEndpoints,
    pub feed_timeout: Duration,
    pub lookup_timeout: Duration,
    pub payment_timeout: Duration,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
    /// Seeds the shared RNG (prices, fallback titles). Unset = OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            razorpay: None,
            razorpay_api_base: razorpay::DEFAULT_API_BASE.to_string(),
            paypal: None,
            paypal_mode: PaypalMode::Sandbox,
            paypal_api_base: None,
            postal: PostalEndpoints::default(),
            feed_timeout: Duration::from_secs(DEFAULT_FEED_TIMEOUT_SECS),
            lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
            payment_timeout: Duration::from_secs(DEFAULT_PAYMENT_TIMEOUT_SECS),
            cache_capacity: DEFAULT_CAPACITY,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            rng_seed: None,
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid {name}={raw:?}: {e}")),
    }
}

fn pair<T>(id: &str, secret: &str, build: impl FnOnce(String, String) -> T) -> Option<T> {
    match (var(id), var(secret)) {
        (Some(i), Some(s)) => Some(build(i, s)),
        _ => None,
    }
}

impl AppConfig {
    /// Build from environment variables (`.env` is loaded by the binary).
    pub fn from_env() -> Result<Self> {
        let d = Self::default();

        let paypal_mode = match var("PAYPAL_MODE") {
            Some(m) => m.parse::<PaypalMode>().map_err(|e| anyhow!(e))?,
            None => d.paypal_mode,
        };

        let postal = PostalEndpoints {
            india_post: var("INDIA_POST_API_BASE").unwrap_or(d.postal.india_post),
            zippopotam: var("ZIPPOPOTAM_API_BASE").unwrap_or(d.postal.zippopotam),
            postcodes_io: var("POSTCODES_IO_API_BASE").unwrap_or(d.postal.postcodes_io),
        };

        let secs = |name: &str, default: Duration| -> Result<Duration> {
            Ok(parse_var::<u64>(name)?.map(Duration::from_secs).unwrap_or(default))
        };

        Ok(Self {
            razorpay: pair("RAZORPAY_KEY_ID", "RAZORPAY_KEY_SECRET", |key_id, key_secret| {
                RazorpayCredentials { key_id, key_secret }
            }),
            razorpay_api_base: var("RAZORPAY_API_BASE").unwrap_or(d.razorpay_api_base),
            paypal: pair("PAYPAL_CLIENT_ID", "PAYPAL_CLIENT_SECRET", |client_id, client_secret| {
                PaypalCredentials {
                    client_id,
                    client_secret,
                }
            }),
            paypal_mode,
            paypal_api_base: var("PAYPAL_API_BASE"),
            postal,
            feed_timeout: secs("FEED_TIMEOUT_SECS", d.feed_timeout)?,
            lookup_timeout: secs("LOOKUP_TIMEOUT_SECS", d.lookup_timeout)?,
            payment_timeout: secs("PAYMENT_TIMEOUT_SECS", d.payment_timeout)?,
            cache_capacity: parse_var::<usize>("PINCODE_CACHE_CAPACITY")?.unwrap_or(d.cache_capacity),
            cache_ttl_secs: parse_var::<u64>("PINCODE_CACHE_TTL_SECS")?.unwrap_or(d.cache_ttl_secs),
            rng_seed: parse_var::<u64>("RNG_SEED")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "RAZORPAY_KEY_ID",
        "RAZORPAY_KEY_SECRET",
        "PAYPAL_CLIENT_ID",
        "PAYPAL_CLIENT_SECRET",
        "PAYPAL_MODE",
        "FEED_TIMEOUT_SECS",
        "PINCODE_CACHE_TTL_SECS",
        "RNG_SEED",
    ];

    fn clear() {
        for v in VARS {
            env::remove_var(v);
        }
    }

    #[serial_test::serial]
    #[test]
    fn defaults_without_env() {
        clear();
        let c = AppConfig::from_env().unwrap();
        assert!(c.razorpay.is_none());
        assert!(c.paypal.is_none());
        assert_eq!(c.paypal_mode, PaypalMode::Sandbox);
        assert_eq!(c.feed_timeout, Duration::from_secs(20));
        assert_eq!(c.cache_ttl_secs, 86_400);
        assert_eq!(c.rng_seed, None);
    }

    #[serial_test::serial]
    #[test]
    fn reads_credentials_and_overrides() {
        clear();
        env::set_var("RAZORPAY_KEY_ID", "rzp_test_x");
        env::set_var("RAZORPAY_KEY_SECRET", "sec");
        env::set_var("PAYPAL_CLIENT_ID", "pp");
        env::set_var("PAYPAL_MODE", "live");
        env::set_var("FEED_TIMEOUT_SECS", "5");
        env::set_var("RNG_SEED", "42");
        let c = AppConfig::from_env().unwrap();
        assert_eq!(c.razorpay.as_ref().unwrap().key_id, "rzp_test_x");
        // half a credential pair is no credential
        assert!(c.paypal.is_none());
        assert_eq!(c.paypal_mode, PaypalMode::Live);
        assert_eq!(c.feed_timeout, Duration::from_secs(5));
        assert_eq!(c.rng_seed, Some(42));
        clear();
    }

    #[serial_test::serial]
    #[test]
    fn malformed_number_is_an_error() {
        clear();
        env::set_var("PINCODE_CACHE_TTL_SECS", "a day");
        assert!(AppConfig::from_env().is_err());
        clear();
    }
}
