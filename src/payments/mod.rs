//! Payment gateway proxies.
//!
//! Both gateways are opaque remote services reached over their REST APIs.
//! This module holds what they share: the error taxonomy, amount handling,
//! id suffixes and the upstream response check.

pub mod paypal;
pub mod razorpay;

use std::str::FromStr;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Amount must be a finite number greater than zero")]
    InvalidAmount,

    #[error("Invalid payment signature")]
    InvalidSignature,

    #[error("Invalid payment gateway specified")]
    InvalidGateway(String),

    #[error("{0} credentials are not configured")]
    NotConfigured(&'static str),

    #[error("{gateway} API error ({status}): {message}")]
    Api {
        gateway: &'static str,
        status: u16,
        message: String,
    },

    #[error("{gateway} request failed: {message}")]
    Transport {
        gateway: &'static str,
        message: String,
    },

    #[error("{gateway} returned an unexpected response: {message}")]
    Decode {
        gateway: &'static str,
        message: String,
    },
}

impl PaymentError {
    /// Errors caused by the caller's input rather than the gateway.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PaymentError::InvalidAmount | PaymentError::InvalidSignature | PaymentError::InvalidGateway(_)
        )
    }

    pub(crate) fn transport(gateway: &'static str, e: reqwest::Error) -> Self {
        PaymentError::Transport {
            gateway,
            message: e.to_string(),
        }
    }

    pub(crate) fn decode(gateway: &'static str, e: impl std::fmt::Display) -> Self {
        PaymentError::Decode {
            gateway,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gateway {
    Razorpay,
    Paypal,
}

impl FromStr for Gateway {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "razorpay" => Ok(Gateway::Razorpay),
            "paypal" => Ok(Gateway::Paypal),
            other => Err(PaymentError::InvalidGateway(other.to_string())),
        }
    }
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "payment_gateway_errors_total",
            "Non-success responses and transport failures from payment gateways."
        );
    });
}

/// Reject NaN, infinities, zero and negatives.
pub fn validate_amount(amount: f64) -> Result<f64, PaymentError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(PaymentError::InvalidAmount)
    }
}

/// Major units to minor units (rupees → paise), rounded to the nearest unit.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// First `n` hex chars of a fresh v4 UUID (n ≤ 32).
pub fn random_hex(n: usize) -> String {
    let mut s = uuid::Uuid::new_v4().simple().to_string();
    s.truncate(n.min(32));
    s
}

/// Pass a 2xx response through; turn anything else into [`PaymentError::Api`]
/// carrying the gateway's own error text when it has one.
pub async fn check_response(
    gateway: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, PaymentError> {
    ensure_metrics_described();
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    counter!("payment_gateway_errors_total", "gateway" => gateway).increment(1);
    let body = resp.text().await.unwrap_or_default();
    Err(PaymentError::Api {
        gateway,
        status: status.as_u16(),
        message: gateway_message(&body),
    })
}

/// Razorpay: `{"error":{"description":..}}`. PayPal: `{"message":..}` or,
/// from the OAuth endpoint, `{"error_description":..}`.
fn gateway_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.pointer("/error/description")
            .or_else(|| v.get("message"))
            .or_else(|| v.get("error_description"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });
    from_json.unwrap_or_else(|| {
        let t = body.trim();
        if t.is_empty() {
            "Unknown error".to_string()
        } else {
            t.chars().take(300).collect()
        }
    })
}
