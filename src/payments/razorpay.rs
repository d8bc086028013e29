// src/payments/razorpay.rs
//! Razorpay orders API (HTTP Basic with key id / key secret).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{check_response, random_hex, to_minor_units, validate_amount, PaymentError};
use crate::clock::iso_timestamp;

pub const GATEWAY: &str = "Razorpay";
pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com";

fn default_currency() -> String {
    "INR".to_string()
}

fn default_description() -> String {
    "Rice Sample Purchase".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrderRequest {
    /// Major units (rupees).
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default = "default_description")]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayVerifyRequest {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Clone)]
pub struct RazorpayCredentials {
    pub key_id: String,
    pub key_secret: String,
}

/// Order as returned by the gateway (extra fields ignored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub captured: Option<bool>,
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
    notes: OrderNotes<'a>,
}

#[derive(Debug, Serialize)]
struct OrderNotes<'a> {
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    description: &'a str,
    created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub contact: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderCreated {
    pub status: &'static str,
    pub order: CreatedOrder,
    pub key_id: String,
    pub customer_details: CustomerDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentVerified {
    pub status: &'static str,
    pub message: &'static str,
    pub payment: RazorpayPayment,
    pub order: RazorpayOrder,
    pub timestamp: String,
}

/// `order_{YYYYmmdd_HHMMSS}_{6 hex}`.
pub fn receipt_id(now: DateTime<Utc>) -> String {
    format!("order_{}_{}", now.format("%Y%m%d_%H%M%S"), random_hex(6))
}

fn signing_mac(secret: &str, order_id: &str, payment_id: &str) -> Result<Hmac<Sha256>, PaymentError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    Ok(mac)
}

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"` keyed with the secret.
pub fn expected_signature(secret: &str, order_id: &str, payment_id: &str) -> Result<String, PaymentError> {
    Ok(hex::encode(signing_mac(secret, order_id, payment_id)?.finalize().into_bytes()))
}

/// Constant-time check of a checkout signature.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> Result<(), PaymentError> {
    let provided = hex::decode(signature.trim()).map_err(|_| PaymentError::InvalidSignature)?;
    signing_mac(secret, order_id, payment_id)?
        .verify_slice(&provided)
        .map_err(|_| PaymentError::InvalidSignature)
}

#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    base: String,
    credentials: Option<RazorpayCredentials>,
}

impl RazorpayClient {
    pub fn new(http: reqwest::Client, base: impl Into<String>, credentials: Option<RazorpayCredentials>) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn creds(&self) -> Result<&RazorpayCredentials, PaymentError> {
        self.credentials.as_ref().ok_or(PaymentError::NotConfigured(GATEWAY))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, PaymentError> {
        let c = self.creds()?;
        let resp = self
            .http
            .get(format!("{}{}", self.base, path))
            .basic_auth(&c.key_id, Some(&c.key_secret))
            .send()
            .await
            .map_err(|e| PaymentError::transport(GATEWAY, e))?;
        check_response(GATEWAY, resp)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PaymentError::decode(GATEWAY, e))
    }

    pub async fn create_order(&self, req: &RazorpayOrderRequest, now: DateTime<Utc>) -> Result<OrderCreated, PaymentError> {
        validate_amount(req.amount)?;
        let c = self.creds()?;
        let receipt = receipt_id(now);
        let body = CreateOrderBody {
            amount: to_minor_units(req.amount),
            currency: &req.currency,
            receipt: &receipt,
            payment_capture: 1,
            notes: OrderNotes {
                customer_name: &req.customer_name,
                customer_email: &req.customer_email,
                customer_phone: &req.customer_phone,
                description: &req.description,
                created_at: iso_timestamp(now),
            },
        };

        let resp = self
            .http
            .post(format!("{}/v1/orders", self.base))
            .basic_auth(&c.key_id, Some(&c.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::transport(GATEWAY, e))?;
        let order: RazorpayOrder = check_response(GATEWAY, resp)
            .await?
            .json()
            .await
            .map_err(|e| PaymentError::decode(GATEWAY, e))?;

        tracing::info!(order_id = %order.id, amount = order.amount, currency = %order.currency, "razorpay order created");
        Ok(OrderCreated {
            status: "success",
            order: CreatedOrder {
                id: order.id,
                amount: order.amount,
                currency: order.currency,
                receipt: order.receipt.unwrap_or(receipt),
            },
            key_id: c.key_id.clone(),
            customer_details: CustomerDetails {
                name: req.customer_name.clone(),
                email: req.customer_email.clone(),
                contact: req.customer_phone.clone(),
            },
        })
    }

    /// Check the checkout signature, then load the payment and its order.
    pub async fn verify_payment(&self, req: &RazorpayVerifyRequest, now: DateTime<Utc>) -> Result<PaymentVerified, PaymentError> {
        let c = self.creds()?;
        if let Err(e) = verify_signature(
            &c.key_secret,
            &req.razorpay_order_id,
            &req.razorpay_payment_id,
            &req.razorpay_signature,
        ) {
            tracing::warn!(order_id = %req.razorpay_order_id, "razorpay signature mismatch");
            return Err(e);
        }
        let payment = self.fetch_payment(&req.razorpay_payment_id).await?;
        let order: RazorpayOrder = self.get(&format!("/v1/orders/{}", req.razorpay_order_id)).await?;
        Ok(PaymentVerified {
            status: "success",
            message: "Payment verified successfully",
            payment,
            order,
            timestamp: iso_timestamp(now),
        })
    }

    /// Raw order object, passed through untouched.
    pub async fn fetch_order(&self, order_id: &str) -> Result<serde_json::Value, PaymentError> {
        self.get(&format!("/v1/orders/{order_id}")).await
    }

    pub async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment, PaymentError> {
        self.get(&format!("/v1/payments/{payment_id}")).await
    }
}
