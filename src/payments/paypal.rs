// src/payments/paypal.rs
//! PayPal v1 payments REST API with a cached client-credentials token.

use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{check_response, random_hex, validate_amount, PaymentError};
use crate::clock::{iso_timestamp, SharedClock};

pub const GATEWAY: &str = "PayPal";
pub const SANDBOX_API_BASE: &str = "https://api-m.sandbox.paypal.com";
pub const LIVE_API_BASE: &str = "https://api-m.paypal.com";

/// Refresh this long before the token actually expires.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaypalMode {
    #[default]
    Sandbox,
    Live,
}

impl PaypalMode {
    pub fn api_base(self) -> &'static str {
        match self {
            PaypalMode::Sandbox => SANDBOX_API_BASE,
            PaypalMode::Live => LIVE_API_BASE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaypalMode::Sandbox => "sandbox",
            PaypalMode::Live => "live",
        }
    }
}

impl FromStr for PaypalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(PaypalMode::Sandbox),
            "live" => Ok(PaypalMode::Live),
            other => Err(format!("unknown PayPal mode `{other}` (expected sandbox|live)")),
        }
    }
}

fn default_usd() -> String {
    "USD".to_string()
}
fn default_description() -> String {
    "Rice Sample Purchase".to_string()
}
fn default_return_url() -> String {
    "http://localhost:5173/payment-success".to_string()
}
fn default_cancel_url() -> String {
    "http://localhost:5173/payment-cancel".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalOrderRequest {
    pub amount: f64,
    #[serde(default = "default_usd")]
    pub currency: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default = "default_return_url")]
    pub return_url: String,
    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalExecuteRequest {
    pub payment_id: String,
    pub payer_id: String,
}

#[derive(Debug, Clone)]
pub struct PaypalCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amount {
    pub total: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sale {
    pub id: String,
    pub state: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedResource {
    #[serde(default)]
    pub sale: Option<Sale>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub amount: Amount,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub related_resources: Vec<RelatedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payer {
    #[serde(default)]
    pub payer_info: Option<Value>,
}

/// Payment resource (only the fields this service reads).
#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub payer: Option<Payer>,
    /// Kept raw for pass-through in lookups.
    #[serde(default)]
    pub transactions: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentCreated {
    pub status: &'static str,
    pub payment_id: String,
    pub approval_url: String,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub customer_details: CustomerDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    pub id: String,
    pub state: Option<String>,
    pub intent: Option<String>,
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub amount: String,
    pub currency: String,
    pub description: Option<String>,
    pub invoice_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleSummary {
    pub id: String,
    pub state: String,
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayerSummary {
    pub payer_info: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentExecuted {
    pub status: &'static str,
    pub message: &'static str,
    pub payment: PaymentSummary,
    pub transaction: TransactionSummary,
    pub sale: SaleSummary,
    pub payer: PayerSummary,
    pub timestamp: String,
}

/// `INV-{YYYYmmdd}-{8 hex}`.
pub fn invoice_number(now: DateTime<Utc>) -> String {
    format!("INV-{}-{}", now.format("%Y%m%d"), random_hex(8))
}

/// Request body for a `sale` payment paid through a PayPal account.
pub fn payment_body(req: &PaypalOrderRequest, now: DateTime<Utc>) -> Value {
    let custom = json!({
        "customer_name": req.customer_name,
        "customer_email": req.customer_email,
        "created_at": iso_timestamp(now),
    });
    json!({
        "intent": "sale",
        "payer": { "payment_method": "paypal" },
        "redirect_urls": {
            "return_url": req.return_url,
            "cancel_url": req.cancel_url,
        },
        "transactions": [{
            "amount": {
                "total": format!("{:.2}", req.amount),
                "currency": req.currency,
            },
            "description": req.description,
            "custom": custom.to_string(),
            "invoice_number": invoice_number(now),
        }]
    })
}

/// Pull the summary blocks out of an executed payment.
pub fn summarize_execution(payment: Payment, now: DateTime<Utc>) -> Result<PaymentExecuted, PaymentError> {
    let raw_tx = payment
        .transactions
        .first()
        .cloned()
        .ok_or_else(|| PaymentError::decode(GATEWAY, "payment has no transactions"))?;
    let tx: Transaction = serde_json::from_value(raw_tx).map_err(|e| PaymentError::decode(GATEWAY, e))?;
    let sale = tx
        .related_resources
        .iter()
        .find_map(|r| r.sale.clone())
        .ok_or_else(|| PaymentError::decode(GATEWAY, "payment has no sale"))?;

    Ok(PaymentExecuted {
        status: "success",
        message: "Payment executed successfully",
        payment: PaymentSummary {
            id: payment.id,
            state: payment.state,
            intent: payment.intent,
            create_time: payment.create_time,
        },
        transaction: TransactionSummary {
            amount: tx.amount.total,
            currency: tx.amount.currency,
            description: tx.description,
            invoice_number: tx.invoice_number,
        },
        sale: SaleSummary {
            id: sale.id,
            state: sale.state,
            amount: sale.amount.total,
            currency: sale.amount.currency,
        },
        payer: PayerSummary {
            payer_info: payment.payer.and_then(|p| p.payer_info),
        },
        timestamp: iso_timestamp(now),
    })
}

pub struct PaypalClient {
    http: reqwest::Client,
    base: String,
    mode: PaypalMode,
    credentials: Option<PaypalCredentials>,
    clock: SharedClock,
    token: Mutex<Option<CachedToken>>,
}

impl PaypalClient {
    /// `base` overrides the mode's default API host when set.
    pub fn new(
        http: reqwest::Client,
        mode: PaypalMode,
        base: Option<String>,
        credentials: Option<PaypalCredentials>,
        clock: SharedClock,
    ) -> Self {
        let base = base
            .unwrap_or_else(|| mode.api_base().to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            http,
            base,
            mode,
            credentials,
            clock,
            token: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> PaypalMode {
        self.mode
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn cached_token(&self) -> Option<String> {
        let now = self.clock.now();
        let g = self.token.lock().unwrap_or_else(|p| p.into_inner());
        g.as_ref().filter(|t| t.expires_at > now).map(|t| t.token.clone())
    }

    /// Bearer token, reusing the cached one until shortly before expiry.
    async fn access_token(&self) -> Result<String, PaymentError> {
        if let Some(t) = self.cached_token() {
            return Ok(t);
        }
        let c = self.credentials.as_ref().ok_or(PaymentError::NotConfigured(GATEWAY))?;
        let resp = self
            .http
            .post(format!("{}/v1/oauth2/token", self.base))
            .basic_auth(&c.client_id, Some(&c.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| PaymentError::transport(GATEWAY, e))?;
        let reply: TokenReply = check_response(GATEWAY, resp)
            .await?
            .json()
            .await
            .map_err(|e| PaymentError::decode(GATEWAY, e))?;

        let lifetime = (reply.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0);
        let cached = CachedToken {
            token: reply.access_token.clone(),
            expires_at: self.clock.now() + Duration::seconds(lifetime),
        };
        *self.token.lock().unwrap_or_else(|p| p.into_inner()) = Some(cached);
        tracing::debug!(mode = self.mode.as_str(), expires_in = reply.expires_in, "paypal token refreshed");
        Ok(reply.access_token)
    }

    async fn send_json(&self, req: reqwest::RequestBuilder) -> Result<Payment, PaymentError> {
        let token = self.access_token().await?;
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PaymentError::transport(GATEWAY, e))?;
        check_response(GATEWAY, resp)
            .await?
            .json()
            .await
            .map_err(|e| PaymentError::decode(GATEWAY, e))
    }

    pub async fn create_payment(&self, req: &PaypalOrderRequest) -> Result<PaymentCreated, PaymentError> {
        validate_amount(req.amount)?;
        let now = self.clock.now();
        let body = payment_body(req, now);
        let payment = self
            .send_json(self.http.post(format!("{}/v1/payments/payment", self.base)).json(&body))
            .await?;

        let approval_url = payment
            .links
            .iter()
            .find(|l| l.rel == "approval_url")
            .map(|l| l.href.clone())
            .ok_or_else(|| PaymentError::decode(GATEWAY, "approval_url link missing"))?;

        tracing::info!(payment_id = %payment.id, amount = req.amount, currency = %req.currency, "paypal payment created");
        Ok(PaymentCreated {
            status: "success",
            payment_id: payment.id,
            approval_url,
            amount: req.amount,
            currency: req.currency.clone(),
            description: req.description.clone(),
            customer_details: CustomerDetails {
                name: req.customer_name.clone(),
                email: req.customer_email.clone(),
            },
        })
    }

    pub async fn execute_payment(&self, req: &PaypalExecuteRequest) -> Result<PaymentExecuted, PaymentError> {
        let url = format!("{}/v1/payments/payment/{}/execute", self.base, req.payment_id);
        let payment = self
            .send_json(self.http.post(url).json(&json!({ "payer_id": req.payer_id })))
            .await?;
        tracing::info!(payment_id = %payment.id, state = ?payment.state, "paypal payment executed");
        summarize_execution(payment, self.clock.now())
    }

    pub async fn find_payment(&self, payment_id: &str) -> Result<Payment, PaymentError> {
        let url = format!("{}/v1/payments/payment/{}", self.base, payment_id);
        self.send_json(self.http.get(url)).await
    }
}
