use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::cache::{CacheStats, LookupCache};
use crate::clock::{iso_timestamp, SharedClock, SystemClock};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::ingest::config::FeedsConfig;
use crate::ingest::fallback::FallbackKind;
use crate::ingest::types::Article;
use crate::ingest::{FeedPipeline, FeedStatus};
use crate::payments::paypal::{
    PaymentCreated, PaymentExecuted, PaypalClient, PaypalExecuteRequest, PaypalOrderRequest,
};
use crate::payments::razorpay::{
    OrderCreated, PaymentVerified, RazorpayClient, RazorpayOrderRequest, RazorpayVerifyRequest,
};
use crate::payments::{Gateway, PaymentError};
use crate::postal::{PincodeLookup, PostalClient, PostalService, Strategy, COUNTRY_RULES};
use crate::prices::{self, PriceBoard};

const SERVICE_NAME: &str = "Agriculture RSS & Live Prices API with Payment Integration";
const USER_AGENT: &str = concat!("agri-market-gateway/", env!("CARGO_PKG_VERSION"));

/// Shared handles for every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    rice: Arc<FeedPipeline>,
    indian_agri: Arc<FeedPipeline>,
    postal: Arc<PostalService>,
    razorpay: Arc<RazorpayClient>,
    paypal: Arc<PaypalClient>,
    clock: SharedClock,
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    /// Production wiring: real clock, HTTP providers for every feed source.
    pub fn from_config(cfg: &AppConfig, feeds: &FeedsConfig) -> anyhow::Result<Self> {
        Self::with_clock(cfg, feeds, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: &AppConfig, feeds: &FeedsConfig, clock: SharedClock) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building upstream HTTP client")?;
        let payments_http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(cfg.payment_timeout)
            .build()
            .context("building payment HTTP client")?;

        let rice = FeedPipeline::from_feed_set("rice", &feeds.rice, http.clone(), cfg.feed_timeout, FallbackKind::Rice);
        let indian_agri = FeedPipeline::from_feed_set(
            "indian_agri",
            &feeds.indian_agri,
            http.clone(),
            cfg.feed_timeout,
            FallbackKind::IndianAgri,
        );

        let cache = Arc::new(LookupCache::new(
            "pincode",
            cfg.cache_capacity,
            cfg.cache_ttl_secs,
            clock.clone(),
        ));
        let postal = PostalService::new(PostalClient::new(http, cfg.postal.clone(), cfg.lookup_timeout), cache);

        let razorpay = RazorpayClient::new(payments_http.clone(), cfg.razorpay_api_base.clone(), cfg.razorpay.clone());
        let paypal = PaypalClient::new(
            payments_http,
            cfg.paypal_mode,
            cfg.paypal_api_base.clone(),
            cfg.paypal.clone(),
            clock.clone(),
        );

        let rng = match cfg.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        tracing::info!(
            rice_sources = rice.source_count(),
            indian_agri_sources = indian_agri.source_count(),
            razorpay = razorpay.is_configured(),
            paypal = paypal.is_configured(),
            paypal_mode = paypal.mode().as_str(),
            "app state ready"
        );

        Ok(Self {
            rice: Arc::new(rice),
            indian_agri: Arc::new(indian_agri),
            postal: Arc::new(postal),
            razorpay: Arc::new(razorpay),
            paypal: Arc::new(paypal),
            clock,
            rng: Arc::new(Mutex::new(rng)),
        })
    }

    /// Swap the `/rss` pipeline (tests use fixture providers).
    pub fn with_rice_pipeline(mut self, p: FeedPipeline) -> Self {
        self.rice = Arc::new(p);
        self
    }

    /// Swap the `/indian-agri-rss` pipeline.
    pub fn with_indian_agri_pipeline(mut self, p: FeedPipeline) -> Self {
        self.indian_agri = Arc::new(p);
        self
    }

    pub fn cache(&self) -> &Arc<LookupCache<PincodeLookup>> {
        self.postal.cache()
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut g = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut g)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/rss", get(rice_rss))
        .route("/indian-agri-rss", get(indian_agri_rss))
        .route("/live-basmati-prices", get(live_basmati_prices))
        .route("/api/pincode-lookup", get(pincode_lookup))
        .route("/api/country-codes", get(country_codes))
        .route("/api/cache-stats", get(cache_stats))
        .route("/api/clear-cache", delete(clear_cache))
        .route("/create-razorpay-order", post(create_razorpay_order))
        .route("/verify-razorpay-payment", post(verify_razorpay_payment))
        .route("/razorpay-order/{order_id}", get(get_razorpay_order))
        .route("/create-paypal-order", post(create_paypal_order))
        .route("/execute-paypal-payment", post(execute_paypal_payment))
        .route("/paypal-payment/{payment_id}", get(get_paypal_payment))
        .route("/payment-status/{payment_id}", get(payment_status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "Agriculture RSS API with Payment Integration is running!" }))
}

#[derive(Serialize)]
struct GatewayStatus {
    razorpay_configured: bool,
    paypal_configured: bool,
    paypal_mode: &'static str,
}

#[derive(Serialize)]
struct HealthOut {
    status: &'static str,
    timestamp: String,
    service: &'static str,
    version: &'static str,
    endpoints: Value,
    cache: CacheStats,
    gateways: GatewayStatus,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "healthy",
        timestamp: iso_timestamp(state.clock.now()),
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        endpoints: json!({
            "live_prices": "/live-basmati-prices",
            "rice_rss": "/rss",
            "indian_agri_rss": "/indian-agri-rss",
            "pincode_lookup": "/api/pincode-lookup?pincode={pincode}&country_code={code}",
            "country_codes": "/api/country-codes",
            "cache_stats": "/api/cache-stats",
            "clear_cache": "/api/clear-cache",
            "razorpay_create": "/create-razorpay-order",
            "razorpay_verify": "/verify-razorpay-payment",
            "razorpay_order": "/razorpay-order/{order_id}",
            "paypal_create": "/create-paypal-order",
            "paypal_execute": "/execute-paypal-payment",
            "paypal_payment": "/paypal-payment/{payment_id}",
            "payment_status": "/payment-status/{payment_id}",
        }),
        cache: state.cache().stats(),
        gateways: GatewayStatus {
            razorpay_configured: state.razorpay.is_configured(),
            paypal_configured: state.paypal.is_configured(),
            paypal_mode: state.paypal.mode().as_str(),
        },
    })
}

// ---------- feeds ----------

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub count: usize,
    pub articles: Vec<Article>,
    pub last_updated: String,
    pub status: FeedStatus,
}

async fn serve_feed(state: &AppState, pipeline: &FeedPipeline) -> Json<FeedResponse> {
    let per_source = pipeline.collect().await;
    let now = state.clock.now();
    let digest = state.with_rng(|rng| pipeline.digest(per_source, now, rng));
    Json(FeedResponse {
        count: digest.total,
        articles: digest.articles,
        last_updated: iso_timestamp(now),
        status: digest.status,
    })
}

async fn rice_rss(State(state): State<AppState>) -> Json<FeedResponse> {
    let pipeline = state.rice.clone();
    serve_feed(&state, &pipeline).await
}

async fn indian_agri_rss(State(state): State<AppState>) -> Json<FeedResponse> {
    let pipeline = state.indian_agri.clone();
    serve_feed(&state, &pipeline).await
}

async fn live_basmati_prices(State(state): State<AppState>) -> Json<PriceBoard> {
    let now = state.clock.now();
    Json(state.with_rng(|rng| prices::live_prices(now, rng)))
}

// ---------- postal lookup ----------

fn default_country_code() -> String {
    "+91".to_string()
}

#[derive(Debug, Deserialize)]
struct PincodeQuery {
    #[serde(default)]
    pincode: String,
    #[serde(default = "default_country_code")]
    country_code: String,
}

async fn pincode_lookup(
    State(state): State<AppState>,
    Query(q): Query<PincodeQuery>,
) -> Result<Json<PincodeLookup>, AppError> {
    let out = state.postal.resolve(&q.pincode, &q.country_code).await?;
    Ok(Json(out))
}

#[derive(Serialize)]
struct CountryOut {
    code: &'static str,
    name: &'static str,
    iso: &'static str,
    pincode_lengths: &'static [usize],
    numeric_only: bool,
    lookup: &'static str,
    manual_entry: bool,
}

async fn country_codes() -> Json<Value> {
    let countries: Vec<CountryOut> = COUNTRY_RULES
        .iter()
        .map(|r| CountryOut {
            code: r.dial_code,
            name: r.country,
            iso: r.iso,
            pincode_lengths: r.lengths,
            numeric_only: r.numeric_only,
            lookup: r.strategy.label(),
            manual_entry: r.strategy == Strategy::ManualEntry,
        })
        .collect();
    Json(json!({
        "success": true,
        "count": countries.len(),
        "countries": countries,
    }))
}

async fn cache_stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "cache": state.cache().stats() }))
}

async fn clear_cache(State(state): State<AppState>) -> Json<Value> {
    let cleared = state.cache().clear();
    tracing::info!(cleared, "pincode cache cleared");
    Json(json!({
        "success": true,
        "message": format!("Cache cleared ({cleared} entries removed)"),
        "cleared": cleared,
    }))
}

// ---------- payments ----------

async fn create_razorpay_order(
    State(state): State<AppState>,
    Json(body): Json<RazorpayOrderRequest>,
) -> Result<Json<OrderCreated>, AppError> {
    let out = state
        .razorpay
        .create_order(&body, state.clock.now())
        .await
        .map_err(|e| AppError::payment(e, "Razorpay order creation failed"))?;
    Ok(Json(out))
}

async fn verify_razorpay_payment(
    State(state): State<AppState>,
    Json(body): Json<RazorpayVerifyRequest>,
) -> Result<Json<PaymentVerified>, AppError> {
    let out = state
        .razorpay
        .verify_payment(&body, state.clock.now())
        .await
        .map_err(|e| AppError::payment(e, "Payment verification failed"))?;
    Ok(Json(out))
}

async fn get_razorpay_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let order = state
        .razorpay
        .fetch_order(&order_id)
        .await
        .map_err(|e| AppError::lookup(e, "Order"))?;
    Ok(Json(json!({ "status": "success", "order": order })))
}

async fn create_paypal_order(
    State(state): State<AppState>,
    Json(body): Json<PaypalOrderRequest>,
) -> Result<Json<PaymentCreated>, AppError> {
    let out = state
        .paypal
        .create_payment(&body)
        .await
        .map_err(|e| AppError::payment(e, "PayPal order creation failed"))?;
    Ok(Json(out))
}

async fn execute_paypal_payment(
    State(state): State<AppState>,
    Json(body): Json<PaypalExecuteRequest>,
) -> Result<Json<PaymentExecuted>, AppError> {
    let out = state
        .paypal
        .execute_payment(&body)
        .await
        .map_err(|e| AppError::payment(e, "PayPal payment execution failed"))?;
    Ok(Json(out))
}

async fn get_paypal_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let p = state
        .paypal
        .find_payment(&payment_id)
        .await
        .map_err(|e| AppError::lookup(e, "Payment"))?;
    Ok(Json(json!({
        "status": "success",
        "payment": {
            "id": p.id,
            "state": p.state,
            "intent": p.intent,
            "create_time": p.create_time,
            "transactions": p.transactions,
        }
    })))
}

fn default_gateway() -> String {
    "razorpay".to_string()
}

#[derive(Debug, Deserialize)]
struct GatewayQuery {
    #[serde(default = "default_gateway")]
    gateway: String,
}

async fn payment_status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Query(q): Query<GatewayQuery>,
) -> Result<Json<Value>, AppError> {
    let gateway: Gateway = q
        .gateway
        .parse()
        .map_err(|e: PaymentError| AppError::BadRequest(e.to_string()))?;

    let out = match gateway {
        Gateway::Razorpay => {
            let p = state
                .razorpay
                .fetch_payment(&payment_id)
                .await
                .map_err(|e| AppError::lookup(e, "Payment"))?;
            json!({
                "gateway": "razorpay",
                "status": p.status,
                "amount": p.amount,
                "currency": p.currency,
                "method": p.method,
                "created_at": p.created_at,
                "captured": p.captured,
                "order_id": p.order_id,
            })
        }
        Gateway::Paypal => {
            let p = state
                .paypal
                .find_payment(&payment_id)
                .await
                .map_err(|e| AppError::lookup(e, "Payment"))?;
            json!({
                "gateway": "paypal",
                "status": p.state,
                "id": p.id,
                "create_time": p.create_time,
                "intent": p.intent,
                "transactions": p.transactions,
            })
        }
    };
    Ok(Json(out))
}
