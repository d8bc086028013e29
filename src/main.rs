//! Agri Market Gateway: binary entrypoint
//! Boots the Axum HTTP server: config, feed registries, shared state,
//! Prometheus recorder and tracing.

use agri_market_gateway::config::AppConfig;
use agri_market_gateway::ingest::config::load_feeds_default;
use agri_market_gateway::metrics::Metrics;
use agri_market_gateway::{router, AppState};
use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON lines when `LOG_FORMAT=json`.
/// `try_init` keeps a subscriber the host runtime may already have set.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agri_market_gateway=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::from_env().context("reading configuration")?;
    let feeds = load_feeds_default().context("loading feed registries")?;
    let state = AppState::from_config(&cfg, &feeds)?;

    let mut app = router(state);
    match Metrics::init(cfg.cache_ttl_secs, cfg.cache_capacity) {
        Ok(m) => app = app.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    tracing::info!(
        feed_timeout_secs = cfg.feed_timeout.as_secs(),
        cache_capacity = cfg.cache_capacity,
        cache_ttl_secs = cfg.cache_ttl_secs,
        "agri-market-gateway starting"
    );

    Ok(app.into())
}
