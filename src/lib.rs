// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod payments;
pub mod postal;
pub mod prices;

pub use crate::api::{router, AppState};

use axum::Router;

use crate::config::AppConfig;
use crate::ingest::config::load_feeds_default;

/// Build the full application router from the environment: config, feed
/// registries and shared state. The `/metrics` route is merged in by the
/// binary, which owns the global recorder.
pub fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig::from_env()?;
    let feeds = load_feeds_default()?;
    let state = AppState::from_config(&cfg, &feeds)?;
    Ok(router(state))
}
