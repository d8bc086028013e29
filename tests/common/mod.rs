// tests/common/mod.rs
//
// Shared helpers: in-process requests against the Router and throwaway
// upstream servers on 127.0.0.1:0.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use agri_market_gateway::api::{self, AppState};
use agri_market_gateway::clock::ManualClock;
use agri_market_gateway::config::AppConfig;
use agri_market_gateway::ingest::config::FeedsConfig;
use agri_market_gateway::ingest::types::{FeedSet, SourceDescriptor};

pub const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Nothing listens on port 1; connects fail immediately.
pub const DEAD_UPSTREAM: &str = "http://127.0.0.1:1";

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_upstream(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock upstream serve");
    });
    format!("http://{addr}")
}

pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 5, 8, 30, 0).unwrap(),
    ))
}

pub fn source(name: &str, url: &str, keywords: &[&str]) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        url: url.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        category: "news".to_string(),
    }
}

/// Both registries pointing at unreachable upstreams.
pub fn dead_feeds() -> FeedsConfig {
    FeedsConfig {
        rice: FeedSet {
            keywords: vec!["rice".into(), "basmati".into()],
            sources: vec![
                source("Dead A", &format!("{DEAD_UPSTREAM}/a.rss"), &["rice"]),
                source("Dead B", &format!("{DEAD_UPSTREAM}/b.rss"), &["rice"]),
            ],
        },
        indian_agri: FeedSet {
            keywords: vec!["agriculture".into()],
            sources: vec![source("Dead C", &format!("{DEAD_UPSTREAM}/c.rss"), &[])],
        },
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        feed_timeout: std::time::Duration::from_secs(3),
        lookup_timeout: std::time::Duration::from_secs(3),
        rng_seed: Some(7),
        ..AppConfig::default()
    }
}

pub fn state_with(cfg: &AppConfig, feeds: &FeedsConfig, clock: Arc<ManualClock>) -> AppState {
    AppState::with_clock(cfg, feeds, clock).expect("build app state")
}

pub fn router_with(cfg: &AppConfig, feeds: &FeedsConfig, clock: Arc<ManualClock>) -> Router {
    api::router(state_with(cfg, feeds, clock))
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    send(app, req).await
}

pub async fn post_json(app: &Router, uri: &str, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST");
    send(app, req).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("build DELETE");
    send(app, req).await
}
