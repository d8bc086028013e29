// tests/metrics.rs
//
// One test per binary: the Prometheus recorder is process-global.

mod common;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use agri_market_gateway::metrics::Metrics;
use common::{dead_feeds, fixed_clock, get, router_with, test_config, BODY_LIMIT};

#[tokio::test]
async fn metrics_endpoint_exposes_cache_postal_and_feed_series() {
    let cfg = test_config();
    let metrics = Metrics::init(cfg.cache_ttl_secs, cfg.cache_capacity).expect("install recorder");
    let app = router_with(&cfg, &dead_feeds(), fixed_clock()).merge(metrics.router());

    // manual-entry country: no upstream needed
    let (status, _) = get(&app, "/api/pincode-lookup?pincode=123456&country_code=%2B65").await;
    assert_eq!(status, StatusCode::OK);
    // dead sources: errors + fallback
    let (status, _) = get(&app, "/rss").await;
    assert_eq!(status, StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    for needle in [
        "lookup_cache_ttl_seconds 86400",
        "lookup_cache_capacity 1000",
        "postal_lookups_total{strategy=\"manual\",outcome=\"manual\"} 1",
        "feed_requests_total{feed=\"rice\"} 1",
        "feed_fallback_total{feed=\"rice\"} 1",
        "feed_source_errors_total",
    ] {
        assert!(text.contains(needle), "metrics exposition missing '{needle}'\n{text}");
    }
}
