use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and publish the static lookup
    /// cache settings. Fails if a recorder is already installed.
    pub fn init(cache_ttl_secs: u64, cache_capacity: usize) -> anyhow::Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_gauge!("lookup_cache_ttl_seconds", "Absolute TTL of the pincode lookup cache.");
        describe_gauge!("lookup_cache_capacity", "Maximum entries in the pincode lookup cache.");
        gauge!("lookup_cache_ttl_seconds").set(cache_ttl_secs as f64);
        gauge!("lookup_cache_capacity").set(cache_capacity as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
