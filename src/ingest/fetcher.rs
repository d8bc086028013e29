// src/ingest/fetcher.rs
//! Scatter/gather over the registered sources.

use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;

use crate::ingest::types::{Article, FeedProvider};

/// Fetch every provider concurrently. Each branch turns its own failure into
/// an empty list before the join, so one bad source never cancels or fails
/// the others. Output order follows `providers`.
pub async fn fetch_all(providers: &[Arc<dyn FeedProvider>]) -> Vec<Vec<Article>> {
    let branches = providers.iter().map(|p| async move {
        match p.fetch_articles().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("feed_source_errors_total", "source" => p.name().to_string()).increment(1);
                Vec::new()
            }
        }
    });
    join_all(branches).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use std::time::Duration;

    struct Fixed(&'static str, Vec<Article>);
    struct Failing;
    struct Slow(u64, &'static str);

    fn art(title: &str) -> Article {
        Article {
            title: title.into(),
            link: "#".into(),
            published: "p".into(),
            summary: String::new(),
            source: "s".into(),
            category: "news".into(),
        }
    }

    #[async_trait::async_trait]
    impl FeedProvider for Fixed {
        async fn fetch_articles(&self) -> Result<Vec<Article>> {
            Ok(self.1.clone())
        }
        fn name(&self) -> &str {
            self.0
        }
    }

    #[async_trait::async_trait]
    impl FeedProvider for Failing {
        async fn fetch_articles(&self) -> Result<Vec<Article>> {
            Err(anyhow!("boom"))
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    #[async_trait::async_trait]
    impl FeedProvider for Slow {
        async fn fetch_articles(&self) -> Result<Vec<Article>> {
            tokio::time::sleep(Duration::from_millis(self.0)).await;
            Ok(vec![art(self.1)])
        }
        fn name(&self) -> &str {
            self.1
        }
    }

    #[tokio::test]
    async fn failure_is_isolated_and_order_preserved() {
        let providers: Vec<Arc<dyn FeedProvider>> = vec![
            Arc::new(Fixed("a", vec![art("one"), art("two")])),
            Arc::new(Failing),
            Arc::new(Fixed("c", vec![art("three")])),
        ];
        let out = fetch_all(&providers).await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].len(), 2);
        assert!(out[1].is_empty());
        assert_eq!(out[2][0].title, "three");
    }

    #[tokio::test]
    async fn branches_run_concurrently() {
        let providers: Vec<Arc<dyn FeedProvider>> = vec![
            Arc::new(Slow(150, "first")),
            Arc::new(Slow(150, "second")),
            Arc::new(Slow(150, "third")),
        ];
        let t0 = std::time::Instant::now();
        let out = fetch_all(&providers).await;
        assert!(t0.elapsed() < Duration::from_millis(400), "fan-out ran sequentially");
        // slot order follows registration, not completion
        let titles: Vec<_> = out.iter().map(|v| v[0].title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }
}
