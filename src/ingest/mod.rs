// src/ingest/mod.rs
pub mod config;
pub mod fallback;
pub mod fetcher;
pub mod providers;
pub mod registry;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use rand::Rng;
use serde::Serialize;

use crate::ingest::fallback::FallbackKind;
use crate::ingest::providers::rss::RssProvider;
use crate::ingest::types::{Article, FeedProvider, FeedSet};

/// Articles returned per response.
pub const MAX_ARTICLES: usize = 20;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_requests_total", "Feed aggregation runs.");
        describe_counter!(
            "feed_source_errors_total",
            "Per-source fetch/parse failures (source contributed nothing)."
        );
        describe_counter!(
            "feed_articles_kept_total",
            "Articles kept after keyword filtering and title dedup."
        );
        describe_counter!(
            "feed_dedup_total",
            "Articles removed as case-insensitive title duplicates."
        );
        describe_counter!(
            "feed_fallback_total",
            "Responses served with synthetic fallback articles."
        );
        describe_histogram!("feed_fetch_ms", "Per-source HTTP fetch time in milliseconds.");
        describe_histogram!("feed_parse_ms", "Per-source parse time in milliseconds.");
        describe_counter!("feed_bytes_total", "Raw feed bytes downloaded.");
        describe_gauge!(
            "feed_pipeline_last_run_ts",
            "Unix ts when a feed pipeline last ran."
        );
    });
}

/// Decode entities, strip tags, normalize curly quotes and collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Cut to at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// True if lower-cased `title + " " + summary` contains any keyword.
pub fn contains_any_keyword<S: AsRef<str>>(title: &str, summary: &str, keywords: &[S]) -> bool {
    let content = format!("{title} {summary}").to_lowercase();
    keywords
        .iter()
        .map(|k| k.as_ref().to_lowercase())
        .any(|k| !k.is_empty() && content.contains(&k))
}

/// Keep articles matching at least one keyword, in input order.
pub fn filter_relevant<S: AsRef<str>>(articles: Vec<Article>, keywords: &[S]) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|a| contains_any_keyword(&a.title, &a.summary, keywords))
        .collect()
}

/// Drop later articles whose lower-cased title was already seen.
/// Returns the survivors and how many were dropped.
pub fn dedupe_by_title(articles: Vec<Article>) -> (Vec<Article>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(articles.len());
    let mut dropped = 0usize;
    for a in articles {
        if seen.insert(a.title.to_lowercase()) {
            keep.push(a);
        } else {
            dropped += 1;
        }
    }
    (keep, dropped)
}

/// Descending by the raw `published` string. This is a plain string compare,
/// not a date compare: mixed formats (RFC 2822 vs RFC 3339) order by their
/// leading characters. Stable, so equal strings keep first-seen order.
pub fn sort_by_published_desc(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.published.cmp(&a.published));
}

/// Result of [`aggregate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregated {
    /// At most [`MAX_ARTICLES`], newest-looking first.
    pub articles: Vec<Article>,
    /// Relevant unique articles before the cut.
    pub total: usize,
    pub dropped_duplicates: usize,
}

/// Filter → dedupe → sort → truncate over the concatenated source lists.
pub fn aggregate<S: AsRef<str>>(per_source: Vec<Vec<Article>>, keywords: &[S]) -> Aggregated {
    let all: Vec<Article> = per_source.into_iter().flatten().collect();
    let relevant = filter_relevant(all, keywords);
    let (mut unique, dropped) = dedupe_by_title(relevant);
    let total = unique.len();
    sort_by_published_desc(&mut unique);
    unique.truncate(MAX_ARTICLES);
    Aggregated {
        articles: unique,
        total,
        dropped_duplicates: dropped,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Success,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDigest {
    pub articles: Vec<Article>,
    /// Relevant unique articles found, which may exceed `articles.len()`.
    /// Equals the fallback count when fallback articles are served.
    pub total: usize,
    pub status: FeedStatus,
}

/// A source registry bound to its providers, global keywords and fallback pool.
pub struct FeedPipeline {
    name: &'static str,
    providers: Vec<Arc<dyn FeedProvider>>,
    keywords: Vec<String>,
    fallback: FallbackKind,
}

impl FeedPipeline {
    pub fn new(
        name: &'static str,
        providers: Vec<Arc<dyn FeedProvider>>,
        keywords: Vec<String>,
        fallback: FallbackKind,
    ) -> Self {
        Self {
            name,
            providers,
            keywords,
            fallback,
        }
    }

    /// One HTTP provider per registered source.
    pub fn from_feed_set(
        name: &'static str,
        set: &FeedSet,
        client: reqwest::Client,
        timeout: Duration,
        fallback: FallbackKind,
    ) -> Self {
        let providers = set
            .sources
            .iter()
            .cloned()
            .map(|s| {
                Arc::new(RssProvider::from_http(s, client.clone(), timeout)) as Arc<dyn FeedProvider>
            })
            .collect();
        Self::new(name, providers, set.keywords.clone(), fallback)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn source_count(&self) -> usize {
        self.providers.len()
    }

    /// Fan out to every source; failures come back as empty lists.
    pub async fn collect(&self) -> Vec<Vec<Article>> {
        ensure_metrics_described();
        counter!("feed_requests_total", "feed" => self.name).increment(1);
        fetcher::fetch_all(&self.providers).await
    }

    /// Aggregate fetched lists; substitute fallback articles if nothing survives.
    pub fn digest<R: Rng + ?Sized>(
        &self,
        per_source: Vec<Vec<Article>>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> FeedDigest {
        let Aggregated {
            articles,
            total,
            dropped_duplicates,
        } = aggregate(per_source, &self.keywords);

        counter!("feed_dedup_total", "feed" => self.name).increment(dropped_duplicates as u64);
        gauge!("feed_pipeline_last_run_ts", "feed" => self.name).set(now.timestamp() as f64);

        if articles.is_empty() {
            counter!("feed_fallback_total", "feed" => self.name).increment(1);
            tracing::info!(target: "ingest", feed = self.name, "no relevant articles, serving fallback");
            let articles = fallback::generate(self.fallback, now, rng);
            return FeedDigest {
                total: articles.len(),
                articles,
                status: FeedStatus::Fallback,
            };
        }

        counter!("feed_articles_kept_total", "feed" => self.name).increment(articles.len() as u64);
        tracing::debug!(
            target: "ingest",
            feed = self.name,
            kept = articles.len(),
            total,
            dedup = dropped_duplicates,
            "feed aggregated"
        );
        FeedDigest {
            articles,
            total,
            status: FeedStatus::Success,
        }
    }
}
