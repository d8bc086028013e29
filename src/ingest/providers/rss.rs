// src/ingest/providers/rss.rs
//! RSS 2.0 / Atom provider. Fetches one registered source over HTTP (or reads
//! an embedded fixture), keeps the first entries that match the source's own
//! keywords, and maps them into [`Article`]s.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::ingest::types::{Article, FeedProvider, SourceDescriptor};
use crate::ingest::{contains_any_keyword, normalize_text, truncate_chars};

/// Entries considered per source, in document order.
pub const MAX_ENTRIES_PER_SOURCE: usize = 10;
pub const SUMMARY_MAX_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Source-agnostic entry shape shared by both formats.
struct Entry {
    title: String,
    link: String,
    published: Option<String>,
    summary: String,
}

/// Local name of the document's first element.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase())
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn parse_entries(xml: &str) -> Result<Vec<Entry>> {
    let xml_clean = scrub_html_entities_for_xml(xml);

    let root = root_element(&xml_clean).unwrap_or_default();
    if root != "rss" && root != "feed" {
        anyhow::bail!("not a feed document (root element `{root}`)");
    }

    if root == "rss" {
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
        return Ok(rss
            .channel
            .item
            .into_iter()
            .map(|it| Entry {
                title: it.title.unwrap_or_default(),
                link: it.link.unwrap_or_default(),
                published: it.pub_date,
                summary: it.description.unwrap_or_default(),
            })
            .collect());
    }

    let atom: AtomFeed = from_str(&xml_clean).context("parsing atom xml")?;
    Ok(atom
        .entry
        .into_iter()
        .map(|e| {
            let link = e
                .link
                .iter()
                .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                .or_else(|| e.link.first())
                .and_then(|l| l.href.clone())
                .unwrap_or_default();
            Entry {
                title: e.title.map(|t| t.value).unwrap_or_default(),
                link,
                published: e.published.or(e.updated),
                summary: e
                    .summary
                    .or(e.content)
                    .map(|t| t.value)
                    .unwrap_or_default(),
            }
        })
        .collect())
}

/// Parse a feed document into articles for `source`.
///
/// Only the first [`MAX_ENTRIES_PER_SOURCE`] entries are looked at; an entry
/// is kept when its lower-cased `title + summary` contains one of the
/// source's keywords. The match runs on the whole summary; only the stored
/// copy is cut to [`SUMMARY_MAX_CHARS`]. A source without keywords keeps
/// nothing. `fallback_published` fills in entries that carry no date.
pub fn articles_from_xml(
    xml: &str,
    source: &SourceDescriptor,
    fallback_published: &str,
) -> Result<Vec<Article>> {
    let t0 = std::time::Instant::now();
    let entries = parse_entries(xml).with_context(|| format!("source {}", source.name))?;

    let mut out = Vec::new();
    for e in entries.into_iter().take(MAX_ENTRIES_PER_SOURCE) {
        let title = normalize_text(&e.title);
        if title.is_empty() {
            continue;
        }
        let full_summary = normalize_text(&e.summary);
        if !contains_any_keyword(&title, &full_summary, &source.keywords) {
            continue;
        }
        let summary = truncate_chars(&full_summary, SUMMARY_MAX_CHARS);

        out.push(Article {
            title,
            link: e.link.trim().to_string(),
            published: e
                .published
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| fallback_published.to_string()),
            summary,
            source: source.name.clone(),
            category: source.category.clone(),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    Ok(out)
}

pub struct RssProvider {
    source: SourceDescriptor,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        timeout: Duration,
    },
}

impl RssProvider {
    pub fn from_fixture(source: SourceDescriptor, xml: &str) -> Self {
        Self {
            source,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_http(source: SourceDescriptor, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            source,
            mode: Mode::Http { client, timeout },
        }
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }
}

#[async_trait]
impl FeedProvider for RssProvider {
    async fn fetch_articles(&self) -> Result<Vec<Article>> {
        let now = crate::clock::iso_timestamp(chrono::Utc::now());
        match &self.mode {
            Mode::Fixture(xml) => articles_from_xml(xml, &self.source, &now),
            Mode::Http { client, timeout } => {
                let t0 = std::time::Instant::now();
                let resp = client
                    .get(&self.source.url)
                    .timeout(*timeout)
                    .send()
                    .await
                    .with_context(|| format!("GET {}", self.source.url))?
                    .error_for_status()
                    .with_context(|| format!("status from {}", self.source.url))?;
                let body = resp.text().await.context("feed body .text()")?;
                histogram!("feed_fetch_ms", "source" => self.source.name.clone())
                    .record(t0.elapsed().as_secs_f64() * 1_000.0);
                counter!("feed_bytes_total").increment(body.len() as u64);
                articles_from_xml(&body, &self.source, &now)
            }
        }
    }

    fn name(&self) -> &str {
        &self.source.name
    }
}

/// Common HTML entities that are not defined in XML and break the parser.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
        .replace("&rupee;", "Rs")
}
