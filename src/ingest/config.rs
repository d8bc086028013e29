// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::registry;
use crate::ingest::types::FeedSet;

pub const ENV_FEEDS_CONFIG_PATH: &str = "FEEDS_CONFIG_PATH";
pub const DEFAULT_FEEDS_CONFIG_PATH: &str = "config/feeds.toml";

/// Both registries served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedsConfig {
    pub rice: FeedSet,
    pub indian_agri: FeedSet,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            rice: registry::default_rice(),
            indian_agri: registry::default_indian_agri(),
        }
    }
}

/// Load feed registries from an explicit TOML path.
pub fn load_feeds_from(path: &Path) -> Result<FeedsConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feeds config from {}", path.display()))?;
    parse_feeds(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Load feed registries using env var + fallbacks:
/// 1) $FEEDS_CONFIG_PATH (must exist)
/// 2) config/feeds.toml
/// 3) built-in registries
pub fn load_feeds_default() -> Result<FeedsConfig> {
    if let Ok(p) = std::env::var(ENV_FEEDS_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feeds_from(&pb);
        } else {
            return Err(anyhow!("FEEDS_CONFIG_PATH points to non-existent path"));
        }
    }
    let default_p = PathBuf::from(DEFAULT_FEEDS_CONFIG_PATH);
    if default_p.exists() {
        return load_feeds_from(&default_p);
    }
    Ok(FeedsConfig::default())
}

fn parse_feeds(s: &str) -> Result<FeedsConfig> {
    let mut cfg: FeedsConfig = toml::from_str(s)?;
    clean_set(&mut cfg.rice);
    clean_set(&mut cfg.indian_agri);
    for (name, set) in [("rice", &cfg.rice), ("indian_agri", &cfg.indian_agri)] {
        if set.sources.is_empty() {
            return Err(anyhow!("feed set `{name}` has no sources"));
        }
        if let Some(bad) = set.sources.iter().find(|s| s.url.trim().is_empty()) {
            return Err(anyhow!("source `{}` in `{name}` has an empty url", bad.name));
        }
        for s in set.sources.iter().filter(|s| s.keywords.is_empty()) {
            tracing::warn!(target: "ingest", feed = name, source = %s.name, "source has no keywords and will contribute nothing");
        }
    }
    Ok(cfg)
}

/// Lower-case and trim keywords, drop empties and duplicates (first wins).
fn clean_set(set: &mut FeedSet) {
    set.keywords = clean_keywords(std::mem::take(&mut set.keywords));
    for s in &mut set.sources {
        s.keywords = clean_keywords(std::mem::take(&mut s.keywords));
        s.name = s.name.trim().to_string();
        s.url = s.url.trim().to_string();
    }
}

fn clean_keywords(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
