// src/ingest/fallback.rs
//! Synthetic placeholder articles served when no real article survives
//! filtering. Responses carrying these are marked `status: "fallback"`.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::clock::iso_timestamp;
use crate::ingest::types::Article;

pub const FALLBACK_COUNT: usize = 2;

/// Format stamped into every fallback title.
pub const FALLBACK_TS_FORMAT: &str = "%Y-%m-%d %H:%M";

const RICE_TRENDS: &[&str] = &["rising", "falling", "stable", "volatile", "strengthening"];
const RICE_CONDITIONS: &[&str] = &[
    "strong export demand",
    "supply constraints",
    "good monsoon",
    "trade negotiations",
];
const AGRI_CROPS: &[&str] = &[
    "rice", "wheat", "pulses", "sugarcane", "cotton", "maize", "millets",
];

/// Which phrase pool a feed falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    Rice,
    IndianAgri,
}

fn pick<'a, R: Rng + ?Sized>(pool: &[&'a str], rng: &mut R) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

fn placeholder(title: String, link: &str, summary: &str, source: &str, category: &str, published: &str) -> Article {
    Article {
        title,
        link: link.to_string(),
        published: published.to_string(),
        summary: summary.to_string(),
        source: source.to_string(),
        category: category.to_string(),
    }
}

/// Build exactly [`FALLBACK_COUNT`] articles for `kind` at time `now`.
pub fn generate<R: Rng + ?Sized>(kind: FallbackKind, now: DateTime<Utc>, rng: &mut R) -> Vec<Article> {
    let stamp = now.format(FALLBACK_TS_FORMAT).to_string();
    let published = iso_timestamp(now);

    match kind {
        FallbackKind::Rice => vec![
            placeholder(
                format!(
                    "Basmati rice prices {} amid {} - {stamp}",
                    pick(RICE_TRENDS, rng),
                    pick(RICE_CONDITIONS, rng)
                ),
                "#",
                "Latest updates on basmati rice prices and market conditions",
                "Market Intelligence",
                "price",
                &published,
            ),
            placeholder(
                format!(
                    "Rice export demand {} in international markets - {stamp}",
                    pick(RICE_TRENDS, rng)
                ),
                "#",
                "International demand for Indian rice shows significant changes",
                "Trade Watch",
                "export",
                &published,
            ),
        ],
        FallbackKind::IndianAgri => vec![
            placeholder(
                format!(
                    "DGFT updates agricultural export policy for {} - {stamp}",
                    pick(AGRI_CROPS, rng)
                ),
                "https://dgft.gov.in",
                "Latest DGFT notifications for agricultural exports and policy updates",
                "DGFT Official",
                "policy",
                &published,
            ),
            placeholder(
                format!(
                    "Government announces new subsidy scheme for {} farmers - {stamp}",
                    pick(AGRI_CROPS, rng)
                ),
                "https://pib.gov.in",
                "New agricultural subsidy schemes announced for farmers welfare",
                "Agriculture Ministry",
                "subsidy",
                &published,
            ),
        ],
    }
}
