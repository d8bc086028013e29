// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One upstream feed: where to fetch it and what makes an item relevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "news".to_string()
}

/// A registry of sources plus the broader keyword set applied after fan-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSet {
    pub keywords: Vec<String>,
    pub sources: Vec<SourceDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    /// Source-native timestamp string, never reparsed.
    pub published: String,
    pub summary: String,
    pub source: String,
    #[serde(rename = "type")]
    pub category: String,
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch_articles(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &str;
}
