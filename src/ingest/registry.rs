// src/ingest/registry.rs
//! Built-in source registries, used when no feeds config file is present.

use crate::ingest::types::{FeedSet, SourceDescriptor};

fn source(name: &str, url: &str, category: &str, keywords: &[&str]) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        url: url.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        category: category.to_string(),
    }
}

fn words(ws: &[&str]) -> Vec<String> {
    ws.iter().map(|w| w.to_string()).collect()
}

/// Rice / basmati market news served on `/rss`.
pub fn default_rice() -> FeedSet {
    FeedSet {
        keywords: words(&[
            "rice", "basmati", "grain", "cereal", "paddy", "export", "import", "commodity",
            "price", "market", "harvest", "crop", "agriculture",
        ]),
        sources: vec![
            source(
                "Rice Market News",
                "https://news.google.com/rss/search?q=rice+market+price+export+import+basmati&hl=en-US&gl=US&ceid=US:en",
                "news",
                &["rice", "basmati", "grain", "export", "import", "price"],
            ),
            source(
                "Commodity Markets",
                "https://feeds.reuters.com/reuters/commodities",
                "news",
                &["rice", "wheat", "grain", "agriculture", "commodity"],
            ),
            source(
                "Agriculture News",
                "https://www.agriculture.com/rss",
                "news",
                &["rice", "crop", "harvest", "farm", "agriculture"],
            ),
            source(
                "Business Standard Commodities",
                "https://www.business-standard.com/rss/markets-106.rss",
                "news",
                &["rice", "basmati", "export", "commodity"],
            ),
            source(
                "The Hindu Business",
                "https://www.thehindu.com/business/feeder/default.rss",
                "news",
                &["rice", "basmati", "export", "commodity", "agriculture"],
            ),
            source(
                "Economic Times Markets",
                "https://economictimes.indiatimes.com/markets/rssfeeds/1977021501.cms",
                "news",
                &["rice", "commodity", "export", "price"],
            ),
        ],
    }
}

/// Indian agriculture and DGFT policy news served on `/indian-agri-rss`.
pub fn default_indian_agri() -> FeedSet {
    FeedSet {
        keywords: words(&[
            "agriculture", "farm", "crop", "farmer", "kisan", "mandi", "rice", "wheat",
            "pulses", "cereals", "grains", "basmati", "export", "import", "dgft", "policy",
            "subsidy", "msp", "minimum support price", "farming", "harvest", "irrigation",
            "organic", "fertilizer", "pesticide", "seed", "cultivation",
        ]),
        sources: vec![
            source(
                "DGFT Official",
                "https://dgft.gov.in/CP/",
                "policy",
                &["dgft", "export", "import", "policy", "notification", "circular"],
            ),
            source(
                "Agriculture Ministry",
                "https://pib.gov.in/RssMain.aspx?ModId=2&Lang=1&Regid=2",
                "government",
                &["agriculture", "farm", "farmer", "kisan", "crop", "subsidy", "msp"],
            ),
            source(
                "Business Standard Agriculture",
                "https://www.business-standard.com/rss/agriculture-106.rss",
                "news",
                &["agriculture", "farm", "crop", "rice", "wheat", "export", "import"],
            ),
            source(
                "The Hindu Agriculture",
                "https://www.thehindu.com/news/national/feeder/default.rss",
                "news",
                &["agriculture", "farm", "farmer", "crop", "mandi", "kisan"],
            ),
            source(
                "Economic Times Agriculture",
                "https://economictimes.indiatimes.com/rssfeeds/4719161.cms",
                "news",
                &["agriculture", "farm", "crop", "commodity", "export", "import"],
            ),
        ],
    }
}
