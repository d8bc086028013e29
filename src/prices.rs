//! # Synthetic Price Engine
//! Bounded random walk around fixed basmati baselines, steered by a coarse
//! market sentiment that is itself drawn at random on every call.
//!
//! Nothing here is price discovery: every quote is recomputed per request and
//! no state is kept between calls. Randomness is injected so callers (and
//! tests) decide whether it is seeded.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

use crate::clock::iso_timestamp;

/// Price move (USD/MT) beyond which a quote is reported as up or down.
pub const TREND_THRESHOLD: f64 = 5.0;
pub const UPDATE_FREQUENCY: &str = "120 seconds";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasmatiProduct {
    pub name: &'static str,
    pub base_price: f64,
    pub volatility: f64,
    pub specification: &'static str,
    pub packing: &'static str,
    pub port: &'static str,
}

pub const BASMATI_PRODUCTS: &[BasmatiProduct] = &[
    BasmatiProduct {
        name: "Traditional Basmati",
        base_price: 1450.0,
        volatility: 0.02,
        specification: "8.10mm max",
        packing: "50 KG PP",
        port: "Mundra",
    },
    BasmatiProduct {
        name: "Pusa White Sella",
        base_price: 1380.0,
        volatility: 0.025,
        specification: "Premium Grade",
        packing: "50 KG PP",
        port: "Nhava Sheva",
    },
    BasmatiProduct {
        name: "Steam Basmati",
        base_price: 1420.0,
        volatility: 0.018,
        specification: "8.00mm max",
        packing: "50 KG PP",
        port: "Mundra",
    },
    BasmatiProduct {
        name: "Organic Brown",
        base_price: 1580.0,
        volatility: 0.03,
        specification: "Certified",
        packing: "25 KG Jute",
        port: "Any Port",
    },
];

const EXPORT_DEMAND: &[&str] = &["strong", "moderate", "weak"];
const SUPPLY_CONDITIONS: &[&str] = &["tight", "adequate", "surplus"];
const CURRENCY_IMPACT: &[&str] = &["favorable", "neutral", "unfavorable"];
const GLOBAL_DEMAND: &[&str] = &["increasing", "stable", "decreasing"];

/// Factor states that count toward a bullish reading.
const POSITIVE_STATES: &[&str] = &["strong", "adequate", "favorable", "increasing"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    /// 3+ positive factors is bullish, 0-1 bearish, 2 neutral.
    pub fn from_positive_count(n: usize) -> Self {
        match n {
            n if n >= 3 => Sentiment::Bullish,
            0 | 1 => Sentiment::Bearish,
            _ => Sentiment::Neutral,
        }
    }

    /// Range the per-product trend factor is drawn from.
    pub fn trend_range(self) -> (f64, f64) {
        match self {
            Sentiment::Bullish => (0.005, 0.015),
            Sentiment::Bearish => (-0.015, -0.005),
            Sentiment::Neutral => (-0.005, 0.005),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentFactors {
    pub export_demand: &'static str,
    pub supply_conditions: &'static str,
    pub currency_impact: &'static str,
    pub global_demand: &'static str,
}

impl SentimentFactors {
    pub fn positive_count(&self) -> usize {
        [
            self.export_demand,
            self.supply_conditions,
            self.currency_impact,
            self.global_demand,
        ]
        .iter()
        .filter(|f| POSITIVE_STATES.contains(f))
        .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSentiment {
    pub overall_sentiment: Sentiment,
    pub factors: SentimentFactors,
    pub analysis_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub product: &'static str,
    pub specification: &'static str,
    pub packing: &'static str,
    pub port: &'static str,
    pub price: String,
    pub trend: Trend,
    pub change: Option<String>,
    pub base_price: f64,
    pub current_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBoard {
    pub status: &'static str,
    pub prices: Vec<PriceQuote>,
    pub market_sentiment: MarketSentiment,
    pub last_updated: String,
    pub update_frequency: &'static str,
}

fn pick<R: Rng + ?Sized>(pool: &[&'static str], rng: &mut R) -> &'static str {
    pool.choose(rng).copied().unwrap_or_default()
}

pub fn market_sentiment<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> MarketSentiment {
    let factors = SentimentFactors {
        export_demand: pick(EXPORT_DEMAND, rng),
        supply_conditions: pick(SUPPLY_CONDITIONS, rng),
        currency_impact: pick(CURRENCY_IMPACT, rng),
        global_demand: pick(GLOBAL_DEMAND, rng),
    };
    MarketSentiment {
        overall_sentiment: Sentiment::from_positive_count(factors.positive_count()),
        factors,
        analysis_time: iso_timestamp(now),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Classify a move against the base and render the signed change string.
pub fn classify_change(delta: f64) -> (Trend, Option<String>) {
    if delta > TREND_THRESHOLD {
        (Trend::Up, Some(format!("+${:.1}", delta.abs())))
    } else if delta < -TREND_THRESHOLD {
        (Trend::Down, Some(format!("-${:.1}", delta.abs())))
    } else {
        (Trend::Stable, None)
    }
}

/// `$1,452` style: whole dollars with thousands separators.
pub fn format_usd(price: f64) -> String {
    let whole = price.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if whole < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn quote<R: Rng + ?Sized>(product: &BasmatiProduct, sentiment: Sentiment, rng: &mut R) -> PriceQuote {
    let (lo, hi) = sentiment.trend_range();
    let trend_factor = rng.random_range(lo..=hi);
    let vol = product.volatility;
    let volatility_factor = rng.random_range(-vol..=vol);

    let current_price = round2(product.base_price * (1.0 + trend_factor + volatility_factor));
    let (trend, change) = classify_change(current_price - product.base_price);

    PriceQuote {
        product: product.name,
        specification: product.specification,
        packing: product.packing,
        port: product.port,
        price: format_usd(current_price),
        trend,
        change,
        base_price: product.base_price,
        current_price,
    }
}

/// One full board: fresh sentiment, then one quote per product in table order.
pub fn live_prices<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> PriceBoard {
    let market_sentiment = market_sentiment(now, rng);
    let prices = BASMATI_PRODUCTS
        .iter()
        .map(|p| quote(p, market_sentiment.overall_sentiment, rng))
        .collect();
    PriceBoard {
        status: "success",
        prices,
        market_sentiment,
        last_updated: iso_timestamp(now),
        update_frequency: UPDATE_FREQUENCY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn sentiment_thresholds() {
        assert_eq!(Sentiment::from_positive_count(4), Sentiment::Bullish);
        assert_eq!(Sentiment::from_positive_count(3), Sentiment::Bullish);
        assert_eq!(Sentiment::from_positive_count(2), Sentiment::Neutral);
        assert_eq!(Sentiment::from_positive_count(1), Sentiment::Bearish);
        assert_eq!(Sentiment::from_positive_count(0), Sentiment::Bearish);
    }

    #[test]
    fn positives_counted_from_factor_states() {
        let f = SentimentFactors {
            export_demand: "strong",
            supply_conditions: "surplus",
            currency_impact: "favorable",
            global_demand: "stable",
        };
        assert_eq!(f.positive_count(), 2);
    }

    #[test]
    fn quotes_stay_within_trend_plus_volatility_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            for s in [Sentiment::Bullish, Sentiment::Bearish, Sentiment::Neutral] {
                for p in BASMATI_PRODUCTS {
                    let q = quote(p, s, &mut rng);
                    let (lo, hi) = s.trend_range();
                    let min = p.base_price * (1.0 + lo - p.volatility) - 0.01;
                    let max = p.base_price * (1.0 + hi + p.volatility) + 0.01;
                    assert!(
                        q.current_price >= min && q.current_price <= max,
                        "{} {:?}: {} not in [{min}, {max}]",
                        p.name,
                        s,
                        q.current_price
                    );
                }
            }
        }
    }

    #[test]
    fn change_classification() {
        assert_eq!(classify_change(5.0), (Trend::Stable, None));
        assert_eq!(classify_change(-5.0), (Trend::Stable, None));
        assert_eq!(classify_change(12.34), (Trend::Up, Some("+$12.3".into())));
        assert_eq!(classify_change(-7.06), (Trend::Down, Some("-$7.1".into())));
    }

    #[test]
    fn usd_display_groups_thousands() {
        assert_eq!(format_usd(1452.49), "$1,452");
        assert_eq!(format_usd(999.5), "$1,000");
        assert_eq!(format_usd(1234567.0), "$1,234,567");
        assert_eq!(format_usd(12.0), "$12");
    }

    #[test]
    fn board_has_one_quote_per_product_in_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let b = live_prices(Utc::now(), &mut rng);
        let names: Vec<_> = b.prices.iter().map(|q| q.product).collect();
        assert_eq!(
            names,
            vec!["Traditional Basmati", "Pusa White Sella", "Steam Basmati", "Organic Brown"]
        );
        assert_eq!(b.update_frequency, "120 seconds");
        for q in &b.prices {
            assert_eq!(q.trend == Trend::Stable, q.change.is_none());
        }
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let now = Utc::now();
        let a = live_prices(now, &mut StdRng::seed_from_u64(11));
        let b = live_prices(now, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
