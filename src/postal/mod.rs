//! # Country-Routed Postal Lookup
//! A static table maps a dial code to a lookup strategy. Each strategy talks
//! to one upstream service and normalizes its reply into [`PostalAddress`].
//!
//! Outcomes:
//! - bad input (missing code, unknown country, wrong length or characters)
//!   is a [`PostalError`] the API turns into a 400;
//! - upstream non-2xx or an unexpected body is a structured not-found result;
//! - a transport failure is [`PostalError::Unavailable`], which the service
//!   turns into a manual-entry result that is never cached;
//! - countries without an integrated upstream answer with a manual-entry
//!   result straight away.

pub mod india;
pub mod uk;
pub mod zippopotam;

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::cache::{cache_key, LookupCache};

pub const DEFAULT_INDIA_POST_BASE: &str = "https://api.postalpincode.in";
pub const DEFAULT_ZIPPOPOTAM_BASE: &str = "https://api.zippopotam.us";
pub const DEFAULT_POSTCODES_IO_BASE: &str = "https://api.postcodes.io";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    IndiaPost,
    /// +1: five digits go to the US service, six characters to Canada.
    NorthAmerica,
    /// Zippopotam country slug.
    Zippopotam(&'static str),
    PostcodesIo,
    ManualEntry,
}

impl Strategy {
    pub fn label(self) -> &'static str {
        match self {
            Strategy::IndiaPost => "india_post",
            Strategy::NorthAmerica | Strategy::Zippopotam(_) => "zippopotam",
            Strategy::PostcodesIo => "postcodes_io",
            Strategy::ManualEntry => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryRule {
    pub dial_code: &'static str,
    pub country: &'static str,
    pub iso: &'static str,
    /// Accepted lengths after normalization. Empty means any length.
    pub lengths: &'static [usize],
    pub numeric_only: bool,
    pub strategy: Strategy,
}

pub const COUNTRY_RULES: &[CountryRule] = &[
    CountryRule {
        dial_code: "+91",
        country: "India",
        iso: "IN",
        lengths: &[6],
        numeric_only: true,
        strategy: Strategy::IndiaPost,
    },
    CountryRule {
        dial_code: "+1",
        country: "United States / Canada",
        iso: "US",
        lengths: &[5, 6],
        numeric_only: false,
        strategy: Strategy::NorthAmerica,
    },
    CountryRule {
        dial_code: "+44",
        country: "United Kingdom",
        iso: "GB",
        lengths: &[5, 6, 7],
        numeric_only: false,
        strategy: Strategy::PostcodesIo,
    },
    CountryRule {
        dial_code: "+49",
        country: "Germany",
        iso: "DE",
        lengths: &[5],
        numeric_only: true,
        strategy: Strategy::Zippopotam("de"),
    },
    CountryRule {
        dial_code: "+33",
        country: "France",
        iso: "FR",
        lengths: &[5],
        numeric_only: true,
        strategy: Strategy::Zippopotam("fr"),
    },
    CountryRule {
        dial_code: "+61",
        country: "Australia",
        iso: "AU",
        lengths: &[4],
        numeric_only: true,
        strategy: Strategy::Zippopotam("au"),
    },
    CountryRule {
        dial_code: "+971",
        country: "United Arab Emirates",
        iso: "AE",
        lengths: &[],
        numeric_only: false,
        strategy: Strategy::ManualEntry,
    },
    CountryRule {
        dial_code: "+966",
        country: "Saudi Arabia",
        iso: "SA",
        lengths: &[5],
        numeric_only: true,
        strategy: Strategy::ManualEntry,
    },
    CountryRule {
        dial_code: "+65",
        country: "Singapore",
        iso: "SG",
        lengths: &[6],
        numeric_only: true,
        strategy: Strategy::ManualEntry,
    },
    CountryRule {
        dial_code: "+880",
        country: "Bangladesh",
        iso: "BD",
        lengths: &[4],
        numeric_only: true,
        strategy: Strategy::ManualEntry,
    },
    CountryRule {
        dial_code: "+977",
        country: "Nepal",
        iso: "NP",
        lengths: &[5],
        numeric_only: true,
        strategy: Strategy::ManualEntry,
    },
    CountryRule {
        dial_code: "+94",
        country: "Sri Lanka",
        iso: "LK",
        lengths: &[5],
        numeric_only: true,
        strategy: Strategy::ManualEntry,
    },
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostalError {
    #[error("Pincode is required")]
    MissingPincode,
    #[error("Country code {0} is not supported")]
    UnsupportedCountry(String),
    #[error("Invalid postal code length for {country}: expected {expected} characters, got {got}")]
    InvalidLength {
        country: &'static str,
        expected: String,
        got: usize,
    },
    #[error("Invalid postal code for {country}: {reason}")]
    InvalidCharacters {
        country: &'static str,
        reason: &'static str,
    },
    #[error("postal lookup service unavailable: {0}")]
    Unavailable(String),
}

/// Common address record every strategy normalizes into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostalAddress {
    pub area: String,
    pub town: String,
    pub city: String,
    pub district: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    /// Every locality the upstream listed for the code.
    pub areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PincodeLookup {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PostalAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub country: String,
    pub pincode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_entry_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl PincodeLookup {
    pub fn found(rule: &CountryRule, pincode: &str, address: PostalAddress) -> Self {
        Self {
            success: true,
            data: Some(address),
            message: None,
            country: rule.country.to_string(),
            pincode: pincode.to_string(),
            manual_entry_required: None,
            cached: None,
        }
    }

    pub fn not_found(rule: &CountryRule, pincode: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            country: rule.country.to_string(),
            pincode: pincode.to_string(),
            manual_entry_required: None,
            cached: None,
        }
    }

    pub fn manual_entry(rule: &CountryRule, pincode: &str, message: impl Into<String>) -> Self {
        Self {
            manual_entry_required: Some(true),
            ..Self::not_found(rule, pincode, message)
        }
    }
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "postal_lookups_total",
            "Postal lookups by strategy and outcome (found, not_found, manual, unavailable)."
        );
    });
}

/// `" 91"`, `"+91"`, `"91"` all become `"+91"`. A `+` in a query string that
/// was not percent-encoded arrives as a space, hence the trim.
pub fn normalize_country_code(raw: &str) -> String {
    let digits = raw.trim().trim_start_matches('+').trim();
    format!("+{digits}")
}

/// Remove all whitespace and upper-case (`"sw1a 1aa"` → `"SW1A1AA"`).
pub fn normalize_pincode(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

pub fn find_rule(dial_code: &str) -> Option<&'static CountryRule> {
    COUNTRY_RULES.iter().find(|r| r.dial_code == dial_code)
}

/// Check a normalized code against the rule's length and character constraints.
pub fn validate(rule: &CountryRule, pincode: &str) -> Result<(), PostalError> {
    if pincode.is_empty() {
        return Err(PostalError::MissingPincode);
    }
    let len = pincode.chars().count();
    if !rule.lengths.is_empty() && !rule.lengths.contains(&len) {
        let expected = rule
            .lengths
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        return Err(PostalError::InvalidLength {
            country: rule.country,
            expected,
            got: len,
        });
    }
    if rule.numeric_only && !pincode.chars().all(|c| c.is_ascii_digit()) {
        return Err(PostalError::InvalidCharacters {
            country: rule.country,
            reason: "only digits are allowed",
        });
    }
    if !pincode.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PostalError::InvalidCharacters {
            country: rule.country,
            reason: "only letters and digits are allowed",
        });
    }
    if rule.strategy == Strategy::NorthAmerica && len == 5 && !pincode.chars().all(|c| c.is_ascii_digit()) {
        return Err(PostalError::InvalidCharacters {
            country: rule.country,
            reason: "US ZIP codes are five digits",
        });
    }
    Ok(())
}

/// Upstream base URLs; overridable so tests can point at local mocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalEndpoints {
    pub india_post: String,
    pub zippopotam: String,
    pub postcodes_io: String,
}

impl Default for PostalEndpoints {
    fn default() -> Self {
        Self {
            india_post: DEFAULT_INDIA_POST_BASE.to_string(),
            zippopotam: DEFAULT_ZIPPOPOTAM_BASE.to_string(),
            postcodes_io: DEFAULT_POSTCODES_IO_BASE.to_string(),
        }
    }
}

/// HTTP side of the lookup: one call per strategy, no caching.
#[derive(Clone)]
pub struct PostalClient {
    http: reqwest::Client,
    endpoints: PostalEndpoints,
    timeout: Duration,
}

impl PostalClient {
    pub fn new(http: reqwest::Client, endpoints: PostalEndpoints, timeout: Duration) -> Self {
        Self {
            http,
            endpoints,
            timeout,
        }
    }

    /// GET `url` and decode JSON. `Ok(None)` for non-2xx or a body that does
    /// not match `T`; `Err` only when the service could not be reached.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, PostalError> {
        let resp = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PostalError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(%url, %status, "postal upstream returned non-success");
            return Ok(None);
        }
        let body = resp
            .text()
            .await
            .map_err(|e| PostalError::Unavailable(e.to_string()))?;
        match serde_json::from_str::<T>(&body) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(%url, error = %e, "postal upstream body has unexpected shape");
                Ok(None)
            }
        }
    }

    /// Resolve an already validated code through the rule's strategy.
    pub async fn lookup(&self, rule: &CountryRule, pincode: &str) -> Result<PincodeLookup, PostalError> {
        match rule.strategy {
            Strategy::IndiaPost => india::lookup(self, &self.endpoints.india_post, rule, pincode).await,
            Strategy::NorthAmerica => {
                let (slug, query) = zippopotam::north_america_route(pincode);
                let mut out =
                    zippopotam::lookup(self, &self.endpoints.zippopotam, slug, &query, rule, pincode).await?;
                out.country = zippopotam::north_america_country(slug).to_string();
                Ok(out)
            }
            Strategy::Zippopotam(slug) => {
                zippopotam::lookup(self, &self.endpoints.zippopotam, slug, pincode, rule, pincode).await
            }
            Strategy::PostcodesIo => uk::lookup(self, &self.endpoints.postcodes_io, rule, pincode).await,
            Strategy::ManualEntry => Ok(manual_only(rule, pincode)),
        }
    }
}

fn manual_only(rule: &CountryRule, pincode: &str) -> PincodeLookup {
    PincodeLookup::manual_entry(
        rule,
        pincode,
        format!(
            "Automatic lookup is not available for {}. Please enter your address manually.",
            rule.country
        ),
    )
}

/// Validation, dispatch and caching in front of [`PostalClient`].
pub struct PostalService {
    client: PostalClient,
    cache: Arc<LookupCache<PincodeLookup>>,
}

impl PostalService {
    pub fn new(client: PostalClient, cache: Arc<LookupCache<PincodeLookup>>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<LookupCache<PincodeLookup>> {
        &self.cache
    }

    /// Full lookup for raw query parameters. Only validation problems are
    /// returned as errors; everything else is a well-formed result.
    pub async fn resolve(&self, raw_pincode: &str, raw_country_code: &str) -> Result<PincodeLookup, PostalError> {
        ensure_metrics_described();

        let pincode = normalize_pincode(raw_pincode);
        if pincode.is_empty() {
            return Err(PostalError::MissingPincode);
        }
        let dial_code = normalize_country_code(raw_country_code);
        let rule = find_rule(&dial_code).ok_or_else(|| PostalError::UnsupportedCountry(dial_code.clone()))?;
        validate(rule, &pincode)?;

        if rule.strategy == Strategy::ManualEntry {
            counter!("postal_lookups_total", "strategy" => rule.strategy.label(), "outcome" => "manual").increment(1);
            return Ok(manual_only(rule, &pincode));
        }

        let key = cache_key(&[rule.dial_code, &pincode]);
        let result = self
            .cache
            .get_or_fetch(&key, || self.client.lookup(rule, &pincode))
            .await;

        match result {
            Ok(hit) => {
                let outcome = if hit.value.success { "found" } else { "not_found" };
                counter!("postal_lookups_total", "strategy" => rule.strategy.label(), "outcome" => outcome)
                    .increment(1);
                Ok(PincodeLookup {
                    cached: Some(hit.cached),
                    ..hit.value
                })
            }
            Err(PostalError::Unavailable(reason)) => {
                counter!("postal_lookups_total", "strategy" => rule.strategy.label(), "outcome" => "unavailable")
                    .increment(1);
                tracing::warn!(country = rule.country, %pincode, %reason, "postal lookup service unavailable");
                Ok(PincodeLookup::manual_entry(
                    rule,
                    &pincode,
                    "Postal lookup service is temporarily unavailable. Please enter your address manually.",
                ))
            }
            Err(e) => Err(e),
        }
    }
}
