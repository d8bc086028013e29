// src/postal/zippopotam.rs
//! Zippopotam.us (`GET {base}/{country}/{code}`), used for the US, Canada,
//! Germany, France and Australia.

use serde::Deserialize;

use super::{CountryRule, PincodeLookup, PostalAddress, PostalClient, PostalError};

#[derive(Debug, Deserialize)]
pub struct ZipReply {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
pub struct Place {
    #[serde(rename = "place name")]
    pub place_name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(rename = "state abbreviation", default)]
    pub state_abbreviation: Option<String>,
}

/// Pick the +1 service. Canada is only indexed by forward sortation area
/// (the first three characters).
pub fn north_america_route(pincode: &str) -> (&'static str, String) {
    if pincode.len() == 5 && pincode.chars().all(|c| c.is_ascii_digit()) {
        ("us", pincode.to_string())
    } else {
        ("ca", pincode.chars().take(3).collect())
    }
}

/// Country name for a +1 route slug.
pub fn north_america_country(slug: &str) -> &'static str {
    if slug == "ca" {
        "Canada"
    } else {
        "United States"
    }
}

pub fn to_address(reply: &ZipReply, rule: &CountryRule, pincode: &str) -> Option<PostalAddress> {
    let head = reply.places.first()?;
    let place = head.place_name.trim().to_string();
    let state = head
        .state
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string();
    Some(PostalAddress {
        area: place.clone(),
        town: place.clone(),
        city: place,
        district: head
            .state_abbreviation
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string(),
        state,
        country: reply
            .country
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| rule.country.to_string()),
        postal_code: pincode.to_string(),
        areas: reply.places.iter().map(|p| p.place_name.trim().to_string()).collect(),
    })
}

/// `query` is what goes in the URL (may be shorter than `pincode` for Canada).
pub async fn lookup(
    client: &PostalClient,
    base: &str,
    slug: &str,
    query: &str,
    rule: &CountryRule,
    pincode: &str,
) -> Result<PincodeLookup, PostalError> {
    let url = format!("{}/{}/{}", base.trim_end_matches('/'), slug, query);
    let reply: Option<ZipReply> = client.get_json(&url).await?;

    Ok(match reply.as_ref().and_then(|r| to_address(r, rule, pincode)) {
        Some(addr) => PincodeLookup::found(rule, pincode, addr),
        None => PincodeLookup::not_found(rule, pincode, format!("No location found for postal code {pincode}")),
    })
}
