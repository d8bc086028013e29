// src/postal/uk.rs
//! postcodes.io (`GET {base}/postcodes/{postcode}`).

use serde::Deserialize;

use super::{CountryRule, PincodeLookup, PostalAddress, PostalClient, PostalError};

#[derive(Debug, Deserialize)]
pub struct PostcodesReply {
    pub status: u16,
    pub result: Option<PostcodeResult>,
}

#[derive(Debug, Deserialize)]
pub struct PostcodeResult {
    pub postcode: String,
    /// Constituent country (England, Scotland, ...).
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub admin_district: Option<String>,
    #[serde(default)]
    pub admin_county: Option<String>,
    #[serde(default)]
    pub admin_ward: Option<String>,
    #[serde(default)]
    pub parish: Option<String>,
}

fn first_of(options: &[&Option<String>]) -> String {
    options
        .iter()
        .filter_map(|o| o.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

pub fn to_address(reply: &PostcodesReply, rule: &CountryRule) -> Option<PostalAddress> {
    if reply.status != 200 {
        return None;
    }
    let r = reply.result.as_ref()?;
    let area = first_of(&[&r.admin_ward, &r.parish]);
    let areas = [&r.admin_ward, &r.parish]
        .iter()
        .filter_map(|o| o.as_deref())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .fold(Vec::new(), |mut acc, s| {
            if !acc.contains(&s) {
                acc.push(s);
            }
            acc
        });
    Some(PostalAddress {
        area,
        town: first_of(&[&r.parish, &r.admin_ward, &r.admin_district]),
        city: first_of(&[&r.admin_district, &r.admin_county]),
        district: first_of(&[&r.admin_county, &r.admin_district]),
        state: first_of(&[&r.region, &r.country]),
        country: rule.country.to_string(),
        postal_code: r.postcode.clone(),
        areas,
    })
}

pub async fn lookup(
    client: &PostalClient,
    base: &str,
    rule: &CountryRule,
    pincode: &str,
) -> Result<PincodeLookup, PostalError> {
    let url = format!("{}/postcodes/{}", base.trim_end_matches('/'), pincode);
    let reply: Option<PostcodesReply> = client.get_json(&url).await?;

    Ok(match reply.as_ref().and_then(|r| to_address(r, rule)) {
        Some(addr) => PincodeLookup::found(rule, pincode, addr),
        None => PincodeLookup::not_found(rule, pincode, format!("Postcode {pincode} not found")),
    })
}
