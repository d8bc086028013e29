// src/postal/india.rs
//! India Post PIN code directory (`GET {base}/pincode/{pin}`).
//!
//! Reply is a one-element array: `[{"Status": "Success", "PostOffice": [...]}]`.
//! `Status` is "Error" (with `PostOffice: null`) for unknown codes.

use serde::Deserialize;

use super::{CountryRule, PincodeLookup, PostalAddress, PostalClient, PostalError};

#[derive(Debug, Deserialize)]
pub struct IndiaPostReply {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "PostOffice", default)]
    pub post_office: Option<Vec<PostOffice>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostOffice {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Block", default)]
    pub block: Option<String>,
    #[serde(rename = "Division", default)]
    pub division: Option<String>,
    #[serde(rename = "District", default)]
    pub district: Option<String>,
    #[serde(rename = "State", default)]
    pub state: Option<String>,
    #[serde(rename = "Country", default)]
    pub country: Option<String>,
}

fn non_empty(v: Option<&String>) -> Option<String> {
    v.map(|s| s.trim())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("NA"))
        .map(str::to_string)
}

/// Map the decoded reply to an address. `None` when no post office is listed.
pub fn to_address(reply: &[IndiaPostReply], pincode: &str) -> Option<PostalAddress> {
    let first = reply.first()?;
    if !first.status.eq_ignore_ascii_case("success") {
        return None;
    }
    let offices = first.post_office.as_deref().filter(|o| !o.is_empty())?;
    let head = &offices[0];

    let district = non_empty(head.district.as_ref()).unwrap_or_default();
    Some(PostalAddress {
        area: head.name.trim().to_string(),
        town: non_empty(head.block.as_ref())
            .or_else(|| non_empty(head.division.as_ref()))
            .unwrap_or_else(|| head.name.trim().to_string()),
        city: district.clone(),
        district,
        state: non_empty(head.state.as_ref()).unwrap_or_default(),
        country: non_empty(head.country.as_ref()).unwrap_or_else(|| "India".to_string()),
        postal_code: pincode.to_string(),
        areas: offices.iter().map(|o| o.name.trim().to_string()).collect(),
    })
}

pub async fn lookup(
    client: &PostalClient,
    base: &str,
    rule: &CountryRule,
    pincode: &str,
) -> Result<PincodeLookup, PostalError> {
    let url = format!("{}/pincode/{}", base.trim_end_matches('/'), pincode);
    let reply: Option<Vec<IndiaPostReply>> = client.get_json(&url).await?;

    Ok(match reply.as_deref().and_then(|r| to_address(r, pincode)) {
        Some(addr) => PincodeLookup::found(rule, pincode, addr),
        None => PincodeLookup::not_found(rule, pincode, format!("No post office found for PIN code {pincode}")),
    })
}
