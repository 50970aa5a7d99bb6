use serde::Deserialize;

use crate::error::GeocodeError;
use crate::location::SelectedLocation;

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
}

/// A reverse-geocoding backend. Failures are reported, never hidden here.
#[allow(async_fn_in_trait)]
pub trait AddressLookup {
    async fn lookup(&self, lat: f64, lng: f64) -> Result<String, GeocodeError>;
}

/// `"<lat>, <lng>"` with six decimals each.
pub fn fallback_address(lat: f64, lng: f64) -> String {
    format!("{lat:.6}, {lng:.6}")
}

pub fn reverse_geocode_url(endpoint: &str, lat: f64, lng: f64) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}format=json&lat={lat}&lon={lng}")
}

/// Extract a usable `display_name` from a reverse-geocode response body.
pub fn parse_display_name(body: &str) -> Result<String, GeocodeError> {
    let parsed: ReverseResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;
    parsed
        .display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or(GeocodeError::MissingAddress)
}

/// Best-effort address: the lookup result, or the coordinate fallback.
pub async fn resolve_address<L: AddressLookup>(lookup: &L, lat: f64, lng: f64) -> String {
    match lookup.lookup(lat, lng).await {
        Ok(address) if !address.trim().is_empty() => address,
        _ => fallback_address(lat, lng),
    }
}

/// Build the committed selection for a coordinate pair.
pub async fn locate<L: AddressLookup>(lookup: &L, lat: f64, lng: f64) -> SelectedLocation {
    let address = resolve_address(lookup, lat, lng).await;
    SelectedLocation::new(lat, lng, Some(address))
}
