use relief_shared::geocode::{parse_display_name, reverse_geocode_url};
use relief_shared::{AddressLookup, GeocodeError};

/// Reverse geocoding against a Nominatim-compatible `/reverse` endpoint.
pub struct NominatimLookup {
    endpoint: String,
}

impl NominatimLookup {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(&self, lat: f64, lng: f64) -> Result<String, GeocodeError> {
        let url = reverse_geocode_url(&self.endpoint, lat, lng);
        let resp = gloo_net::http::Request::get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        if !resp.ok() {
            return Err(GeocodeError::Status(resp.status()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;
        parse_display_name(&body)
    }
}

impl AddressLookup for NominatimLookup {
    async fn lookup(&self, lat: f64, lng: f64) -> Result<String, GeocodeError> {
        let result = self.fetch(lat, lng).await;
        if let Err(e) = &result {
            web_sys::console::warn_1(
                &format!("Reverse geocode failed, using coordinates: {e}").into(),
            );
        }
        result
    }
}
