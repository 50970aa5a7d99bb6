use serde::{Deserialize, Serialize};

/// One fix reported by the platform location API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoSample {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_meters: f64,
    pub captured_at_ms: f64,
}

impl GeoSample {
    pub fn meets(&self, threshold_meters: f64) -> bool {
        self.accuracy_meters <= threshold_meters
    }
}

/// The value a form stores as its `locationData`.
///
/// Never mutated after construction; a new selection replaces the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl SelectedLocation {
    pub fn new(lat: f64, lng: f64, address: Option<String>) -> Self {
        Self { lat, lng, address }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Address if known, otherwise the coordinate pair.
    pub fn display_label(&self) -> String {
        match self.address.as_deref() {
            Some(address) if !address.trim().is_empty() => address.to_string(),
            _ => crate::geocode::fallback_address(self.lat, self.lng),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Caller-owned descriptor for one marker in the batch layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub position: LatLng,
    #[serde(default)]
    pub popup_html: Option<String>,
    #[serde(default)]
    pub color_hex: Option<String>,
}

impl MarkerSpec {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            position: LatLng::new(lat, lng),
            popup_html: None,
            color_hex: None,
        }
    }

    pub fn with_popup(mut self, html: impl Into<String>) -> Self {
        self.popup_html = Some(html.into());
        self
    }

    pub fn with_color(mut self, hex: impl Into<String>) -> Self {
        self.color_hex = Some(hex.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_location_serializes_camel_case_without_empty_address() {
        let located = SelectedLocation::new(6.9271, 79.8612, None);
        let json = serde_json::to_string(&located).expect("serialize");
        assert_eq!(json, r#"{"lat":6.9271,"lng":79.8612}"#);

        let parsed: SelectedLocation =
            serde_json::from_str(r#"{"lat":7.0,"lng":80.0,"address":"Kandy"}"#)
                .expect("deserialize");
        assert_eq!(parsed.address.as_deref(), Some("Kandy"));
    }

    #[test]
    fn display_label_falls_back_to_coordinates() {
        let blank = SelectedLocation::new(7.8731, 80.7718, Some("  ".into()));
        assert_eq!(blank.display_label(), "7.873100, 80.771800");

        let named = SelectedLocation::new(7.8731, 80.7718, Some("Dambulla".into()));
        assert_eq!(named.display_label(), "Dambulla");
    }

    #[test]
    fn sample_threshold_is_inclusive() {
        let sample = GeoSample {
            lat: 0.0,
            lng: 0.0,
            accuracy_meters: 20.0,
            captured_at_ms: 0.0,
        };
        assert!(sample.meets(20.0));
        assert!(!sample.meets(19.9));
    }
}
