use serde::{Deserialize, Serialize};

use crate::location::LatLng;
use crate::region::{RegionBounds, SRI_LANKA};

pub const DEFAULT_ACCURACY_THRESHOLD_M: f64 = 20.0;
pub const DEFAULT_ACQUISITION_WINDOW_MS: u32 = 30_000;
pub const DEFAULT_PLATFORM_TIMEOUT_MS: u32 = 30_000;
pub const DEFAULT_GEOCODE_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_LEAFLET_SCRIPT_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
pub const DEFAULT_LEAFLET_STYLE_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
pub const DEFAULT_CENTER: LatLng = LatLng::new(7.8731, 80.7718);
pub const DEFAULT_ZOOM: f64 = 8.0;

/// Per-deployment settings for the picker and map, served at `/api/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    pub accuracy_threshold_m: f64,
    pub acquisition_window_ms: u32,
    pub platform_timeout_ms: u32,
    pub geocode_endpoint: String,
    pub tile_url: String,
    pub leaflet_script_url: String,
    pub leaflet_style_url: String,
    pub region: RegionBounds,
    pub default_center: LatLng,
    pub default_zoom: f64,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold_m: DEFAULT_ACCURACY_THRESHOLD_M,
            acquisition_window_ms: DEFAULT_ACQUISITION_WINDOW_MS,
            platform_timeout_ms: DEFAULT_PLATFORM_TIMEOUT_MS,
            geocode_endpoint: DEFAULT_GEOCODE_ENDPOINT.to_string(),
            tile_url: DEFAULT_TILE_URL.to_string(),
            leaflet_script_url: DEFAULT_LEAFLET_SCRIPT_URL.to_string(),
            leaflet_style_url: DEFAULT_LEAFLET_STYLE_URL.to_string(),
            region: SRI_LANKA,
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
        }
    }
}

impl PickerConfig {
    pub fn policy(&self) -> AcquisitionPolicy {
        AcquisitionPolicy {
            accuracy_threshold_m: self.accuracy_threshold_m,
            window_ms: f64::from(self.acquisition_window_ms),
            options: PositionRequest {
                high_accuracy: true,
                timeout_ms: self.platform_timeout_ms,
                max_age_ms: 0,
            },
        }
    }
}

/// Options forwarded to `getCurrentPosition` / `watchPosition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub high_accuracy: bool,
    pub timeout_ms: u32,
    pub max_age_ms: u32,
}

/// When a fix is good enough, and how long to keep refining before settling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionPolicy {
    pub accuracy_threshold_m: f64,
    pub window_ms: f64,
    pub options: PositionRequest,
}

impl Default for AcquisitionPolicy {
    fn default() -> Self {
        PickerConfig::default().policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_uses_twenty_meters_and_thirty_seconds() {
        let policy = AcquisitionPolicy::default();
        assert_eq!(policy.accuracy_threshold_m, 20.0);
        assert_eq!(policy.window_ms, 30_000.0);
        assert_eq!(
            policy.options,
            PositionRequest {
                high_accuracy: true,
                timeout_ms: 30_000,
                max_age_ms: 0,
            }
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PickerConfig =
            serde_json::from_str(r#"{"accuracy_threshold_m": 50.0}"#).expect("config parses");
        assert_eq!(config.accuracy_threshold_m, 50.0);
        assert_eq!(config.acquisition_window_ms, DEFAULT_ACQUISITION_WINDOW_MS);
        assert_eq!(config.region, SRI_LANKA);
        assert_eq!(config.geocode_endpoint, DEFAULT_GEOCODE_ENDPOINT);
    }
}
