use relief_shared::PickerConfig;
use relief_shared::config::{
    DEFAULT_ACCURACY_THRESHOLD_M, DEFAULT_ACQUISITION_WINDOW_MS, DEFAULT_GEOCODE_ENDPOINT,
    DEFAULT_PLATFORM_TIMEOUT_MS, DEFAULT_TILE_URL,
};

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "client/dist";

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn static_dir() -> String {
    non_empty_var("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
}

pub fn accuracy_threshold_m() -> f64 {
    std::env::var("ACCURACY_THRESHOLD_M")
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(DEFAULT_ACCURACY_THRESHOLD_M)
}

pub fn acquisition_window_ms() -> u32 {
    std::env::var("ACQUISITION_WINDOW_MS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_ACQUISITION_WINDOW_MS)
}

pub fn platform_timeout_ms() -> u32 {
    std::env::var("PLATFORM_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PLATFORM_TIMEOUT_MS)
}

pub fn geocode_endpoint() -> String {
    non_empty_var("GEOCODE_ENDPOINT").unwrap_or_else(|| DEFAULT_GEOCODE_ENDPOINT.to_string())
}

pub fn tile_url() -> String {
    non_empty_var("TILE_URL").unwrap_or_else(|| DEFAULT_TILE_URL.to_string())
}

/// Settings handed to every client through `/api/config`.
pub fn picker_config() -> PickerConfig {
    PickerConfig {
        accuracy_threshold_m: accuracy_threshold_m(),
        acquisition_window_ms: acquisition_window_ms(),
        platform_timeout_ms: platform_timeout_ms(),
        geocode_endpoint: geocode_endpoint(),
        tile_url: tile_url(),
        ..PickerConfig::default()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
