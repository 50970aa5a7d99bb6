use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use relief_shared::PickerConfig;

/// Picker settings served by the backend; `None` until the first fetch settles.
#[derive(Clone, Copy)]
pub(crate) struct PickerSettings(pub RwSignal<Option<PickerConfig>>);

/// Fetch `/api/config` and publish it as context for every map and picker below.
pub(crate) fn provide_picker_settings() -> RwSignal<Option<PickerConfig>> {
    let settings = RwSignal::new(None);
    provide_context(PickerSettings(settings));
    spawn_local(async move {
        let config = match fetch_picker_config().await {
            Ok(config) => config,
            Err(e) => {
                web_sys::console::warn_1(
                    &format!("Picker config unavailable, using defaults: {e}").into(),
                );
                PickerConfig::default()
            }
        };
        settings.set(Some(config));
    });
    settings
}

/// Settings from context, or the built-in defaults when no provider is mounted.
pub(crate) fn use_picker_settings() -> RwSignal<Option<PickerConfig>> {
    use_context::<PickerSettings>()
        .map(|settings| settings.0)
        .unwrap_or_else(|| RwSignal::new(Some(PickerConfig::default())))
}

pub async fn fetch_picker_config() -> Result<PickerConfig, String> {
    let resp = gloo_net::http::Request::get("/api/config")
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    let config = resp
        .json::<PickerConfig>()
        .await
        .map_err(|e| format!("parse error: {e}"))?;
    validate(config)
}

fn validate(config: PickerConfig) -> Result<PickerConfig, String> {
    if !config.region.is_valid() {
        return Err("region bounds are inverted or not finite".into());
    }
    if !(config.accuracy_threshold_m.is_finite() && config.accuracy_threshold_m > 0.0) {
        return Err(format!(
            "accuracy threshold must be positive, got {}",
            config.accuracy_threshold_m
        ));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_server_payload_fills_defaults() {
        let config: PickerConfig =
            serde_json::from_str(r#"{"accuracy_threshold_m": 35.0}"#).expect("parse");
        let config = validate(config).expect("valid");
        assert_eq!(config.accuracy_threshold_m, 35.0);
        assert_eq!(config.region, relief_shared::SRI_LANKA);
    }

    #[test]
    fn inverted_region_is_rejected() {
        let mut config = PickerConfig::default();
        std::mem::swap(&mut config.region.north, &mut config.region.south);
        assert!(validate(config).is_err());
    }

    #[test]
    fn non_positive_threshold_is_rejected() {
        let config = PickerConfig {
            accuracy_threshold_m: 0.0,
            ..PickerConfig::default()
        };
        assert!(validate(config).is_err());
    }
}
