use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use chrono::SecondsFormat;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "started_at": state.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

/// Picker settings for this deployment. Not cached so threshold changes reach
/// clients on their next page load.
pub async fn get_config(State(state): State<AppState>) -> Response {
    let mut response = Json(state.picker_config.as_ref().clone()).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}
