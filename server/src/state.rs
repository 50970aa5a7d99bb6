use std::sync::Arc;

use chrono::{DateTime, Utc};
use relief_shared::PickerConfig;

#[derive(Clone)]
pub struct AppState {
    pub picker_config: Arc<PickerConfig>,
    pub static_dir: Arc<str>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(picker_config: PickerConfig, static_dir: impl Into<Arc<str>>) -> Self {
        Self {
            picker_config: Arc::new(picker_config),
            static_dir: static_dir.into(),
            started_at: Utc::now(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(crate::config::picker_config(), crate::config::static_dir())
    }
}
