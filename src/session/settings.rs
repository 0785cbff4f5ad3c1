use crate::db::{DurableStore, StoreError, SETTINGS_KEY};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the browsing and playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Cards whose images load immediately; the rest wait for the viewport.
    #[serde(default = "default_eager_image_limit")]
    pub eager_image_limit: usize,
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u32,
    #[serde(default = "default_skip_back_secs")]
    pub skip_back_secs: f64,
    #[serde(default = "default_skip_forward_secs")]
    pub skip_forward_secs: f64,
    /// Viewports narrower than this are treated as small devices.
    #[serde(default = "default_small_viewport_max_width")]
    pub small_viewport_max_width: f64,
    /// Cover shown when a card image is missing or broken. Empty means the
    /// bundled default cover.
    #[serde(default)]
    pub fallback_image: String,
    #[serde(default = "default_autoplay_on_load")]
    pub autoplay_on_load: bool,
    #[serde(default)]
    pub api_base: String,
}

fn default_eager_image_limit() -> usize {
    20
}

fn default_snapshot_interval_secs() -> u32 {
    5
}

fn default_skip_back_secs() -> f64 {
    15.0
}

fn default_skip_forward_secs() -> f64 {
    30.0
}

fn default_small_viewport_max_width() -> f64 {
    1025.0
}

fn default_autoplay_on_load() -> bool {
    true
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            eager_image_limit: default_eager_image_limit(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            skip_back_secs: default_skip_back_secs(),
            skip_forward_secs: default_skip_forward_secs(),
            small_viewport_max_width: default_small_viewport_max_width(),
            fallback_image: String::new(),
            autoplay_on_load: default_autoplay_on_load(),
            api_base: String::new(),
        }
    }
}

impl SessionSettings {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.snapshot_interval_secs.max(1)))
    }

    pub fn is_small_viewport(&self, width: f64) -> bool {
        width < self.small_viewport_max_width
    }
}

pub fn load_settings(store: &DurableStore) -> SessionSettings {
    store.read(SETTINGS_KEY).unwrap_or_default()
}

#[cfg(test)]
pub fn save_settings(store: &DurableStore, settings: &SessionSettings) -> Result<(), StoreError> {
    store.write(SETTINGS_KEY, settings)
}
