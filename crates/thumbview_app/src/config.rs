use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thumbview_core::SchedulerConfig;
use thumbview_logging::{thumb_info, thumb_warn};

/// Settings for one viewer run, read from a RON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    /// Encoding label for non-UTF-8 entry names, e.g. `"shift_jis"`. Detected when absent.
    pub name_encoding: Option<String>,
    /// Number of rows visible at once in the simulated viewport.
    pub page_size: usize,
    /// Leading bytes of each entry kept in its preview.
    pub preview_head_bytes: usize,
    /// How long to wait for one page of previews before scrolling on.
    pub pump_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            name_encoding: None,
            page_size: 12,
            preview_head_bytes: 16,
            pump_timeout_ms: 2_000,
        }
    }
}

/// Loads the config at `path`. A missing file yields defaults; an unreadable or
/// invalid one is logged and also yields defaults.
pub fn load_config(path: &Path) -> AppConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return AppConfig::default();
        }
        Err(err) => {
            thumb_warn!("Failed to read config from {:?}: {}", path, err);
            return AppConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            thumb_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            thumb_warn!("Failed to parse config from {:?}: {}", path, err);
            AppConfig::default()
        }
    }
}
