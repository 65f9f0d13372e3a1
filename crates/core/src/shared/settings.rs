use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_BLUR_STRENGTH, DEFAULT_SERVER_URL, DISPLAY_HEIGHT, DISPLAY_WIDTH, MAX_UPLOAD_BYTES,
    POLL_INTERVAL,
};

/// Client configuration, persisted as JSON in the user's config directory.
///
/// Missing fields fall back to their defaults so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub server_url: String,
    pub display_width: u32,
    pub display_height: u32,
    pub poll_interval_ms: u64,
    pub max_upload_bytes: u64,
    pub blur_strength: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            display_width: DISPLAY_WIDTH,
            display_height: DISPLAY_HEIGHT,
            poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            blur_strength: DEFAULT_BLUR_STRENGTH,
        }
    }
}

impl ClientSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("maskflow").join("settings.json"))
    }

    /// Loads from the default location, or defaults if absent or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
