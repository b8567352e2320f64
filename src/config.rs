// Engine settings and persistence

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for the playback and position-watch loops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Duration of one streaming chunk in seconds
    pub chunk_seconds: f64,
    /// Position watcher polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Output volume, 0.0 to 1.0
    pub volume: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            chunk_seconds: 0.1,
            poll_interval_ms: 50,
            volume: 1.0,
        }
    }
}

impl EngineSettings {
    /// Load settings from a JSON file, falling back to defaults if the
    /// file is missing or unreadable
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path.as_ref()) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("invalid settings file {:?}: {}", path.as_ref(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persist settings as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.chunk_seconds, 0.1);
        assert_eq!(settings.poll_interval_ms, 50);
        assert_eq!(settings.volume, 1.0);
    }

    #[test]
    fn test_json_round_trip() {
        let settings = EngineSettings {
            chunk_seconds: 0.25,
            poll_interval_ms: 20,
            volume: 0.5,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: EngineSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunk_seconds, 0.25);
        assert_eq!(back.poll_interval_ms, 20);
        assert_eq!(back.volume, 0.5);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let settings = EngineSettings::load_or_default("/nonexistent/wavescope.json");
        assert_eq!(settings.chunk_seconds, 0.1);
    }
}
