use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use beeper_core::MAX_VOLUME;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Output sample rate requested from the audio device.
    pub sample_rate: u32,
    /// Speaker volume, 0..=127.
    pub volume: u8,
    /// Debounce window scalar in milliseconds (see beeper_core).
    pub note_delay: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            // Half of max, like the original frontend's startup default
            volume: MAX_VOLUME / 2,
            note_delay: 1.0,
        }
    }
}

impl Settings {
    /// Get the config file path relative to the executable
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("config.json");
        path
    }

    /// Load settings from config.json, falling back to defaults on error
    pub fn load() -> Self {
        let path = Self::config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to parse config.json: {}. Using defaults.",
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => {
                // File doesn't exist or can't be read, use defaults
                Self::default()
            }
        }
    }

    /// Save settings to config.json immediately
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path();
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        Ok(())
    }
}
