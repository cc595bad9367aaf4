use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Chat endpoint
    pub chat_url: String,
    pub chat_timeout: u64,

    // Speech
    pub synth_engine: String,
    pub pitch: f32,
    pub rate: f32,
    pub words_per_minute: u32,

    // Avatar
    pub avatar_mode: String,
    pub avatar_asset: String,

    // Discrete lip-sync
    pub tick_ms: u64,
    pub open_threshold: f64,
    pub smile_threshold: f64,

    // Continuous lip-sync
    pub frame_hz: u32,
    pub syllable_freq: f32,
    pub rhythm_freq_a: f32,
    pub rhythm_freq_b: f32,
    pub rhythm_gate: f32,
    pub jaw_amplitude: f32,
    pub blink_min_secs: f32,
    pub blink_max_secs: f32,
    pub blink_duration: f32,
    pub saccade_min_secs: f32,
    pub saccade_max_secs: f32,
    pub saccade_smoothing: f32,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat_url: "http://localhost:5000/chat".to_string(),
            chat_timeout: 10,
            synth_engine: "scripted".to_string(),
            pitch: 1.0,
            rate: 1.0,
            words_per_minute: 160,
            avatar_mode: "discrete".to_string(),
            avatar_asset: "".to_string(),
            tick_ms: 100,
            open_threshold: 0.7,
            smile_threshold: 0.4,
            frame_hz: 60,
            syllable_freq: 20.0,
            rhythm_freq_a: 5.0,
            rhythm_freq_b: 3.3,
            rhythm_gate: -0.2,
            jaw_amplitude: 0.25,
            blink_min_secs: 2.0,
            blink_max_secs: 6.0,
            blink_duration: 0.2,
            saccade_min_secs: 1.0,
            saccade_max_secs: 4.0,
            saccade_smoothing: 0.1,
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match serde_json::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    // Graceful degradation: log warning and use defaults
                    tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                    // Backup corrupt file for debugging
                    let backup_path = path.with_extension("json.corrupt");
                    let _ = std::fs::rename(path, &backup_path);
                    Ok(Self::default())
                }
            }
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    /// Save config to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("avatalk")
        .join("config.json")
}
