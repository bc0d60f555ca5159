//! Startup settings
//!
//! Read from an optional JSON file; CLI flags override individual fields in
//! `main`. Every field has a default so a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::control::DEFAULT_SOCKET_PATH;
use crate::effect::{EffectParameters, Orientation, DEFAULT_STRENGTH, DEFAULT_TUNING};
use crate::mqtt::{DEFAULT_PORT, DEFAULT_TOPIC};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Initial blend strength
    pub strength: f64,
    /// Initial threshold tuning value
    pub threshold: f64,
    /// Compare against the pixel below (true) or to the right (false)
    pub vertical: bool,
    /// Image used when no source is given or the source fails to load
    pub fallback_image: PathBuf,
    /// Unix control socket, `None` disables it
    pub socket_path: Option<PathBuf>,
    /// MQTT broker host, `None` disables MQTT
    pub mqtt_host: Option<String>,
    pub mqtt_port: u16,
    pub mqtt_topic: String,
    /// Presentation rate when the display doesn't report one
    pub refresh_hz_fallback: u32,
    /// Restart from the source image after every committed parameter change
    pub reload_on_commit: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH,
            threshold: DEFAULT_TUNING,
            vertical: true,
            fallback_image: PathBuf::from("static/img/init.jpg"),
            socket_path: Some(PathBuf::from(DEFAULT_SOCKET_PATH)),
            mqtt_host: None,
            mqtt_port: DEFAULT_PORT,
            mqtt_topic: DEFAULT_TOPIC.to_string(),
            refresh_hz_fallback: 60,
            reload_on_commit: false,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_vertical(self.vertical)
    }

    /// Initial parameter record, threshold already remapped
    pub fn effect_parameters(&self) -> EffectParameters {
        EffectParameters::new(self.strength, self.threshold, self.orientation())
    }
}
