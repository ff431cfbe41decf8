use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;

/// Tunable parameters for workout structure detection.
///
/// Passed explicitly into the detector and echoed back in every
/// `DetectionResult` so runs are reproducible and auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Centered rolling-mean window over the velocity stream, in samples
    pub smooth_window: usize,

    /// Robust z-score at or above which a neutral sample starts an effort
    pub z_eff_on: f64,

    /// Robust z-score at or below which a running effort ends
    pub z_eff_off: f64,

    /// Minimum effort duration in seconds
    pub min_eff_s: i64,

    /// Minimum effort distance in meters
    pub min_eff_dist_m: f64,

    /// Maximum index gap between accepted efforts that still merges them
    pub merge_gap_s: i64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            smooth_window: 9,
            z_eff_on: 1.0,
            z_eff_off: 0.4,
            min_eff_s: 18,
            min_eff_dist_m: 40.0,
            merge_gap_s: 3,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file holding activities, streams and laps
    pub db_path: PathBuf,

    /// Structure detection parameters
    pub detection: DetectionConfig,

    /// Logging settings
    pub logging: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: PathBuf::from("running.db"),
            detection: DetectionConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".laprs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(_) => Self::default(),
        }
    }
}
