//! Simulation configuration, loaded from a TOML file under the user
//! config directory. A default file is written on first run so there
//! is always something to edit.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const CONFIG_DIR: &str = "crosslight";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_LANE_COUNT: usize = 2;
pub const DEFAULT_YELLOW_OVERLAP_MS: u64 = 2000;
pub const DEFAULT_OVERRIDE_RELEASE_MS: u64 = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no user config directory available")]
    NoConfigDir,

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Number of approaches; a plain two-road crossing has two.
    #[serde(default = "default_lane_count")]
    pub lane_count: usize,

    /// Both-yellow hold before right-of-way swaps, in milliseconds.
    #[serde(default = "default_yellow_overlap_ms")]
    pub yellow_overlap_ms: u64,

    /// Lock hold after a blue override, in milliseconds.
    #[serde(default = "default_override_release_ms")]
    pub override_release_ms: u64,
}

fn default_lane_count() -> usize {
    DEFAULT_LANE_COUNT
}

fn default_yellow_overlap_ms() -> u64 {
    DEFAULT_YELLOW_OVERLAP_MS
}

fn default_override_release_ms() -> u64 {
    DEFAULT_OVERRIDE_RELEASE_MS
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            lane_count: DEFAULT_LANE_COUNT,
            yellow_overlap_ms: DEFAULT_YELLOW_OVERLAP_MS,
            override_release_ms: DEFAULT_OVERRIDE_RELEASE_MS,
        }
    }
}

impl SimulationConfig {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Loads the user config, writing a default file first if none
    /// exists yet.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::ensure_default_config(&path)?;
        Self::load_from(&path)
    }

    /// Writes the default config if the file is missing.
    pub fn ensure_default_config(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(&Self::default())?;
        fs::write(path, rendered)?;
        info!("wrote default config to {}", path.display());
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        debug!("loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_count < 2 {
            return Err(ConfigError::Invalid(format!(
                "lane_count must be at least 2, got {}",
                self.lane_count
            )));
        }
        if self.yellow_overlap_ms == 0 {
            return Err(ConfigError::Invalid(
                "yellow_overlap_ms must be non-zero".to_string(),
            ));
        }
        if self.override_release_ms == 0 {
            return Err(ConfigError::Invalid(
                "override_release_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lane_count, 2);
        assert_eq!(config.yellow_overlap_ms, 2000);
        assert_eq!(config.override_release_ms, 200);
    }

    #[test]
    fn ensure_writes_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crosslight").join("config.toml");

        SimulationConfig::ensure_default_config(&path).unwrap();
        assert!(path.exists());

        let loaded = SimulationConfig::load_from(&path).unwrap();
        assert_eq!(loaded, SimulationConfig::default());

        // A second ensure leaves the existing file alone.
        fs::write(&path, "lane_count = 4\n").unwrap();
        SimulationConfig::ensure_default_config(&path).unwrap();
        let loaded = SimulationConfig::load_from(&path).unwrap();
        assert_eq!(loaded.lane_count, 4);
        assert_eq!(loaded.yellow_overlap_ms, DEFAULT_YELLOW_OVERLAP_MS);
    }

    #[test]
    fn invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "lane_count = 1\n").unwrap();
        assert!(matches!(
            SimulationConfig::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));

        fs::write(&path, "yellow_overlap_ms = 0\n").unwrap();
        assert!(matches!(
            SimulationConfig::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));

        fs::write(&path, "not toml at all [[[").unwrap();
        assert!(matches!(
            SimulationConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
