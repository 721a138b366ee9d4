//! Host configuration for the safety system.
//!
//! Config file: ~/.config/carebow-safety/config.toml
//! Shared by safetyd and safetyctl so both resolve the same state file
//! and location helper.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::persist;

/// File name of the persisted safety state
pub const STATE_FILE_NAME: &str = "safety_state.json";

/// Main safety configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Display name used in outbound alert messages
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Override for the state directory (default: ~/.local/share/carebow-safety)
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Helper command that prints `lat lng [accuracy]` on stdout
    #[serde(default)]
    pub location_command: Option<String>,

    /// Upper bound for a live location fetch
    #[serde(default = "default_location_timeout_ms")]
    pub location_timeout_ms: u64,

    /// Watcher tick interval for safetyd
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

fn default_display_name() -> String {
    std::env::var("USER").unwrap_or_else(|_| "CareBow user".to_string())
}

fn default_location_timeout_ms() -> u64 {
    10_000
}

fn default_tick_interval_secs() -> u64 {
    60
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            state_dir: None,
            location_command: None,
            location_timeout_ms: default_location_timeout_ms(),
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

impl SafetyConfig {
    /// Default user config path: ~/.config/carebow-safety/config.toml
    pub fn user_config_path() -> PathBuf {
        persist::default_config_dir().join("config.toml")
    }

    /// Load configuration from file, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::user_config_path())
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: SafetyConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the user config file
    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let toml_string = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(&path, toml_string)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Resolved path of the persisted safety state
    pub fn state_file(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(persist::default_state_dir)
            .join(STATE_FILE_NAME)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}
