//! Configuration management for the scanning agent.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub scanners: ScannersConfig,

    #[serde(default)]
    pub trigger: TriggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the agent is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Bound on how long one screenshot completion may take
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,

    /// Depth of the capture worker's command channel
    #[serde(default = "default_command_depth")]
    pub command_depth: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_capture_timeout_ms(),
            command_depth: default_command_depth(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannersConfig {
    /// Scanner ids excluded from dispatches
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Package patterns whose events may trigger a scan (supports glob
    /// wildcards); empty means any package not ignored
    #[serde(default)]
    pub trigger_packages: Vec<String>,

    /// Package patterns whose events never trigger a scan
    #[serde(default = "default_ignored_packages")]
    pub ignore_packages: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            trigger_packages: Vec::new(),
            ignore_packages: default_ignored_packages(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_capture_timeout_ms() -> u64 {
    5000
}

fn default_command_depth() -> usize {
    8
}

fn default_ignored_packages() -> Vec<String> {
    vec![
        // System surfaces that generate constant event noise
        "com.android.systemui".to_string(),
        "*launcher*".to_string(),
    ]
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("accessibility-scanner")
            .join("config.toml")
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
