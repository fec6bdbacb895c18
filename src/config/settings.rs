//! Persisted engine settings

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_POINTS, DEFAULT_PRECISION};

fn default_refresh_hz() -> u32 {
    24
}

fn default_points() -> usize {
    DEFAULT_POINTS
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

fn default_true() -> bool {
    true
}

/// Engine-wide configuration persisted between sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Version of the config format
    pub version: u32,
    /// Samples kept per series
    #[serde(default = "default_points")]
    pub points: usize,
    /// Decimal precision for value widgets (display only)
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Append the synthetic terminal widget
    #[serde(default)]
    pub terminal_enabled: bool,
    /// Show the action panel alongside the dashboard
    #[serde(default = "default_true")]
    pub show_action_panel: bool,
    /// Coalesced refresh rate for the `Updated` notification
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            version: 1,
            points: DEFAULT_POINTS,
            precision: DEFAULT_PRECISION,
            terminal_enabled: false,
            show_action_panel: true,
            refresh_hz: 24,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "github.teledash", "teledash")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
