//! Configuration for the telemetry probe

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ProbeError, ProbeResult};

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Seconds between polls in watch mode
    pub watch_interval_secs: u64,

    /// Process rows shown by the CLI, sorted by CPU
    pub top_processes: usize,

    /// Emit JSON instead of formatted text
    pub json_output: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            watch_interval_secs: 2,
            top_processes: 20,
            json_output: false,
        }
    }
}

impl ProbeConfig {
    /// Default config file location
    pub fn default_path() -> ProbeResult<PathBuf> {
        let dir = dirs::config_dir().ok_or(ProbeError::NoConfigDir)?;
        Ok(dir.join("sysprobe").join("config.toml"))
    }

    /// Load config from TOML file
    pub fn load(path: &std::path::Path) -> ProbeResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ProbeError::Io(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ProbeError::Parse(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save(&self, path: &std::path::Path) -> ProbeResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ProbeError::Parse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProbeError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ProbeError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_toml() {
        let config = ProbeConfig {
            watch_interval_secs: 5,
            top_processes: 10,
            json_output: true,
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back: ProbeConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.watch_interval_secs, 5);
        assert_eq!(back.top_processes, 10);
        assert!(back.json_output);
    }
}
