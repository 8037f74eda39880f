//! progresscoord configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::coordinator::CoordinatorConfig;
use crate::domain::Topology;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where this process sits in the run
    pub topology: Topology,

    /// Coordinator tuning
    pub progress: CoordinatorConfig,

    /// Simulated pipeline used by `pc simulate`
    pub simulation: SimulationConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.simulation.filters.is_empty() {
            return Err(eyre::eyre!("simulation.filters must name at least one stage"));
        }
        if self.simulation.steps == 0 {
            return Err(eyre::eyre!("simulation.steps must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .progresscoord.yml
        let local_config = PathBuf::from(".progresscoord.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/progresscoord/progresscoord.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("progresscoord").join("progresscoord.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Simulated distributed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of satellite ranks besides the root
    pub satellites: usize,

    /// Stage names, executed in order on every rank
    pub filters: Vec<String>,

    /// Progress ticks per stage
    pub steps: u32,

    /// Mean delay between ticks in milliseconds
    #[serde(rename = "tick-ms")]
    pub tick_ms: u64,

    /// Put a client in front of the root
    #[serde(rename = "with-client")]
    pub with_client: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            satellites: 3,
            filters: vec![
                "Reader".to_string(),
                "Contour".to_string(),
                "Clip".to_string(),
                "Render".to_string(),
            ],
            steps: 20,
            tick_ms: 40,
            with_client: false,
        }
    }
}
