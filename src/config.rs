use crate::layout::relaxation::{DEFAULT_SPIN_ANGLE, DEFAULT_STEP_SIZE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fraction of the distance to rest length a spring covers per tick
    pub step_size: f64,
    /// Radians of X/Z spin per tick, purely cosmetic
    pub spin_angle: f64,
    /// Admit one airport every this many ticks
    pub admission_interval: u64,
    /// Fixed seed for reproducible runs; random when absent
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            spin_angle: DEFAULT_SPIN_ANGLE,
            admission_interval: 5,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FrameConfig {
    pub width: f64,
    pub height: f64,
    pub fov_degrees: f64,
    /// Strain at which an edge is drawn fully red or fully green
    pub max_strain: f64,
    /// Skip edges currently longer than this
    pub max_edge_length: Option<f64>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            fov_degrees: 40.0,
            max_strain: 200.0,
            max_edge_length: Some(35.0),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub simulation: SimulationConfig,
    pub frame: FrameConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("admission_interval must be at least 1")]
    ZeroAdmissionInterval,
}

impl LayoutConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.admission_interval == 0 {
            return Err(ConfigError::ZeroAdmissionInterval);
        }
        Ok(())
    }
}
