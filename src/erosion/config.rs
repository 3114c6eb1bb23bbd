//! Erosion configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::noise::NoiseConfig;

/// Errors raised while reading or writing a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunable constants of the pipe-model erosion simulation.
///
/// None of the knobs are validated. Stable runs need `pipe_length > 0` and
/// `delta_time * time_multiplier` small enough that
/// `evaporation_rate * dt <= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionConfig {
    /// Distance between neighboring cell centers; the pipe cross-section is its square.
    pub pipe_length: f32,
    /// Gravitational acceleration driving pipe flow (positive magnitude).
    pub gravity: f32,

    /// Rain falls on a cell when the rain-mask noise sample exceeds this value.
    pub rain_threshold: f32,
    /// Multiplier applied to the intensity noise sample.
    pub rain_multiplier: f32,
    /// Noise seed offset shared by terrain seeding and rainfall.
    pub noise_seed: f32,
    /// Drift of the rain sampling origin per completed sweep.
    pub seed_increment: f32,

    /// Sediment capacity constant (Kc).
    pub sediment_capacity: f32,
    /// Dissolving constant (Ks).
    pub dissolving_rate: f32,
    /// Deposition constant (Kd).
    pub deposition_rate: f32,
    /// Water evaporation constant (Ke).
    pub evaporation_rate: f32,
    /// Lower bound of the transport capacity.
    pub minimum_capacity: f32,

    /// Scales the host delta time before it reaches the integrator.
    pub time_multiplier: f32,
    /// Initial terrain height multiplier applied to the noise sample.
    pub height_amplitude: f32,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            pipe_length: 0.5,
            gravity: 9.81,

            rain_threshold: 0.1,
            rain_multiplier: 4.0,
            noise_seed: 0.0,
            seed_increment: 0.02,

            sediment_capacity: 0.1,
            dissolving_rate: 0.1,
            deposition_rate: 0.1,
            evaporation_rate: 0.1,
            minimum_capacity: 0.01,

            time_multiplier: 1.0,
            height_amplitude: 100.0,
        }
    }
}

impl ErosionConfig {
    /// Default constants with a different noise seed.
    pub fn with_seed(seed: f32) -> Self {
        Self {
            noise_seed: seed,
            ..Default::default()
        }
    }

    /// Returns a copy whose rain mask can never fire.
    ///
    /// Noise samples are bounded by the output scale (0.5), so a threshold of
    /// 1.0 disables rainfall without a separate switch.
    pub fn without_rain(mut self) -> Self {
        self.rain_threshold = 1.0;
        self
    }

    /// Cross-section of a virtual pipe.
    #[inline]
    pub fn pipe_area(&self) -> f32 {
        self.pipe_length * self.pipe_length
    }

    /// Noise parameters for terrain seeding and rain sampling.
    pub fn noise(&self) -> NoiseConfig {
        NoiseConfig::with_seed(self.noise_seed)
    }

    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
