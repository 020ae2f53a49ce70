// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConfigError;
use crate::event::TUBE_COUNT;

/// Main application configuration.
///
/// Read once at engine construction; there is no hot-reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// Use the simulated timing channels instead of real hardware
    pub simulated: bool,

    /// Acquisition configuration
    pub daq: DaqConfig,

    /// Simulated-hardware configuration
    pub simulation: SimulationConfig,

    /// Track reconstruction configuration
    pub reconstruction: ReconstructionConfig,

    /// Event persistence configuration
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            simulated: true,
            daq: DaqConfig::default(),
            simulation: SimulationConfig::default(),
            reconstruction: ReconstructionConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            config.save(path)?;
            Ok(config)
        }
    }

    /// Fail-fast validation, run before any hardware interaction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.daq.validate()?;
        self.simulation.validate()?;
        self.reconstruction.validate()?;
        Ok(())
    }
}

/// Acquisition engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaqConfig {
    /// Trigger poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Per-channel read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Tubes to scan, in scan order. `None` scans all 96.
    pub active_tubes: Option<Vec<u8>>,

    /// Bounded capacity of the event-logger hand-off queue
    pub logger_queue_capacity: usize,

    /// Bounded capacity of the presentation hand-off queue
    pub monitor_queue_capacity: usize,

    /// Sliding window length, in channel operations, for the error-rate policy
    pub error_window: usize,

    /// Error rate over the window that trips a hardware health fault
    pub error_rate_threshold: f64,

    /// Stop after this many events
    pub max_events: Option<u64>,

    /// Stop after this many seconds
    pub max_duration_secs: Option<f64>,

    /// SPI device path for the hardware backend
    pub spi_device: Option<String>,
}

impl Default for DaqConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            read_timeout_ms: 5,
            active_tubes: None,
            logger_queue_capacity: 1024,
            monitor_queue_capacity: 256,
            error_window: 192,
            error_rate_threshold: 0.25,
            max_events: None,
            max_duration_secs: None,
            spi_device: None,
        }
    }
}

impl DaqConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::NonPositiveDuration {
                name: "poll_interval_ms",
            });
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::NonPositiveDuration {
                name: "read_timeout_ms",
            });
        }
        if self.logger_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "logger_queue",
            });
        }
        if self.monitor_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "monitor_queue",
            });
        }
        if self.error_window == 0 {
            return Err(ConfigError::ErrorPolicy("error_window must be at least 1"));
        }
        if !(self.error_rate_threshold > 0.0 && self.error_rate_threshold <= 1.0) {
            return Err(ConfigError::ErrorPolicy(
                "error_rate_threshold must be within (0, 1]",
            ));
        }
        if let Some(ref tubes) = self.active_tubes {
            if let Some(&bad) = tubes.iter().find(|&&t| t >= TUBE_COUNT) {
                return Err(ConfigError::TubeOutOfRange(bad));
            }
        }
        if let Some(secs) = self.max_duration_secs {
            if secs <= 0.0 {
                return Err(ConfigError::NonPositiveDuration {
                    name: "max_duration_secs",
                });
            }
        }
        Ok(())
    }

    /// The tubes to scan, in fixed scan order.
    pub fn scan_order(&self) -> Vec<u8> {
        match self.active_tubes {
            Some(ref tubes) => tubes.clone(),
            None => (0..TUBE_COUNT).collect(),
        }
    }
}

/// How the simulator populates hits for a triggered event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HitModel {
    /// Straight-line track crossing both chambers; the nearest tube per
    /// layer fires subject to efficiency, plus adjacent-tube noise.
    Track,
    /// Every tube fires independently with `hit_probability`.
    Uniform,
}

/// A fixed track for deterministic end-to-end runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PinnedTrack {
    /// Slope of the X-Z projection (chamber 0 plane)
    pub slope_xz: f64,
    /// Slope of the Y-Z projection (chamber 1 plane)
    pub slope_yz: f64,
    /// Lateral entry position in chamber 0, in tube pitches
    pub entry_x: f64,
    /// Lateral entry position in chamber 1, in tube pitches
    pub entry_y: f64,
}

/// Simulated-hardware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the deterministic generator. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Probability the trigger asserts on each poll
    pub trigger_probability: f64,

    /// Hit generation model
    pub hit_model: HitModel,

    /// Per-tube hit probability
    pub hit_probability: f64,

    /// Per-chamber efficiency multiplier on the hit probability (track model)
    pub chamber_efficiency: [f64; 2],

    /// Probability of an extra hit on a tube adjacent to the track (track model)
    pub noise_probability: f64,

    /// Track slopes are drawn uniformly from [-max_slope, max_slope]
    pub max_slope: f64,

    /// Pin every generated track to a fixed trajectory
    pub pinned_track: Option<PinnedTrack>,

    /// Time-of-flight range in nanoseconds
    pub tof_range_ns: [f64; 2],

    /// Time-over-threshold range in nanoseconds
    pub tot_range_ns: [f64; 2],

    /// Probability a channel operation fails with a communication error
    pub fault_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            trigger_probability: 0.0005,
            hit_model: HitModel::Track,
            hit_probability: 0.95,
            chamber_efficiency: [1.0, 1.0],
            noise_probability: 0.02,
            max_slope: 0.5,
            pinned_track: None,
            tof_range_ns: [10.0, 100.0],
            tot_range_ns: [5.0, 50.0],
            fault_probability: 0.0,
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("trigger_probability", self.trigger_probability),
            ("hit_probability", self.hit_probability),
            ("chamber_efficiency[0]", self.chamber_efficiency[0]),
            ("chamber_efficiency[1]", self.chamber_efficiency[1]),
            ("noise_probability", self.noise_probability),
            ("fault_probability", self.fault_probability),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Track reconstruction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// Minimum distinct layers with hits required to fit a chamber (2-4)
    pub min_layers: u8,

    /// Refine lateral coordinates with the calibrated drift radius
    pub use_drift_radius: bool,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            min_layers: 2,
            use_drift_radius: true,
        }
    }
}

impl ReconstructionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=4).contains(&self.min_layers) {
            return Err(ConfigError::MinLayersOutOfRange(self.min_layers));
        }
        Ok(())
    }
}

/// Event persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Enable the JSONL event logger
    pub enabled: bool,

    /// Output file, one JSON object per event
    pub output_file: PathBuf,

    /// Logger queue drain interval in milliseconds
    pub drain_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_file: PathBuf::from("detector_events.jsonl"),
            drain_interval_ms: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_timeout() {
        let mut config = Config::default();
        config.daq.read_timeout_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveDuration {
                name: "read_timeout_ms"
            })
        );
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let mut config = Config::default();
        config.simulation.hit_probability = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProbabilityOutOfRange {
                name: "hit_probability",
                ..
            })
        ));
    }

    #[test]
    fn rejects_bad_active_tube() {
        let mut config = Config::default();
        config.daq.active_tubes = Some(vec![0, 40, 96]);
        assert_eq!(config.validate(), Err(ConfigError::TubeOutOfRange(96)));
    }

    #[test]
    fn rejects_min_layers_outside_bounds() {
        let mut config = Config::default();
        config.reconstruction.min_layers = 1;
        assert_eq!(config.validate(), Err(ConfigError::MinLayersOutOfRange(1)));
        config.reconstruction.min_layers = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn scan_order_defaults_to_all_tubes() {
        let daq = DaqConfig::default();
        let order = daq.scan_order();
        assert_eq!(order.len(), 96);
        assert_eq!(order[0], 0);
        assert_eq!(order[95], 95);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.daq.poll_interval_ms, config.daq.poll_interval_ms);
        assert_eq!(back.simulation.hit_model, config.simulation.hit_model);
        assert_eq!(back.storage.output_file, config.storage.output_file);
    }
}
