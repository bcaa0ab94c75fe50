//! Figment-backed configuration loading and validation.

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project directory holding `config.yaml` and `local.yaml`
pub const CONFIG_DIR: &str = ".dino";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "DINO_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The campaign budget is zero
    #[error("Invalid total_tests: {0}. Must be at least 1")]
    InvalidTotalTests(usize),

    /// The boundary stage would take no samples
    #[error("Invalid boundary_samples: {0}. Must be at least 1")]
    InvalidBoundarySamples(usize),

    /// Deceleration thresholds cannot normalize braking
    #[error(
        "Invalid braking thresholds: emergency_decel ({1}) must exceed comfortable_decel ({0}) and both must be positive"
    )]
    InvalidBraking(f64, f64),

    /// The side-move distance band is empty or negative
    #[error("Invalid side-move band: band_min ({0}) must be non-negative and below band_max ({1})")]
    InvalidSideMoveBand(f64, f64),

    /// Unknown log level name
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown log format name
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// A step size or tolerance is not positive
    #[error("Invalid explorer setting {0}: {1}. Must be positive")]
    InvalidExplorerSetting(&'static str, f64),

    /// Lane offsets that do not fit the lanes
    #[error("Invalid scenario geometry: {0}")]
    InvalidGeometry(String),

    /// Any other rejected setting
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .dino/config.yaml (project config, created by init)
    /// 3. .dino/local.yaml (project local overrides, optional)
    /// 4. Environment variables (DINO_* prefix, `__` separates nesting)
    pub fn load() -> Result<Config> {
        Self::load_in(".")
    }

    /// Same as [`load`](Self::load) with the project rooted at `root`.
    pub fn load_in(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let campaign = &config.campaign;
        if campaign.total_tests == 0 {
            return Err(ConfigError::InvalidTotalTests(campaign.total_tests));
        }
        if campaign.boundary_samples == 0 {
            return Err(ConfigError::InvalidBoundarySamples(
                campaign.boundary_samples,
            ));
        }

        let scenario = &config.scenario;
        if scenario.comfortable_decel <= 0.0 || scenario.emergency_decel <= scenario.comfortable_decel
        {
            return Err(ConfigError::InvalidBraking(
                scenario.comfortable_decel,
                scenario.emergency_decel,
            ));
        }

        let band = &scenario.side_move;
        if band.band_min < 0.0 || band.band_min >= band.band_max {
            return Err(ConfigError::InvalidSideMoveBand(band.band_min, band.band_max));
        }
        if band.min_halted == 0 {
            return Err(ConfigError::ValidationFailed(
                "side_move.min_halted must be at least 1".to_string(),
            ));
        }

        Self::validate_geometry(config)?;

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let explorers = &config.explorers;
        for (name, value) in [
            ("surface_initial_step", explorers.surface_initial_step),
            ("surface_tolerance", explorers.surface_tolerance),
            ("boundary_step", explorers.boundary_step),
            ("boundary_adherence", explorers.boundary_adherence),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::InvalidExplorerSetting(name, value));
            }
        }

        if scenario.start_time_feature.is_empty() || scenario.dut_speed_feature.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "start_time_feature and dut_speed_feature cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_geometry(config: &Config) -> Result<(), ConfigError> {
        let s = &config.scenario;
        if s.turn_lane_length <= 0.0 || s.vehicle_spacing <= 0.0 || s.queue_head_offset < 0.0 {
            return Err(ConfigError::InvalidGeometry(
                "lane length and vehicle spacing must be positive".to_string(),
            ));
        }
        if s.dut_setback <= 0.0 || s.dut_setback >= s.turn_lane_length {
            return Err(ConfigError::InvalidGeometry(format!(
                "dut_setback {} must lie inside the {} m turn lane",
                s.dut_setback, s.turn_lane_length
            )));
        }
        let last_slot = s.queue_head_offset
            + f64::from(s.traffic_slots.saturating_sub(1)) * s.vehicle_spacing;
        if last_slot >= s.turn_lane_length {
            return Err(ConfigError::InvalidGeometry(format!(
                "{} queue slots do not fit in the {} m turn lane",
                s.traffic_slots, s.turn_lane_length
            )));
        }
        if s.exit_offset < 0.0 {
            return Err(ConfigError::InvalidGeometry(format!(
                "exit_offset {} cannot be negative",
                s.exit_offset
            )));
        }
        Ok(())
    }
}
