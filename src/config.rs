//! TOML run configuration
//!
//! Every table and key is optional; missing values take the library
//! defaults.
//!
//! ```toml
//! [integrator]
//! order = 6
//! energy_error_relative_max = 1e-12
//!
//! [interaction]
//! gravitational_constant = 1.0
//! merge_enabled = true
//!
//! [run]
//! time_end = 100.0
//! output_interval = 1.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::interaction::NewtonianInteraction;
use crate::symplectic::{
    SymplecticManager, DEFAULT_ENERGY_ERROR_RELATIVE_MAX, DEFAULT_STEP_COUNT_MAX,
    DEFAULT_TIME_ERROR_MAX, DEFAULT_TIME_STEP_MIN,
};
use crate::{Error, Result};

/// Full run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Step control
    pub integrator: IntegratorConfig,
    /// Slowdown reference values
    pub slowdown: SlowDownConfig,
    /// Force law
    pub interaction: InteractionConfig,
    /// Driver settings used by the CLI
    pub run: RunConfig,
}

/// `[integrator]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorConfig {
    /// Even symplectic order
    pub order: usize,
    /// Relative energy error limit per step
    pub energy_error_relative_max: f64,
    /// Smallest physical time step
    pub time_step_min: f64,
    /// Tolerance for reaching the end time
    pub time_error_max: f64,
    /// Scale of the Kepler step estimate
    pub ds_scale: f64,
    /// Step limit per `integrate_to_time` call
    pub step_count_max: u64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            order: 4,
            energy_error_relative_max: DEFAULT_ENERGY_ERROR_RELATIVE_MAX,
            time_step_min: DEFAULT_TIME_STEP_MIN,
            time_error_max: DEFAULT_TIME_ERROR_MAX,
            ds_scale: 1.0,
            step_count_max: DEFAULT_STEP_COUNT_MAX,
        }
    }
}

/// `[slowdown]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlowDownConfig {
    /// Perturbation ratio reference
    pub pert_ratio_ref: f64,
    /// Maximum perturbation timescale
    pub timescale_max: f64,
}

impl Default for SlowDownConfig {
    fn default() -> Self {
        Self {
            pert_ratio_ref: 1e-4,
            timescale_max: f64::MAX,
        }
    }
}

/// `[interaction]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteractionConfig {
    /// Gravitational constant
    pub gravitational_constant: f64,
    /// Softening length squared
    pub eps_sq: f64,
    /// Merge members on close approach
    pub merge_enabled: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            gravitational_constant: 1.0,
            eps_sq: 0.0,
            merge_enabled: false,
        }
    }
}

/// `[run]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Start time of the integration
    pub time_start: f64,
    /// End time of the integration
    pub time_end: f64,
    /// Time between output rows; zero prints only the final state
    pub output_interval: f64,
    /// Force thread pool size, zero for all cores
    pub threads: usize,
    /// Column width of the output table
    pub print_width: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_start: 0.0,
            time_end: 1.0,
            output_interval: 0.0,
            threads: 0,
            print_width: 24,
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an IO, parse or validation error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for malformed TOML and
    /// [`Error::InvalidConfig`] for rejected values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let integrator = &self.integrator;
        if integrator.order < 2 || integrator.order % 2 != 0 {
            return Err(invalid("integrator.order", "must be even and at least 2"));
        }
        positive("integrator.energy_error_relative_max", integrator.energy_error_relative_max)?;
        positive("integrator.time_step_min", integrator.time_step_min)?;
        positive("integrator.time_error_max", integrator.time_error_max)?;
        positive("integrator.ds_scale", integrator.ds_scale)?;
        if integrator.step_count_max == 0 {
            return Err(invalid("integrator.step_count_max", "must be at least 1"));
        }

        if self.slowdown.pert_ratio_ref < 0.0 {
            return Err(invalid("slowdown.pert_ratio_ref", "must be non-negative"));
        }
        positive("slowdown.timescale_max", self.slowdown.timescale_max)?;

        positive(
            "interaction.gravitational_constant",
            self.interaction.gravitational_constant,
        )?;
        if self.interaction.eps_sq < 0.0 {
            return Err(invalid("interaction.eps_sq", "must be non-negative"));
        }

        if self.run.time_end < self.run.time_start {
            return Err(invalid("run.time_end", "must not be before run.time_start"));
        }
        if self.run.output_interval < 0.0 {
            return Err(invalid("run.output_interval", "must be non-negative"));
        }
        if self.run.print_width < 10 {
            return Err(invalid("run.print_width", "must be at least 10"));
        }
        tracing::debug!("configuration validated");
        Ok(())
    }

    /// Force law described by `[interaction]`.
    #[must_use]
    pub fn build_interaction(&self) -> NewtonianInteraction {
        NewtonianInteraction {
            gravitational_constant: self.interaction.gravitational_constant,
            eps_sq: self.interaction.eps_sq,
            merge_enabled: self.interaction.merge_enabled,
        }
    }

    /// Manager described by `[integrator]`, `[slowdown]` and `[interaction]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the manager rejects a value.
    pub fn build_manager(&self) -> Result<SymplecticManager<NewtonianInteraction>> {
        let mut manager = SymplecticManager::new(self.build_interaction(), self.integrator.order)?;
        manager.energy_error_relative_max = self.integrator.energy_error_relative_max;
        manager.time_step_min = self.integrator.time_step_min;
        manager.time_error_max = self.integrator.time_error_max;
        manager.ds_scale = self.integrator.ds_scale;
        manager.step_count_max = self.integrator.step_count_max;
        manager.slowdown_pert_ratio_ref = self.slowdown.pert_ratio_ref;
        manager.slowdown_timescale_max = self.slowdown.timescale_max;
        manager.check_params()?;
        Ok(manager)
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<()> {
    if value.is_nan() || value <= 0.0 {
        return Err(Error::InvalidConfig {
            field: field.to_string(),
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        let manager = config.build_manager().unwrap();
        assert_eq!(manager.step.order(), 4);
        assert!((manager.interaction.gravitational_constant - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_tables() {
        let config = Config::from_toml_str(
            r#"
            [integrator]
            order = 6
            energy_error_relative_max = 1e-12

            [interaction]
            merge_enabled = true

            [run]
            time_end = 50.0
            output_interval = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(config.integrator.order, 6);
        assert!(config.interaction.merge_enabled);
        assert!((config.run.time_end - 50.0).abs() < f64::EPSILON);
        assert!((config.integrator.ds_scale - 1.0).abs() < f64::EPSILON);

        let manager = config.build_manager().unwrap();
        assert!((manager.energy_error_relative_max - 1e-12).abs() < f64::EPSILON);
        assert!(manager.interaction.merge_enabled);
    }

    #[test]
    fn test_validation_names_field() {
        let err = Config::from_toml_str("[integrator]\norder = 3\n").unwrap_err();
        assert!(format!("{err}").contains("integrator.order"));

        let err = Config::from_toml_str("[run]\ntime_start = 2.0\ntime_end = 1.0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let err = Config::from_toml_str("[integrator]\nordre = 4\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = Config::default();
        config.integrator.order = 8;
        config.run.time_end = 3.5;
        config.slowdown.timescale_max = 1e6;
        let text = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }
}
