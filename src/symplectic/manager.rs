//! Integration parameters shared by all integrators of one kind

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::SymplecticStep;
use crate::checkpoint;
use crate::interaction::Interaction;
use crate::{Error, Result};

/// Default relative energy error limit per step
pub const DEFAULT_ENERGY_ERROR_RELATIVE_MAX: f64 = 1e-10;
/// Default minimum physical time step
pub const DEFAULT_TIME_STEP_MIN: f64 = 1e-13;
/// Default tolerance for reaching the end time
pub const DEFAULT_TIME_ERROR_MAX: f64 = 1e-10;
/// Default step limit for one `integrate_to_time` call
pub const DEFAULT_STEP_COUNT_MAX: u64 = 1_000_000;

/// Parameters and interaction of the time-transformed symplectic method.
///
/// One manager is usually shared by many integrators, so integrators
/// hold it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymplecticManager<I> {
    /// Force law
    pub interaction: I,
    /// Composition coefficients
    pub step: SymplecticStep,
    /// Maximum `|d(dE)| / |Etot|` accepted in one step
    pub energy_error_relative_max: f64,
    /// Physical time step below which integration fails
    pub time_step_min: f64,
    /// Allowed `|t - time_end|` at the end of an integration
    pub time_error_max: f64,
    /// Scale applied to the Kepler step estimate
    pub ds_scale: f64,
    /// Step limit for one `integrate_to_time` call
    pub step_count_max: u64,
    /// Slowdown perturbation ratio reference
    pub slowdown_pert_ratio_ref: f64,
    /// Slowdown maximum timescale
    pub slowdown_timescale_max: f64,
}

impl<I: Interaction> SymplecticManager<I> {
    /// Manager with default tolerances and an `order`-th order step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for an unsupported order.
    pub fn new(interaction: I, order: usize) -> Result<Self> {
        Ok(Self {
            interaction,
            step: SymplecticStep::initial_symplectic_coefficients(order)?,
            energy_error_relative_max: DEFAULT_ENERGY_ERROR_RELATIVE_MAX,
            time_step_min: DEFAULT_TIME_STEP_MIN,
            time_error_max: DEFAULT_TIME_ERROR_MAX,
            ds_scale: 1.0,
            step_count_max: DEFAULT_STEP_COUNT_MAX,
            slowdown_pert_ratio_ref: 1e-4,
            slowdown_timescale_max: f64::MAX,
        })
    }

    /// Check whether all parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] naming the first bad value.
    pub fn check_params(&self) -> Result<()> {
        let positive = [
            ("energy_error_relative_max", self.energy_error_relative_max),
            ("time_step_min", self.time_step_min),
            ("time_error_max", self.time_error_max),
            ("ds_scale", self.ds_scale),
            ("slowdown_timescale_max", self.slowdown_timescale_max),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(Error::invalid_parameter(
                    name,
                    format!("must be positive, got {value}"),
                ));
            }
        }
        if self.slowdown_pert_ratio_ref < 0.0 {
            return Err(Error::invalid_parameter(
                "slowdown_pert_ratio_ref",
                format!("must be non-negative, got {}", self.slowdown_pert_ratio_ref),
            ));
        }
        if self.step_count_max == 0 {
            return Err(Error::invalid_parameter("step_count_max", "must be at least 1"));
        }
        self.interaction.check_params()
    }

    /// Print parameters, one per line.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "energy_error_relative_max : {}", self.energy_error_relative_max)?;
        writeln!(w, "time_step_min             : {}", self.time_step_min)?;
        writeln!(w, "time_error_max            : {}", self.time_error_max)?;
        writeln!(w, "ds_scale                  : {}", self.ds_scale)?;
        writeln!(w, "step_count_max            : {}", self.step_count_max)?;
        writeln!(w, "symplectic_order          : {}", self.step.order())?;
        writeln!(w, "slowdown_pert_ratio_ref   : {}", self.slowdown_pert_ratio_ref)?;
        writeln!(w, "slowdown_timescale_max    : {}", self.slowdown_timescale_max)?;
        Ok(())
    }
}

impl<I: Serialize + DeserializeOwned> SymplecticManager<I> {
    /// Write the manager as a checkpoint record.
    ///
    /// # Errors
    ///
    /// Returns an encode or IO error.
    pub fn write_binary<W: Write>(&self, w: &mut W) -> Result<()> {
        checkpoint::write_record(w, checkpoint::MANAGER_MAGIC, self)
    }

    /// Read a manager written by [`write_binary`](Self::write_binary).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Checkpoint`] for a foreign header, or a decode/IO
    /// error.
    pub fn read_binary<R: Read>(r: &mut R) -> Result<Self> {
        checkpoint::read_record(r, checkpoint::MANAGER_MAGIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::NewtonianInteraction;

    #[test]
    fn test_new_defaults_are_valid() {
        let manager = SymplecticManager::new(NewtonianInteraction::new(1.0), 4).unwrap();
        assert_eq!(manager.step.order(), 4);
        assert!(manager.check_params().is_ok());
    }

    #[test]
    fn test_check_params_rejects_bad_values() {
        let mut manager = SymplecticManager::new(NewtonianInteraction::new(1.0), 2).unwrap();
        manager.ds_scale = 0.0;
        let err = manager.check_params().unwrap_err();
        assert!(format!("{err}").contains("ds_scale"));

        let manager = SymplecticManager::new(NewtonianInteraction::default(), 2).unwrap();
        assert!(manager.check_params().is_err());
    }

    #[test]
    fn test_print_lists_parameters() {
        let manager = SymplecticManager::new(NewtonianInteraction::new(1.0), 2).unwrap();
        let mut out = Vec::new();
        manager.print(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("symplectic_order"));
        assert!(text.contains("ds_scale"));
    }

    #[test]
    fn test_binary_round_trip() {
        let mut manager = SymplecticManager::new(NewtonianInteraction::new(2.5), 6).unwrap();
        manager.energy_error_relative_max = 1e-12;
        let mut buffer = Vec::new();
        manager.write_binary(&mut buffer).unwrap();
        let loaded =
            SymplecticManager::<NewtonianInteraction>::read_binary(&mut buffer.as_slice()).unwrap();
        assert_eq!(loaded, manager);
    }
}
