//! Slowdown factor for weakly perturbed inner orbits
//!
//! A slowed-down orbit is integrated `kappa` times slower than physical
//! time, with the perturbation effect amplified by the same factor. The
//! factor comes from the ratio of inner binding perturbation to outer
//! perturbation, limited so that one slowed-down period never exceeds
//! the perturbation timescale.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Slowdown parameters of one orbit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowDown {
    /// Inner perturbation (e.g. `m1 m2 / apo^3`)
    pub pert_in: f64,
    /// Outer perturbation from other members and perturbers
    pub pert_out: f64,
    /// Orbital period
    pub period: f64,
    /// Perturbation timescale
    pub timescale: f64,
    timescale_max: f64,
    kappa_ref: f64,
    kappa: f64,
}

impl Default for SlowDown {
    fn default() -> Self {
        Self {
            pert_in: 0.0,
            pert_out: 0.0,
            period: 0.0,
            timescale: 0.0,
            timescale_max: 0.0,
            kappa_ref: 0.0,
            kappa: 1.0,
        }
    }
}

impl SlowDown {
    /// Set the perturbation ratio reference and the maximum timescale.
    ///
    /// `kappa` is reset to 1.
    pub fn initial_slowdown_reference(&mut self, ratio_ref: f64, timescale_max: f64) {
        self.kappa_ref = ratio_ref;
        self.timescale_max = timescale_max;
        self.kappa = 1.0;
    }

    /// Check that the reference values have been set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a negative reference or a
    /// non-positive maximum timescale.
    pub fn check_params(&self) -> Result<()> {
        if self.kappa_ref < 0.0 {
            return Err(Error::invalid_parameter(
                "slowdown.kappa_ref",
                format!("must be non-negative, got {}", self.kappa_ref),
            ));
        }
        if self.timescale_max <= 0.0 {
            return Err(Error::invalid_parameter(
                "slowdown.timescale_max",
                format!("must be positive, got {}", self.timescale_max),
            ));
        }
        Ok(())
    }

    /// Update `kappa` from the current perturbations.
    pub fn calc_slowdown_factor(&mut self) {
        if self.pert_out <= 0.0 || self.timescale <= 0.0 || self.period <= 0.0 {
            self.kappa = 1.0;
            return;
        }
        let kappa_max = (self.timescale / self.period).max(1.0);
        let kappa_org = self.kappa_ref * self.pert_in / self.pert_out;
        self.kappa = kappa_org.min(kappa_max).max(1.0);
    }

    /// Force a slowdown factor, clamped to at least 1.
    pub fn set_slowdown_factor(&mut self, kappa: f64) {
        self.kappa = kappa.max(1.0);
    }

    /// Current slowdown factor (always >= 1).
    #[must_use]
    pub const fn slowdown_factor(&self) -> f64 {
        self.kappa
    }

    /// Maximum perturbation timescale.
    #[must_use]
    pub const fn timescale_max(&self) -> f64 {
        self.timescale_max
    }

    /// Perturbation ratio reference.
    #[must_use]
    pub const fn kappa_ref(&self) -> f64 {
        self.kappa_ref
    }

    /// Print column titles.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column_title<W: Write>(w: &mut W, width: usize) -> Result<()> {
        for title in ["SD", "pert_in", "pert_out", "SD_tscale"] {
            write!(w, "{title:>width$}")?;
        }
        Ok(())
    }

    /// Print one row of values matching [`print_column_title`](Self::print_column_title).
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column<W: Write>(&self, w: &mut W, width: usize) -> Result<()> {
        let precision = width.saturating_sub(8).max(1);
        for value in [self.kappa, self.pert_in, self.pert_out, self.timescale] {
            write!(w, "{value:>width$.precision$e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> SlowDown {
        let mut sd = SlowDown::default();
        sd.initial_slowdown_reference(1e-4, 100.0);
        sd
    }

    #[test]
    fn test_no_outer_perturbation_gives_unity() {
        let mut sd = reference();
        sd.pert_in = 1.0;
        sd.period = 1.0;
        sd.timescale = 10.0;
        sd.calc_slowdown_factor();
        assert!((sd.slowdown_factor() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_limited_by_timescale() {
        let mut sd = reference();
        sd.pert_in = 1.0;
        sd.pert_out = 1e-9;
        sd.period = 1.0;
        sd.timescale = 20.0;
        sd.calc_slowdown_factor();
        assert!((sd.slowdown_factor() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_limited_by_perturbation_ratio() {
        let mut sd = reference();
        sd.pert_in = 1.0;
        sd.pert_out = 1e-5;
        sd.period = 1.0;
        sd.timescale = 1e6;
        sd.calc_slowdown_factor();
        assert!((sd.slowdown_factor() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_strong_perturbation_clamps_to_one() {
        let mut sd = reference();
        sd.pert_in = 1.0;
        sd.pert_out = 1.0;
        sd.period = 1.0;
        sd.timescale = 1e6;
        sd.calc_slowdown_factor();
        assert!((sd.slowdown_factor() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_check_params() {
        assert!(SlowDown::default().check_params().is_err());
        assert!(reference().check_params().is_ok());
    }
}
