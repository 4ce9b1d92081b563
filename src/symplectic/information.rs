//! Step-size estimate, fix-step policy and Kepler hierarchy of a group

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::binary_tree::{BinaryNode, BinaryTree};
use crate::particle::Particle;
use crate::{Error, Result};

/// `2 pi / 32`: one thirty-second of a bound orbit
const DS_FACTOR_BOUND: f64 = 0.196_349_540_84;
/// `pi / 128`: one two-hundred-fifty-sixth of an unbound orbit
const DS_FACTOR_UNBOUND: f64 = 0.024_543_692_6;

/// Fix-step policy for the adaptive step outside time synchronisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixStepOption {
    /// Never change `ds`
    Always,
    /// Adjust `ds` until the first step passes the error check, then fix it
    Later,
    /// Adjust `ds` freely
    #[default]
    None,
}

/// Kepler orbital information and initial step size of a group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Information {
    /// Step size in fictitious time
    pub ds: f64,
    /// Fix-step policy
    pub fix_step_option: FixStepOption,
    /// Hierarchical orbits of the members
    pub binary_tree: BinaryTree,
}

impl Information {
    /// Check whether the information is usable for integration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] without a binary tree and
    /// [`Error::InvalidParameter`] for a non-positive `ds`.
    pub fn check_params(&self) -> Result<()> {
        if self.binary_tree.is_empty() {
            return Err(Error::InvalidInput("binary tree has not been generated".to_string()));
        }
        if self.ds.is_nan() || self.ds <= 0.0 {
            return Err(Error::invalid_parameter(
                "ds",
                format!("must be positive, got {}", self.ds),
            ));
        }
        Ok(())
    }

    /// Build the hierarchy of `particles`.
    ///
    /// # Errors
    ///
    /// Propagates [`BinaryTree::generate`] errors.
    pub fn generate_binary_tree(&mut self, particles: &[Particle], g: f64) -> Result<()> {
        self.binary_tree = BinaryTree::generate(particles, g)?;
        Ok(())
    }

    /// Root orbit.
    #[must_use]
    pub fn binary_tree_root(&self) -> Option<&BinaryNode> {
        self.binary_tree.root()
    }

    /// Estimate `ds` from the tightest orbit and choose the fix-step policy.
    ///
    /// Each orbit suggests `ds = dt * G m1 m2 / r` with `dt` a fixed
    /// fraction of its period; the minimum over all orbits, times
    /// `ds_scale`, is used. Two-body groups fix their step after the first
    /// accepted step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no orbit has two massive members.
    pub fn calc_ds_and_step_option(&mut self, g: f64, ds_scale: f64) -> Result<()> {
        let ds_min = self
            .binary_tree
            .process_root_iter(f64::MAX, |ds, bin| ds.min(calc_ds_kepler(bin, g)));
        if ds_min == f64::MAX {
            return Err(Error::InvalidInput(
                "no orbit with two massive members to estimate the step size".to_string(),
            ));
        }
        self.ds = ds_min * ds_scale;

        let n_particle = self.binary_tree.root().map_or(0, BinaryNode::member_n);
        self.fix_step_option = if n_particle == 2 {
            FixStepOption::Later
        } else {
            FixStepOption::None
        };
        Ok(())
    }

    /// Set the slowdown reference of the root orbit and its inner orbits.
    pub fn initial_slowdown_reference(&mut self, ratio_ref: f64, timescale_max: f64) {
        for node in self.binary_tree.nodes_mut() {
            node.slowdown.initial_slowdown_reference(ratio_ref, timescale_max);
        }
    }

    /// Reset to the empty state.
    pub fn clear(&mut self) {
        self.ds = 0.0;
        self.fix_step_option = FixStepOption::None;
        self.binary_tree.clear();
    }

    /// Print column titles.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column_title<W: Write>(w: &mut W, width: usize) -> Result<()> {
        write!(w, "{:>width$}", "ds")?;
        Ok(())
    }

    /// Print one row of values.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column<W: Write>(&self, w: &mut W, width: usize) -> Result<()> {
        let precision = width.saturating_sub(8).max(1);
        write!(w, "{:>width$.precision$e}", self.ds)?;
        Ok(())
    }
}

/// Kepler step estimate of one orbit; `f64::MAX` when it cannot bound the step.
///
/// Only the bound estimate scales with `g`; the hyperbolic one is a fixed
/// fraction of `sqrt(-semi / (m1 + m2))`.
fn calc_ds_kepler(bin: &BinaryNode, g: f64) -> f64 {
    let m12 = bin.m1 * bin.m2;
    let semi = bin.semi();
    if m12 <= 0.0 || semi == 0.0 || !semi.is_finite() {
        return f64::MAX;
    }
    let mass = bin.m1 + bin.m2;
    if semi > 0.0 {
        DS_FACTOR_BOUND * (g * semi / mass).sqrt() * m12
    } else {
        DS_FACTOR_UNBOUND * (-semi / mass).sqrt() * m12
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circular_binary() -> Vec<Particle> {
        vec![
            Particle::new(0, 0.5, [-0.5, 0.0, 0.0], [0.0, -0.5, 0.0]),
            Particle::new(1, 0.5, [0.5, 0.0, 0.0], [0.0, 0.5, 0.0]),
        ]
    }

    #[test]
    fn test_ds_from_circular_binary() {
        let mut info = Information::default();
        info.generate_binary_tree(&circular_binary(), 1.0).unwrap();
        info.calc_ds_and_step_option(1.0, 1.0).unwrap();
        // a = 1, M = 1: ds = 2 pi / 32 * m1 m2
        assert!((info.ds - DS_FACTOR_BOUND * 0.25).abs() < 1e-12);
        assert_eq!(info.fix_step_option, FixStepOption::Later);
        assert!(info.check_params().is_ok());
    }

    #[test]
    fn test_ds_scale() {
        let mut info = Information::default();
        info.generate_binary_tree(&circular_binary(), 1.0).unwrap();
        info.calc_ds_and_step_option(1.0, 0.5).unwrap();
        assert!((info.ds - 0.5 * DS_FACTOR_BOUND * 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_hyperbolic_ds_ignores_g() {
        let particles = vec![
            Particle::new(0, 0.5, [-0.5, 0.0, 0.0], [0.0, -2.0, 0.0]),
            Particle::new(1, 0.5, [0.5, 0.0, 0.0], [0.0, 2.0, 0.0]),
        ];
        let mut info = Information::default();
        info.generate_binary_tree(&particles, 1.0).unwrap();
        let root = info.binary_tree.root().unwrap();
        assert!(root.semi() < 0.0);
        let ds = calc_ds_kepler(root, 1.0);
        let expected = DS_FACTOR_UNBOUND * (-root.semi()).sqrt() * 0.25;
        assert!((ds - expected).abs() < 1e-14);
        assert!((calc_ds_kepler(root, 4.0) - ds).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bound_ds_scales_with_g() {
        let mut info = Information::default();
        info.generate_binary_tree(&circular_binary(), 1.0).unwrap();
        let root = info.binary_tree.root().unwrap();
        let ratio = calc_ds_kepler(root, 4.0) / calc_ds_kepler(root, 1.0);
        assert!((ratio - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_mass_group_fails() {
        let particles = vec![
            Particle::new(0, 0.0, [0.0; 3], [0.0; 3]),
            Particle::new(1, 0.0, [1.0, 0.0, 0.0], [0.0; 3]),
        ];
        let mut info = Information::default();
        info.generate_binary_tree(&particles, 1.0).unwrap();
        assert!(info.calc_ds_and_step_option(1.0, 1.0).is_err());
    }

    #[test]
    fn test_clear() {
        let mut info = Information::default();
        info.generate_binary_tree(&circular_binary(), 1.0).unwrap();
        info.calc_ds_and_step_option(1.0, 1.0).unwrap();
        info.clear();
        assert!(info.binary_tree.is_empty());
        assert!(info.check_params().is_err());
    }
}
