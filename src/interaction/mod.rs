//! Interaction seam between the integrator and the force law
//!
//! The integrator only knows accelerations, potentials and the two
//! time-transformation factors; everything physical lives behind the
//! [`Interaction`] trait. [`NewtonianInteraction`] is the point-mass
//! gravity implementation used by the CLI and the tests.

mod newtonian;

pub use newtonian::{NewtonianInteraction, PARALLEL_THRESHOLD};

use serde::{Deserialize, Serialize};

use crate::binary_tree::{BinaryNode, BinaryTree};
use crate::particle::Particle;
use crate::slowdown::SlowDown;
use crate::Result;

/// Force on one member particle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Force {
    /// Acceleration from the other members
    pub acc_in: [f64; 3],
    /// Acceleration from perturbers, c.m. contribution removed
    pub acc_pert: [f64; 3],
    /// Gradient of the time-transformation function
    pub gt_grad: [f64; 3],
}

/// Interrupt state reported by [`Interaction::modify_and_interrupt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterruptStatus {
    /// Nothing happened
    #[default]
    None,
    /// Orbit parameters were modified
    Change,
    /// Two members merged
    Merge,
    /// The group must be dissolved
    Destroy,
}

/// Interrupt record returned by
/// [`integrate_to_time`](crate::integrator::TimeTransformedSymplecticIntegrator::integrate_to_time)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BinaryInterrupt {
    /// Arena index of the binary node that triggered the interrupt
    pub node: Option<usize>,
    /// Time when the interrupt was detected
    pub time_now: f64,
    /// End time of the current integration
    pub time_end: f64,
    /// What happened
    pub status: InterruptStatus,
}

impl BinaryInterrupt {
    /// An empty interrupt for the interval `[time_now, time_end]`.
    #[must_use]
    pub const fn new(time_now: f64, time_end: f64) -> Self {
        Self {
            node: None,
            time_now,
            time_end,
            status: InterruptStatus::None,
        }
    }

    /// Whether an interrupt happened.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.status != InterruptStatus::None
    }
}

/// Perturber container without members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoPerturber;

/// Force law used by the time-transformed symplectic integrator
pub trait Interaction {
    /// External perturber container handed to the force calculation
    type Perturber: Default + Clone;

    /// Check whether publicly set parameters are valid.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidParameter`] for an invalid value.
    fn check_params(&self) -> Result<()>;

    /// Gravitational constant used for orbit elements and step estimates.
    fn gravitational_constant(&self) -> f64;

    /// Compute member accelerations, the inner potential energy and the
    /// kick time-transformation factor.
    ///
    /// Every field of every `forces[i]` is overwritten. Returns
    /// `(epot, gt_kick_inv)`.
    fn calc_acc_pot_and_gt_kick_inv(
        &self,
        forces: &mut [Force],
        particles: &[Particle],
        particle_cm: &Particle,
        perturber: &Self::Perturber,
        time: f64,
    ) -> (f64, f64);

    /// Same as [`calc_acc_pot_and_gt_kick_inv`](Self::calc_acc_pot_and_gt_kick_inv)
    /// for exactly two members; implementations may use a faster path.
    fn calc_acc_pot_and_gt_kick_inv_two(
        &self,
        forces: &mut [Force],
        particles: &[Particle],
        particle_cm: &Particle,
        perturber: &Self::Perturber,
        time: f64,
    ) -> (f64, f64) {
        self.calc_acc_pot_and_gt_kick_inv(forces, particles, particle_cm, perturber, time)
    }

    /// Compute the perturbation inputs of `slowdown` and update its factor.
    fn calc_slowdown_pert(
        &self,
        slowdown: &mut SlowDown,
        particle_cm: &Particle,
        bin_root: &BinaryNode,
        perturber: &Self::Perturber,
    );

    /// Drift time-transformation factor from `ekin - etot`.
    fn calc_gt_drift_inv(&self, ekin_minus_etot: f64) -> f64 {
        ekin_minus_etot
    }

    /// Time-transformed Hamiltonian, zero on the exact solution.
    fn calc_h(&self, ekin_minus_etot: f64, epot: f64) -> f64 {
        ekin_minus_etot.ln() - (-epot).ln()
    }

    /// Modify members and report an interrupt (e.g. a merger).
    ///
    /// `tree` holds up-to-date orbits of `particles`. Implementations set
    /// `interrupt.status` and `interrupt.node` when something happened.
    fn modify_and_interrupt(
        &self,
        _interrupt: &mut BinaryInterrupt,
        _tree: &BinaryTree,
        _particles: &mut [Particle],
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_interrupt_default() {
        let interrupt = BinaryInterrupt::new(0.0, 1.0);
        assert!(!interrupt.is_interrupted());
        assert!(interrupt.node.is_none());
    }
}
