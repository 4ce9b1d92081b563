//! Pairwise softened gravity with jerk

use serde::{Deserialize, Serialize};

use crate::particle::Particle;
use crate::vec3;
use crate::{Error, Result};

/// Acceleration and its time derivative
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceH4 {
    /// Acceleration
    pub acc0: [f64; 3],
    /// Jerk
    pub acc1: [f64; 3],
}

impl ForceH4 {
    /// Reset both derivatives to zero.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Softened Newtonian interaction between single particles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HermiteInteraction {
    /// Softening length squared
    pub eps_sq: f64,
    /// Gravitational constant
    pub g: f64,
}

impl Default for HermiteInteraction {
    fn default() -> Self {
        Self {
            eps_sq: -1.0,
            g: -1.0,
        }
    }
}

impl HermiteInteraction {
    /// Interaction with gravitational constant `g` and softening `eps_sq`.
    #[must_use]
    pub const fn new(g: f64, eps_sq: f64) -> Self {
        Self { eps_sq, g }
    }

    /// Check whether the parameters were set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a negative softening or a
    /// non-positive `g`.
    pub fn check_params(&self) -> Result<()> {
        if self.eps_sq < 0.0 {
            return Err(Error::invalid_parameter(
                "eps_sq",
                format!("must be non-negative, got {}", self.eps_sq),
            ));
        }
        if self.g <= 0.0 {
            return Err(Error::invalid_parameter(
                "g",
                format!("must be positive, got {}", self.g),
            ));
        }
        Ok(())
    }

    /// Squared separation of `pi` and `pj`.
    #[must_use]
    pub fn calc_r2_pair(&self, pi: &Particle, pj: &Particle) -> f64 {
        vec3::norm2(&vec3::sub(&pj.pos, &pi.pos))
    }

    /// Add the acceleration and jerk from `pj` to `fi`; returns the
    /// unsoftened squared separation.
    pub fn calc_acc_jerk_pair(&self, fi: &mut ForceH4, pi: &Particle, pj: &Particle) -> f64 {
        let dr = vec3::sub(&pj.pos, &pi.pos);
        let dv = vec3::sub(&pj.vel, &pi.vel);
        let dr2 = vec3::norm2(&dr);
        let rinv = 1.0 / (dr2 + self.eps_sq).sqrt();
        let rinv2 = rinv * rinv;
        let mor3 = self.g * pj.mass * rinv2 * rinv;
        let drdv = vec3::dot(&dr, &dv);
        for k in 0..3 {
            let acc0 = mor3 * dr[k];
            fi.acc0[k] += acc0;
            fi.acc1[k] += mor3 * dv[k] - 3.0 * drdv * rinv2 * acc0;
        }
        dr2
    }

    /// Potential at `pi` from `pj`.
    #[must_use]
    pub fn calc_pot_pair(&self, pi: &Particle, pj: &Particle) -> f64 {
        let dr2 = self.calc_r2_pair(pi, pj);
        -self.g * pj.mass / (dr2 + self.eps_sq).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_params() {
        assert!(HermiteInteraction::default().check_params().is_err());
        assert!(HermiteInteraction::new(1.0, -0.1).check_params().is_err());
        assert!(HermiteInteraction::new(1.0, 0.0).check_params().is_ok());
    }

    #[test]
    fn test_acc_jerk_pair() {
        let interaction = HermiteInteraction::new(1.0, 0.0);
        let pi = Particle::new(0, 1.0, [0.0; 3], [0.0; 3]);
        let pj = Particle::new(1, 2.0, [2.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let mut f = ForceH4::default();
        let r2 = interaction.calc_acc_jerk_pair(&mut f, &pi, &pj);
        assert!((r2 - 4.0).abs() < f64::EPSILON);
        // G m / r^2 toward pj
        assert!((f.acc0[0] - 0.5).abs() < 1e-15);
        // transverse motion: jerk = G m v / r^3
        assert!((f.acc1[1] - 0.25).abs() < 1e-15);
        assert!(f.acc1[0].abs() < 1e-15);
    }

    #[test]
    fn test_jerk_matches_finite_difference() {
        let interaction = HermiteInteraction::new(1.0, 0.01);
        let pi = Particle::new(0, 1.0, [0.1, -0.2, 0.3], [0.3, 0.1, 0.0]);
        let pj = Particle::new(1, 1.5, [1.0, 0.5, -0.4], [-0.2, 0.4, 0.1]);
        let h = 1e-6;
        let shift = |p: &Particle, t: f64| {
            let mut q = *p;
            for k in 0..3 {
                q.pos[k] += p.vel[k] * t;
            }
            q
        };
        let mut f0 = ForceH4::default();
        let mut fp = ForceH4::default();
        let mut fm = ForceH4::default();
        interaction.calc_acc_jerk_pair(&mut f0, &pi, &pj);
        interaction.calc_acc_jerk_pair(&mut fp, &shift(&pi, h), &shift(&pj, h));
        interaction.calc_acc_jerk_pair(&mut fm, &shift(&pi, -h), &shift(&pj, -h));
        for k in 0..3 {
            let numeric = (fp.acc0[k] - fm.acc0[k]) / (2.0 * h);
            assert!((numeric - f0.acc1[k]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_pot_pair_softened() {
        let interaction = HermiteInteraction::new(2.0, 0.75);
        let pi = Particle::new(0, 1.0, [0.0; 3], [0.0; 3]);
        let pj = Particle::new(1, 3.0, [0.5, 0.0, 0.0], [0.0; 3]);
        assert!((interaction.calc_r2_pair(&pi, &pj) - 0.25).abs() < f64::EPSILON);
        assert!((interaction.calc_pot_pair(&pi, &pj) + 6.0).abs() < 1e-15);
    }
}
