//! Particles and particle groups
//!
//! A group is integrated in its center-of-mass frame: member positions and
//! velocities are relative to `cm`, which is kept as a separate particle so
//! an outer integrator can move the group as a whole.
//!
//! ```rust
//! use ar_symplectic::particle::{Particle, ParticleGroup};
//!
//! let mut group = ParticleGroup::new(vec![
//!     Particle::new(0, 1.0, [1.0, 0.0, 0.0], [0.0, 0.5, 0.0]),
//!     Particle::new(1, 1.0, [-1.0, 0.0, 0.0], [0.0, -0.5, 0.0]),
//! ]);
//! group.shift_to_center_of_mass_frame();
//! assert!(group.is_center_of_mass_frame());
//! assert!((group.cm().mass - 2.0).abs() < f64::EPSILON);
//! ```

mod group;
mod io;

pub use group::ParticleGroup;
pub use io::read_ascii;

use serde::{Deserialize, Serialize};

/// Evolution status of a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticleStatus {
    /// Normal particle
    #[default]
    Single,
    /// Will merge at `time_check` unless the orbit changes
    PreMerge,
    /// Zero-mass placeholder left behind by a merger
    Unused,
}

/// Point-mass particle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Particle {
    /// Identifier carried through mergers and checkpoints
    pub id: i64,
    /// Mass
    pub mass: f64,
    /// Position
    pub pos: [f64; 3],
    /// Velocity
    pub vel: [f64; 3],
    /// Physical radius, used by merger detection
    pub radius: f64,
    /// Evolution status
    pub status: ParticleStatus,
    /// Time at which a pending merger is checked
    pub time_check: f64,
}

impl Particle {
    /// Create a single particle with zero radius.
    #[must_use]
    pub fn new(id: i64, mass: f64, pos: [f64; 3], vel: [f64; 3]) -> Self {
        Self {
            id,
            mass,
            pos,
            vel,
            radius: 0.0,
            status: ParticleStatus::Single,
            time_check: f64::MAX,
        }
    }

    /// Set the physical radius.
    #[must_use]
    pub const fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Kinetic energy `m v^2 / 2`.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * crate::vec3::norm2(&self.vel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_new_defaults() {
        let p = Particle::new(7, 2.0, [0.0; 3], [1.0, 0.0, 0.0]);
        assert_eq!(p.id, 7);
        assert_eq!(p.status, ParticleStatus::Single);
        assert!(p.radius.abs() < f64::EPSILON);
        assert!((p.kinetic_energy() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_particle_with_radius() {
        let p = Particle::new(0, 1.0, [0.0; 3], [0.0; 3]).with_radius(0.5);
        assert!((p.radius - 0.5).abs() < f64::EPSILON);
    }
}
