//! Particle group with a separate center-of-mass particle

use serde::{Deserialize, Serialize};

use super::Particle;

/// Member particles and their center of mass.
///
/// While `is_center_of_mass_frame()` is true, member coordinates are
/// relative to `cm`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleGroup {
    members: Vec<Particle>,
    cm: Particle,
    cm_frame: bool,
}

impl ParticleGroup {
    /// Create a group in the origin frame.
    #[must_use]
    pub fn new(members: Vec<Particle>) -> Self {
        let mut group = Self {
            members,
            cm: Particle::default(),
            cm_frame: false,
        };
        group.calc_center_of_mass();
        group
    }

    /// Reserve space for `n` members.
    pub fn reserve(&mut self, n: usize) {
        self.members.reserve(n);
    }

    /// Add a member in the current frame.
    pub fn add_member(&mut self, particle: Particle) {
        self.members.push(particle);
    }

    /// Remove all members and reset the center of mass.
    pub fn clear(&mut self) {
        self.members.clear();
        self.cm = Particle::default();
        self.cm_frame = false;
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member particles.
    #[must_use]
    pub fn members(&self) -> &[Particle] {
        &self.members
    }

    /// Mutable member particles.
    pub fn members_mut(&mut self) -> &mut [Particle] {
        &mut self.members
    }

    /// Center-of-mass particle.
    #[must_use]
    pub const fn cm(&self) -> &Particle {
        &self.cm
    }

    /// Mutable center-of-mass particle, e.g. for an outer integrator to
    /// move the group.
    pub fn cm_mut(&mut self) -> &mut Particle {
        &mut self.cm
    }

    /// Move `cm` along its velocity for `dt`.
    pub fn drift_center_of_mass(&mut self, dt: f64) {
        for k in 0..3 {
            self.cm.pos[k] += self.cm.vel[k] * dt;
        }
    }

    /// Whether members are stored relative to `cm`.
    #[must_use]
    pub const fn is_center_of_mass_frame(&self) -> bool {
        self.cm_frame
    }

    /// Recompute `cm` mass, position and velocity from the members.
    ///
    /// In the center-of-mass frame only the mass is updated; the stored
    /// position and velocity already describe the group.
    pub fn calc_center_of_mass(&mut self) {
        let mut mass = 0.0;
        let mut pos = [0.0; 3];
        let mut vel = [0.0; 3];
        for p in &self.members {
            mass += p.mass;
            for k in 0..3 {
                pos[k] += p.mass * p.pos[k];
                vel[k] += p.mass * p.vel[k];
            }
        }
        self.cm.mass = mass;
        if self.cm_frame {
            return;
        }
        if mass > 0.0 {
            for k in 0..3 {
                pos[k] /= mass;
                vel[k] /= mass;
            }
        }
        self.cm.pos = pos;
        self.cm.vel = vel;
    }

    /// Move members into the center-of-mass frame. No-op if already there.
    pub fn shift_to_center_of_mass_frame(&mut self) {
        if self.cm_frame {
            return;
        }
        self.calc_center_of_mass();
        let (cpos, cvel) = (self.cm.pos, self.cm.vel);
        for p in &mut self.members {
            for k in 0..3 {
                p.pos[k] -= cpos[k];
                p.vel[k] -= cvel[k];
            }
        }
        self.cm_frame = true;
    }

    /// Move members back to the origin frame. No-op if already there.
    pub fn shift_to_origin_frame(&mut self) {
        if !self.cm_frame {
            return;
        }
        let (cpos, cvel) = (self.cm.pos, self.cm.vel);
        for p in &mut self.members {
            for k in 0..3 {
                p.pos[k] += cpos[k];
                p.vel[k] += cvel[k];
            }
        }
        self.cm_frame = false;
    }

    /// Copy members into `out` in the origin frame, keeping the group
    /// itself untouched. Only `min(out.len(), len())` slots are written.
    pub fn write_back_origin_frame(&self, out: &mut [Particle]) {
        for (dst, src) in out.iter_mut().zip(&self.members) {
            *dst = *src;
            if self.cm_frame {
                for k in 0..3 {
                    dst.pos[k] += self.cm.pos[k];
                    dst.vel[k] += self.cm.vel[k];
                }
            }
        }
    }
}
