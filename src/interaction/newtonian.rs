//! Point-mass Newtonian gravity with optional Plummer softening

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{BinaryInterrupt, Force, Interaction, InterruptStatus, NoPerturber};
use crate::binary_tree::{BinaryNode, BinaryTree, Member};
use crate::particle::{Particle, ParticleStatus};
use crate::slowdown::SlowDown;
use crate::{Error, Result};

/// Member count from which the pairwise force loop runs on the shared pool
pub const PARALLEL_THRESHOLD: usize = 64;

/// Newtonian interaction
///
/// The kick factor is `gt_kick_inv = sum_{i<j} G m_i m_j / r_ij`, i.e.
/// `-epot`, which gives the logarithmic-Hamiltonian time transformation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonianInteraction {
    /// Gravitational constant, must be positive
    pub gravitational_constant: f64,
    /// Softening length squared
    pub eps_sq: f64,
    /// Merge members whose pericenter falls inside their radius sum
    pub merge_enabled: bool,
}

impl Default for NewtonianInteraction {
    fn default() -> Self {
        Self {
            gravitational_constant: -1.0,
            eps_sq: 0.0,
            merge_enabled: false,
        }
    }
}

impl NewtonianInteraction {
    /// Interaction with gravitational constant `g`, no softening.
    #[must_use]
    pub const fn new(g: f64) -> Self {
        Self {
            gravitational_constant: g,
            eps_sq: 0.0,
            merge_enabled: false,
        }
    }

    /// Perturbation strength of a binary at apocenter, `m1 m2 / apo^3`.
    #[must_use]
    pub fn calc_pert_from_binary(&self, bin: &BinaryNode) -> f64 {
        let apo = bin.apocenter();
        if apo <= 0.0 {
            return 0.0;
        }
        bin.m1 * bin.m2 / (apo * apo * apo)
    }

    /// Acceleration, time-transformation gradient, potential and kick
    /// factor contribution of particle `i`.
    fn member_force(&self, i: usize, particles: &[Particle], force: &mut Force) -> (f64, f64) {
        let g = self.gravitational_constant;
        let pi = &particles[i];
        let mut acc = [0.0; 3];
        let mut gt_grad = [0.0; 3];
        let mut poti = 0.0;
        let mut gtki = 0.0;
        for (j, pj) in particles.iter().enumerate() {
            if i == j {
                continue;
            }
            let dr = crate::vec3::sub(&pj.pos, &pi.pos);
            let r2 = crate::vec3::norm2(&dr) + self.eps_sq;
            let inv_r = 1.0 / r2.sqrt();
            let inv_r3 = inv_r * inv_r * inv_r;
            let gmor3 = g * pj.mass * inv_r3;
            let mimjor3 = pi.mass * gmor3;
            for k in 0..3 {
                acc[k] += gmor3 * dr[k];
                gt_grad[k] += mimjor3 * dr[k];
            }
            let gmor = g * pj.mass * inv_r;
            poti -= gmor;
            gtki += gmor;
        }
        force.acc_in = acc;
        force.acc_pert = [0.0; 3];
        force.gt_grad = gt_grad;
        (poti * pi.mass, gtki * pi.mass)
    }
}

impl Interaction for NewtonianInteraction {
    type Perturber = NoPerturber;

    fn check_params(&self) -> Result<()> {
        if self.gravitational_constant <= 0.0 {
            return Err(Error::invalid_parameter(
                "gravitational_constant",
                format!("must be positive, got {}", self.gravitational_constant),
            ));
        }
        if self.eps_sq < 0.0 {
            return Err(Error::invalid_parameter(
                "eps_sq",
                format!("must be non-negative, got {}", self.eps_sq),
            ));
        }
        Ok(())
    }

    fn gravitational_constant(&self) -> f64 {
        self.gravitational_constant
    }

    fn calc_acc_pot_and_gt_kick_inv(
        &self,
        forces: &mut [Force],
        particles: &[Particle],
        _particle_cm: &Particle,
        _perturber: &NoPerturber,
        _time: f64,
    ) -> (f64, f64) {
        let n = particles.len();
        let (epot2, gtk2) = if n >= PARALLEL_THRESHOLD {
            crate::executor::install(|| {
                forces[..n]
                    .par_iter_mut()
                    .enumerate()
                    .map(|(i, force)| self.member_force(i, particles, force))
                    .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
            })
        } else {
            forces[..n]
                .iter_mut()
                .enumerate()
                .map(|(i, force)| self.member_force(i, particles, force))
                .fold((0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
        };
        (0.5 * epot2, 0.5 * gtk2)
    }

    fn calc_acc_pot_and_gt_kick_inv_two(
        &self,
        forces: &mut [Force],
        particles: &[Particle],
        _particle_cm: &Particle,
        _perturber: &NoPerturber,
        _time: f64,
    ) -> (f64, f64) {
        let g = self.gravitational_constant;
        let (p1, p2) = (&particles[0], &particles[1]);
        let dr = crate::vec3::sub(&p2.pos, &p1.pos);
        let r2 = crate::vec3::norm2(&dr) + self.eps_sq;
        let inv_r = 1.0 / r2.sqrt();
        let inv_r3 = inv_r * inv_r * inv_r;

        let gmor3_1 = g * p2.mass * inv_r3;
        let gmor3_2 = g * p1.mass * inv_r3;
        let gm1m2 = g * p1.mass * p2.mass;
        let gm1m2or3 = gm1m2 * inv_r3;

        for k in 0..3 {
            forces[0].acc_in[k] = gmor3_1 * dr[k];
            forces[1].acc_in[k] = -gmor3_2 * dr[k];
            forces[0].gt_grad[k] = gm1m2or3 * dr[k];
            forces[1].gt_grad[k] = -gm1m2or3 * dr[k];
        }
        forces[0].acc_pert = [0.0; 3];
        forces[1].acc_pert = [0.0; 3];

        let gm1m2or = gm1m2 * inv_r;
        (-gm1m2or, gm1m2or)
    }

    fn calc_slowdown_pert(
        &self,
        slowdown: &mut SlowDown,
        _particle_cm: &Particle,
        bin_root: &BinaryNode,
        _perturber: &NoPerturber,
    ) {
        // no perturbers: pert_out stays zero, so kappa resolves to 1
        slowdown.pert_in = self.calc_pert_from_binary(bin_root);
        slowdown.pert_out = 0.0;
        slowdown.period = bin_root.period();
        slowdown.timescale = slowdown.timescale_max();
        slowdown.calc_slowdown_factor();
    }

    fn modify_and_interrupt(
        &self,
        interrupt: &mut BinaryInterrupt,
        tree: &BinaryTree,
        particles: &mut [Particle],
    ) {
        if !self.merge_enabled {
            return;
        }
        for (index, node) in tree.nodes().iter().enumerate() {
            if interrupt.status != InterruptStatus::None {
                break;
            }
            if node.member_n() != 2 {
                continue;
            }
            let [Member::Particle(i1), Member::Particle(i2)] = node.members else {
                continue;
            };
            let (p1, p2) = pair_mut(particles, i1, i2);
            if p1.status == ParticleStatus::Unused || p2.status == ParticleStatus::Unused {
                continue;
            }

            let both_premerge =
                p1.status == ParticleStatus::PreMerge && p2.status == ParticleStatus::PreMerge;
            if both_premerge
                && p1.time_check < interrupt.time_end
                && p2.time_check < interrupt.time_end
            {
                merge(p1, p2);
                interrupt.node = Some(index);
                interrupt.status = InterruptStatus::Merge;
                continue;
            }

            let radius = p1.radius + p2.radius;
            if node.pericenter() >= radius
                || p1.status == ParticleStatus::PreMerge
                || p2.status == ParticleStatus::PreMerge
            {
                continue;
            }
            let dr = crate::vec3::sub(&p1.pos, &p2.pos);
            let dv = crate::vec3::sub(&p1.vel, &p2.vel);
            if crate::vec3::dot(&dr, &dv) >= 0.0 {
                continue;
            }
            let t_peri = node.orbit.time_to_pericenter();
            if t_peri < interrupt.time_end - interrupt.time_now {
                merge(p1, p2);
                interrupt.node = Some(index);
                interrupt.status = InterruptStatus::Merge;
            } else {
                let time_check = interrupt.time_now + t_peri;
                p1.status = ParticleStatus::PreMerge;
                p2.status = ParticleStatus::PreMerge;
                p1.time_check = time_check;
                p2.time_check = time_check;
            }
        }
    }
}

/// Two distinct mutable particles.
fn pair_mut(particles: &mut [Particle], i: usize, j: usize) -> (&mut Particle, &mut Particle) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = particles.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = particles.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

/// Put the merged c.m. into `p1` and leave `p2` as an unused zero mass.
fn merge(p1: &mut Particle, p2: &mut Particle) {
    let mcm = p1.mass + p2.mass;
    for k in 0..3 {
        p1.pos[k] = (p1.mass * p1.pos[k] + p2.mass * p2.pos[k]) / mcm;
        p1.vel[k] = (p1.mass * p1.vel[k] + p2.mass * p2.vel[k]) / mcm;
    }
    p1.mass = mcm;
    p1.status = ParticleStatus::Single;
    p1.time_check = f64::MAX;
    p2.mass = 0.0;
    p2.status = ParticleStatus::Unused;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary() -> Vec<Particle> {
        vec![
            Particle::new(0, 1.0, [-0.5, 0.0, 0.0], [0.0, -0.5, 0.0]),
            Particle::new(1, 1.0, [0.5, 0.0, 0.0], [0.0, 0.5, 0.0]),
        ]
    }

    #[test]
    fn test_check_params() {
        assert!(NewtonianInteraction::default().check_params().is_err());
        assert!(NewtonianInteraction::new(1.0).check_params().is_ok());
    }

    #[test]
    fn test_two_body_matches_general_path() {
        let interaction = NewtonianInteraction::new(1.0);
        let particles = binary();
        let cm = Particle::default();
        let mut f_gen = vec![Force::default(); 2];
        let mut f_two = vec![Force::default(); 2];
        let (epot_gen, gtk_gen) =
            interaction.calc_acc_pot_and_gt_kick_inv(&mut f_gen, &particles, &cm, &NoPerturber, 0.0);
        let (epot_two, gtk_two) = interaction.calc_acc_pot_and_gt_kick_inv_two(
            &mut f_two,
            &particles,
            &cm,
            &NoPerturber,
            0.0,
        );
        assert!((epot_gen + 1.0).abs() < 1e-15);
        assert!((epot_gen - epot_two).abs() < 1e-15);
        assert!((gtk_gen - gtk_two).abs() < 1e-15);
        for i in 0..2 {
            for k in 0..3 {
                assert!((f_gen[i].acc_in[k] - f_two[i].acc_in[k]).abs() < 1e-15);
                assert!((f_gen[i].gt_grad[k] - f_two[i].gt_grad[k]).abs() < 1e-15);
            }
        }
        // attraction toward the partner
        assert!((f_gen[0].acc_in[0] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_parallel_path_matches_serial() {
        let interaction = NewtonianInteraction::new(1.0);
        let n = PARALLEL_THRESHOLD + 6;
        let particles: Vec<Particle> = (0..n)
            .map(|i| {
                let x = i as f64;
                Particle::new(i as i64, 1.0 + 0.01 * x, [x, (x * 0.7).sin(), 0.1 * x], [0.0; 3])
            })
            .collect();
        let cm = Particle::default();
        let mut forces = vec![Force::default(); n];
        let (epot, gtk) =
            interaction.calc_acc_pot_and_gt_kick_inv(&mut forces, &particles, &cm, &NoPerturber, 0.0);

        let mut serial = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let dr = crate::vec3::sub(&particles[j].pos, &particles[i].pos);
                serial -= particles[i].mass * particles[j].mass / crate::vec3::norm2(&dr).sqrt();
            }
        }
        assert!((epot - serial).abs() < 1e-10 * serial.abs());
        assert!((gtk + epot).abs() < 1e-10 * serial.abs());
    }

    #[test]
    fn test_merge_on_close_approach() {
        let interaction = NewtonianInteraction {
            merge_enabled: true,
            ..NewtonianInteraction::new(1.0)
        };
        // nearly radial infall toward each other
        let mut particles = vec![
            Particle::new(0, 1.0, [-1.0, 0.0, 0.0], [0.2, 0.01, 0.0]).with_radius(0.1),
            Particle::new(1, 1.0, [1.0, 0.0, 0.0], [-0.2, -0.01, 0.0]).with_radius(0.1),
        ];
        let tree = BinaryTree::generate(&particles, 1.0).unwrap();
        let mut interrupt = BinaryInterrupt::new(0.0, 100.0);
        interaction.modify_and_interrupt(&mut interrupt, &tree, &mut particles);
        assert_eq!(interrupt.status, InterruptStatus::Merge);
        assert_eq!(interrupt.node, Some(0));
        assert!((particles[0].mass - 2.0).abs() < f64::EPSILON);
        assert_eq!(particles[1].status, ParticleStatus::Unused);
        assert!(particles[0].pos[0].abs() < 1e-15);
    }

    #[test]
    fn test_premerge_when_pericenter_is_later() {
        let interaction = NewtonianInteraction {
            merge_enabled: true,
            ..NewtonianInteraction::new(1.0)
        };
        let mut particles = vec![
            Particle::new(0, 1.0, [-1.0, 0.0, 0.0], [0.2, 0.01, 0.0]).with_radius(0.1),
            Particle::new(1, 1.0, [1.0, 0.0, 0.0], [-0.2, -0.01, 0.0]).with_radius(0.1),
        ];
        let tree = BinaryTree::generate(&particles, 1.0).unwrap();
        let mut interrupt = BinaryInterrupt::new(0.0, 1e-3);
        interaction.modify_and_interrupt(&mut interrupt, &tree, &mut particles);
        assert_eq!(interrupt.status, InterruptStatus::None);
        assert_eq!(particles[0].status, ParticleStatus::PreMerge);
        assert!(particles[0].time_check > 1e-3);
    }

    #[test]
    fn test_no_merge_when_disabled() {
        let interaction = NewtonianInteraction::new(1.0);
        let mut particles = binary();
        particles[0].radius = 10.0;
        let tree = BinaryTree::generate(&particles, 1.0).unwrap();
        let mut interrupt = BinaryInterrupt::new(0.0, 1.0);
        interaction.modify_and_interrupt(&mut interrupt, &tree, &mut particles);
        assert!(!interrupt.is_interrupted());
    }
}
