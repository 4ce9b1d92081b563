//! Shared-time-step Hermite predictor-corrector

use rayon::prelude::*;

use super::{ForceH4, HermiteInteraction};
use crate::interaction::PARALLEL_THRESHOLD;
use crate::particle::Particle;
use crate::vec3;
use crate::{Error, Result};

/// Default accuracy parameter of the Aarseth criterion
pub const DEFAULT_ETA: f64 = 0.02;
/// Default smallest allowed time step
pub const DEFAULT_DT_MIN: f64 = 1e-13;

/// Accuracy parameter of the first step, which only knows `a` and `j`
const ETA_START: f64 = 0.01;

/// Fourth-order Hermite integrator
#[derive(Debug, Clone)]
pub struct HermiteIntegrator {
    /// Force law
    pub interaction: HermiteInteraction,
    /// Aarseth accuracy parameter
    pub eta: f64,
    /// Largest allowed time step
    pub dt_max: f64,
    /// Smallest allowed time step
    pub dt_min: f64,
    particles: Vec<Particle>,
    forces: Vec<ForceH4>,
    time: f64,
    dt: f64,
}

impl HermiteIntegrator {
    /// Integrator with default accuracy and no step cap.
    #[must_use]
    pub fn new(interaction: HermiteInteraction) -> Self {
        Self {
            interaction,
            eta: DEFAULT_ETA,
            dt_max: f64::MAX,
            dt_min: DEFAULT_DT_MIN,
            particles: Vec::new(),
            forces: Vec::new(),
            time: 0.0,
            dt: 0.0,
        }
    }

    /// Load `particles` at `time`, compute forces and the first step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for bad parameters and
    /// [`Error::InvalidInput`] with fewer than two particles.
    pub fn initialize(&mut self, particles: Vec<Particle>, time: f64) -> Result<()> {
        self.interaction.check_params()?;
        if self.eta.is_nan() || self.eta <= 0.0 {
            return Err(Error::invalid_parameter(
                "eta",
                format!("must be positive, got {}", self.eta),
            ));
        }
        if self.dt_max.is_nan() || self.dt_max <= 0.0 {
            return Err(Error::invalid_parameter(
                "dt_max",
                format!("must be positive, got {}", self.dt_max),
            ));
        }
        if particles.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "hermite integration needs at least 2 particles, got {}",
                particles.len()
            )));
        }
        self.particles = particles;
        self.forces = calc_forces(&self.interaction, &self.particles);
        self.time = time;
        self.dt = self.initial_step();
        tracing::debug!(n = self.particles.len(), dt = self.dt, "hermite initialized");
        Ok(())
    }

    fn initial_step(&self) -> f64 {
        let dt = self
            .forces
            .iter()
            .map(|f| {
                let j = vec3::norm2(&f.acc1).sqrt();
                if j > 0.0 {
                    ETA_START * vec3::norm2(&f.acc0).sqrt() / j
                } else {
                    f64::MAX
                }
            })
            .fold(f64::MAX, f64::min);
        dt.min(self.dt_max)
    }

    /// Advance all particles by `dt` and choose the next step.
    pub fn integrate_one_step(&mut self, dt: f64) {
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let old = self.particles.clone();
        let old_forces = std::mem::take(&mut self.forces);

        for (p, f) in self.particles.iter_mut().zip(&old_forces) {
            for k in 0..3 {
                p.pos[k] += p.vel[k] * dt + f.acc0[k] * dt2 / 2.0 + f.acc1[k] * dt3 / 6.0;
                p.vel[k] += f.acc0[k] * dt + f.acc1[k] * dt2 / 2.0;
            }
        }

        let new_forces = calc_forces(&self.interaction, &self.particles);

        let eta = self.eta;
        let mut dt_next = f64::MAX;
        for (((p, p0), f0), f1) in self
            .particles
            .iter_mut()
            .zip(&old)
            .zip(&old_forces)
            .zip(&new_forces)
        {
            let mut snap = [0.0; 3];
            let mut crackle = [0.0; 3];
            for k in 0..3 {
                let da = f0.acc0[k] - f1.acc0[k];
                snap[k] = (-6.0 * da - dt * (4.0 * f0.acc1[k] + 2.0 * f1.acc1[k])) / dt2;
                crackle[k] = (12.0 * da + 6.0 * dt * (f0.acc1[k] + f1.acc1[k])) / dt3;
            }
            for k in 0..3 {
                p.vel[k] = p0.vel[k]
                    + (f0.acc0[k] + f1.acc0[k]) * dt / 2.0
                    + (f0.acc1[k] - f1.acc1[k]) * dt2 / 12.0;
                p.pos[k] = p0.pos[k]
                    + (p0.vel[k] + p.vel[k]) * dt / 2.0
                    + (f0.acc0[k] - f1.acc0[k]) * dt2 / 12.0;
                snap[k] += crackle[k] * dt;
            }
            dt_next = dt_next.min(aarseth_step(eta, f1, &snap, &crackle));
        }

        self.forces = calc_forces(&self.interaction, &self.particles);
        self.time += dt;
        self.dt = dt_next.min(self.dt_max);
    }

    /// Integrate to `time_end`, shortening the last step to land on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] before [`initialize`](Self::initialize)
    /// and [`Error::TimeStepTooSmall`] when the criterion drops below
    /// `dt_min`.
    pub fn integrate_to_time(&mut self, time_end: f64) -> Result<()> {
        if self.particles.is_empty() {
            return Err(Error::InvalidInput(
                "hermite integrator is not initialized".to_string(),
            ));
        }
        while self.time < time_end {
            if self.dt < self.dt_min {
                tracing::warn!(dt = self.dt, time = self.time, "hermite step too small");
                return Err(Error::TimeStepTooSmall {
                    dt: self.dt,
                    dt_min: self.dt_min,
                    time: self.time,
                });
            }
            let dt = self.dt.min(time_end - self.time);
            self.integrate_one_step(dt);
            if time_end - self.time < self.dt_min {
                self.time = time_end;
            }
        }
        Ok(())
    }

    /// Total kinetic plus potential energy.
    #[must_use]
    pub fn get_energy(&self) -> f64 {
        let ekin: f64 = self.particles.iter().map(Particle::kinetic_energy).sum();
        let mut epot = 0.0;
        for (i, pi) in self.particles.iter().enumerate() {
            for pj in &self.particles[i + 1..] {
                epot += pi.mass * self.interaction.calc_pot_pair(pi, pj);
            }
        }
        ekin + epot
    }

    /// Current time.
    #[must_use]
    pub const fn get_time(&self) -> f64 {
        self.time
    }

    /// Step size proposed for the next step.
    #[must_use]
    pub const fn get_next_dt(&self) -> f64 {
        self.dt
    }

    /// Particles at the current time.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }
}

/// Aarseth step from acceleration, jerk, snap and crackle.
fn aarseth_step(eta: f64, f: &ForceH4, snap: &[f64; 3], crackle: &[f64; 3]) -> f64 {
    let a = vec3::norm2(&f.acc0).sqrt();
    let j = vec3::norm2(&f.acc1).sqrt();
    let s = vec3::norm2(snap).sqrt();
    let c = vec3::norm2(crackle).sqrt();
    let denominator = j * c + s * s;
    if denominator > 0.0 {
        (eta * (a * s + j * j) / denominator).sqrt()
    } else {
        f64::MAX
    }
}

fn force_on(interaction: &HermiteInteraction, i: usize, particles: &[Particle]) -> ForceH4 {
    let mut f = ForceH4::default();
    for (j, pj) in particles.iter().enumerate() {
        if i != j {
            interaction.calc_acc_jerk_pair(&mut f, &particles[i], pj);
        }
    }
    f
}

fn calc_forces(interaction: &HermiteInteraction, particles: &[Particle]) -> Vec<ForceH4> {
    let n = particles.len();
    if n >= PARALLEL_THRESHOLD {
        crate::executor::install(|| {
            (0..n)
                .into_par_iter()
                .map(|i| force_on(interaction, i, particles))
                .collect()
        })
    } else {
        (0..n).map(|i| force_on(interaction, i, particles)).collect()
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
    fn test_initialize_rejects_bad_input() {
        let mut hermite = HermiteIntegrator::new(HermiteInteraction::default());
        assert!(hermite.initialize(circular_binary(), 0.0).is_err());

        let mut hermite = HermiteIntegrator::new(HermiteInteraction::new(1.0, 0.0));
        let one = vec![Particle::new(0, 1.0, [0.0; 3], [0.0; 3])];
        assert!(hermite.initialize(one, 0.0).is_err());
        assert!(hermite.integrate_to_time(1.0).is_err());
    }

    #[test]
    fn test_circular_binary_energy() {
        let mut hermite = HermiteIntegrator::new(HermiteInteraction::new(1.0, 0.0));
        hermite.eta = 0.005;
        hermite.initialize(circular_binary(), 0.0).unwrap();
        let e0 = hermite.get_energy();
        assert!((e0 + 0.125).abs() < 1e-15);

        let period = 2.0 * std::f64::consts::PI;
        hermite.integrate_to_time(period).unwrap();
        assert!((hermite.get_time() - period).abs() < 1e-12);
        let rel = ((hermite.get_energy() - e0) / e0).abs();
        assert!(rel < 1e-6, "relative energy error {rel}");
        let p = &hermite.particles()[1];
        assert!((p.pos[0] - 0.5).abs() < 1e-2);
    }

    #[test]
    fn test_dt_max_caps_step() {
        let mut hermite = HermiteIntegrator::new(HermiteInteraction::new(1.0, 0.0));
        hermite.dt_max = 1e-3;
        hermite.initialize(circular_binary(), 0.0).unwrap();
        hermite.integrate_to_time(0.01).unwrap();
        assert!(hermite.get_next_dt() <= 1e-3);
    }

    #[test]
    fn test_parallel_forces_match_serial() {
        let interaction = HermiteInteraction::new(1.0, 1e-4);
        let n = PARALLEL_THRESHOLD + 3;
        let particles: Vec<Particle> = (0..n)
            .map(|i| {
                let x = i as f64;
                Particle::new(i as i64, 1.0, [x.cos() * x, x.sin() * x, 0.0], [0.0, 0.1, 0.0])
            })
            .collect();
        let parallel = calc_forces(&interaction, &particles);
        for i in [0, n / 2, n - 1] {
            assert_eq!(parallel[i], force_on(&interaction, i, &particles));
        }
    }
}
