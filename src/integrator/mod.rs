//! Time-transformed symplectic integrator for one few-body group
//!
//! The group is integrated in its center-of-mass frame with the
//! logarithmic Hamiltonian time transformation. One step in fictitious
//! time `ds` is a composition of drifts and kicks:
//!
//! ```text
//! drift:  dt = c ds kappa / (ekin - etot_ref)     x += v c ds / (ekin - etot_ref)
//! kick:   dt = d ds kappa / gt_kick_inv            v += (a_in / kappa + a_pert) dt
//! ```
//!
//! where `kappa` is the slowdown factor of the root orbit. Both drift and
//! kick factors are constant over their sub-step, so the scheme is
//! explicit and regularizes close encounters without special cases.
//!
//! [`integrate_to_time`](TimeTransformedSymplecticIntegrator::integrate_to_time)
//! wraps single steps with energy error control, time synchronisation
//! and interrupt handling.

mod snapshot;

use std::io::{Read, Write};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::binary_tree::BinaryNode;
use crate::checkpoint;
use crate::interaction::{BinaryInterrupt, Force, Interaction};
use crate::particle::{Particle, ParticleGroup};
use crate::slowdown::SlowDown;
use crate::symplectic::{FixStepOption, Information, Profile, SymplecticManager};
use crate::{Error, Result};

use snapshot::{IntegratorState, IntegratorStateRef};

/// Scalars at the head of a backup buffer
const BACKUP_SCALARS: usize = 7;
/// Values per particle in a backup buffer: mass, position, velocity
const BACKUP_PER_PARTICLE: usize = 7;

const SHRINK_FACTOR_MIN: f64 = 0.1;
const SHRINK_FACTOR_MAX: f64 = 0.9;

/// Time-transformed symplectic integrator
pub struct TimeTransformedSymplecticIntegrator<I: Interaction> {
    /// Shared parameters and force law
    pub manager: Arc<SymplecticManager<I>>,
    /// Members and their center of mass
    pub particles: ParticleGroup,
    /// External perturbers
    pub perturber: I::Perturber,
    /// Binary tree, step size and fix-step policy
    pub info: Information,
    /// Step statistics
    pub profile: Profile,
    forces: Vec<Force>,
    time: f64,
    etot_ref: f64,
    ekin: f64,
    epot: f64,
    epert: f64,
    gt_kick_inv: f64,
    de_change_interrupt: f64,
    dh_change_interrupt: f64,
    backup: Vec<f64>,
}

impl<I: Interaction> Clone for TimeTransformedSymplecticIntegrator<I> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            particles: self.particles.clone(),
            perturber: self.perturber.clone(),
            info: self.info.clone(),
            profile: self.profile,
            forces: self.forces.clone(),
            time: self.time,
            etot_ref: self.etot_ref,
            ekin: self.ekin,
            epot: self.epot,
            epert: self.epert,
            gt_kick_inv: self.gt_kick_inv,
            de_change_interrupt: self.de_change_interrupt,
            dh_change_interrupt: self.dh_change_interrupt,
            backup: self.backup.clone(),
        }
    }
}

impl<I: Interaction> TimeTransformedSymplecticIntegrator<I> {
    /// Empty integrator using `manager`.
    #[must_use]
    pub fn new(manager: Arc<SymplecticManager<I>>) -> Self {
        Self {
            manager,
            particles: ParticleGroup::default(),
            perturber: I::Perturber::default(),
            info: Information::default(),
            profile: Profile::default(),
            forces: Vec::new(),
            time: 0.0,
            etot_ref: 0.0,
            ekin: 0.0,
            epot: 0.0,
            epert: 0.0,
            gt_kick_inv: 0.0,
            de_change_interrupt: 0.0,
            dh_change_interrupt: 0.0,
            backup: Vec::new(),
        }
    }

    /// Reset to the state after [`new`](Self::new), keeping the manager.
    pub fn clear(&mut self) {
        self.particles.clear();
        self.perturber = I::Perturber::default();
        self.info.clear();
        self.profile.clear();
        self.forces.clear();
        self.time = 0.0;
        self.etot_ref = 0.0;
        self.ekin = 0.0;
        self.epot = 0.0;
        self.epert = 0.0;
        self.gt_kick_inv = 0.0;
        self.de_change_interrupt = 0.0;
        self.dh_change_interrupt = 0.0;
        self.backup.clear();
    }

    /// Reserve working memory for `n` members.
    pub fn reserve_integrator_mem(&mut self, n: usize) {
        self.particles.reserve(n);
        self.forces.reserve(n);
        self.backup.reserve(Self::backup_data_size_for(n));
    }

    /// Check the manager, the group information and the member count.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn check_params(&self) -> Result<()> {
        self.manager.check_params()?;
        if self.particles.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "group needs at least 2 members, got {}",
                self.particles.len()
            )));
        }
        self.info.check_params()
    }

    /// Prepare the group for integration starting at `time`.
    ///
    /// Moves members into the center-of-mass frame, builds the binary
    /// tree, estimates `ds`, sets the slowdown reference and computes the
    /// initial forces and energies. `etot_ref` starts at `ekin + epot`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid parameters, fewer than two members or
    /// a group without two massive members.
    pub fn initial_integration(&mut self, time: f64) -> Result<()> {
        self.manager.check_params()?;
        let n = self.particles.len();
        if n < 2 {
            return Err(Error::InvalidInput(format!(
                "group needs at least 2 members, got {n}"
            )));
        }

        self.particles.calc_center_of_mass();
        self.particles.shift_to_center_of_mass_frame();

        let g = self.manager.interaction.gravitational_constant();
        self.info.generate_binary_tree(self.particles.members(), g)?;
        self.info.calc_ds_and_step_option(g, self.manager.ds_scale)?;
        self.info.initial_slowdown_reference(
            self.manager.slowdown_pert_ratio_ref,
            self.manager.slowdown_timescale_max,
        );

        self.time = time;
        self.forces.clear();
        self.forces.resize(n, Force::default());
        self.update_slowdown();
        self.calc_force(n == 2);
        self.ekin = self.calc_ekin();
        self.epert = 0.0;
        self.de_change_interrupt = 0.0;
        self.dh_change_interrupt = 0.0;
        self.etot_ref = self.ekin + self.epot;
        self.backup.resize(self.get_backup_data_size(), 0.0);

        tracing::debug!(
            n_member = n,
            ds = self.info.ds,
            etot = self.etot_ref,
            fix_step = ?self.info.fix_step_option,
            "initialized group"
        );
        self.info.check_params()
    }

    /// One symplectic step of size `ds` with the general force loop.
    ///
    /// `time_table[k]` receives the time after drift `k`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `time_table` is shorter than the
    /// number of drift/kick pairs.
    pub fn integrate_one_step(&mut self, ds: f64, time_table: &mut [f64]) -> Result<()> {
        self.check_time_table(time_table)?;
        self.step(ds, time_table, false);
        Ok(())
    }

    /// One symplectic step of size `ds` with the two-body force path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the group has exactly two
    /// members, or if `time_table` is too short.
    pub fn integrate_two_one_step(&mut self, ds: f64, time_table: &mut [f64]) -> Result<()> {
        if self.particles.len() != 2 {
            return Err(Error::InvalidInput(format!(
                "two-body step needs exactly 2 members, got {}",
                self.particles.len()
            )));
        }
        self.check_time_table(time_table)?;
        self.step(ds, time_table, true);
        Ok(())
    }

    fn check_time_table(&self, time_table: &[f64]) -> Result<()> {
        let n_pairs = self.manager.step.cd_pair_size();
        if time_table.len() < n_pairs {
            return Err(Error::InvalidInput(format!(
                "time table needs {n_pairs} entries, got {}",
                time_table.len()
            )));
        }
        Ok(())
    }

    /// Integrate to `time_end` with adaptive step size.
    ///
    /// Returns early with the interrupt when the interaction reports one
    /// after an accepted step; the group is then at `interrupt.time_now`.
    /// The center of mass moves with constant velocity over the elapsed
    /// time.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if `time_end` lies in the past or the
    ///   group has no binding energy
    /// - [`Error::TimeStepTooSmall`] if a rejected step falls below
    ///   `time_step_min`
    /// - [`Error::StepCountExceeded`] after `step_count_max` steps
    pub fn integrate_to_time(&mut self, time_end: f64) -> Result<BinaryInterrupt> {
        let manager = Arc::clone(&self.manager);
        let time_error_max = manager.time_error_max;
        let mut interrupt = BinaryInterrupt::new(self.time, time_end);

        if (self.time - time_end).abs() <= time_error_max {
            return Ok(interrupt);
        }
        if time_end < self.time {
            return Err(Error::InvalidInput(format!(
                "cannot integrate backwards from {} to {time_end}",
                self.time
            )));
        }
        if self.gt_kick_inv <= 0.0 {
            return Err(Error::InvalidInput(
                "group has no binding potential energy".to_string(),
            ));
        }

        let two_body = self.particles.len() == 2;
        let n_pairs = manager.step.cd_pair_size();
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let order_plus_one = manager.step.order() as i32 + 1;
        let tol = manager.energy_error_relative_max;
        let grow_threshold = tol / 2.0_f64.powi(order_plus_one);

        let time_call_start = self.time;
        let mut time_table = vec![0.0; n_pairs];
        let mut backup = std::mem::take(&mut self.backup);
        backup.resize(self.get_backup_data_size(), 0.0);

        let mut ds = self.info.ds;
        let mut ds_sync: Option<f64> = None;
        let mut step_count: u64 = 0;

        let result = loop {
            if step_count >= manager.step_count_max {
                tracing::warn!(
                    limit = manager.step_count_max,
                    time = self.time,
                    time_end,
                    "step count limit reached"
                );
                break Err(Error::StepCountExceeded {
                    limit: manager.step_count_max,
                    time: self.time,
                    time_end,
                });
            }
            step_count += 1;

            self.store_backup(&mut backup);
            let time_start = self.time;
            let error_start = self.get_energy_error();
            let energy_scale = self.energy_scale();
            let ds_step = ds_sync.unwrap_or(ds);

            self.step(ds_step, &mut time_table, two_body);

            let error_change = ((self.get_energy_error() - error_start) / energy_scale).abs();
            let error_ok = error_change.is_finite() && self.time.is_finite();

            if !error_ok || error_change > tol {
                let dt = self.time - time_start;
                self.load_backup(&backup);
                self.profile.break_error_count += 1;
                if dt.is_nan() || dt.abs() < manager.time_step_min {
                    tracing::warn!(
                        dt,
                        dt_min = manager.time_step_min,
                        time = self.time,
                        "time step too small"
                    );
                    break Err(Error::TimeStepTooSmall {
                        dt,
                        dt_min: manager.time_step_min,
                        time: self.time,
                    });
                }
                let factor = if error_ok {
                    (tol / error_change)
                        .powf(1.0 / f64::from(order_plus_one))
                        .clamp(SHRINK_FACTOR_MIN, SHRINK_FACTOR_MAX)
                } else {
                    SHRINK_FACTOR_MIN
                };
                match ds_sync.as_mut() {
                    Some(ds_tsyn) => *ds_tsyn *= factor,
                    None => {
                        ds *= factor;
                        self.profile.ds_modify_count += 1;
                    }
                }
                tracing::debug!(
                    error_change,
                    factor,
                    time = self.time,
                    "energy error too large, step rejected"
                );
                continue;
            }

            if self.time > time_end + time_error_max {
                self.load_backup(&backup);
                let factor = sync_factor(&manager.step, &time_table, time_start, time_end);
                ds_sync = Some(ds_step * factor);
                tracing::debug!(factor, time = self.time, time_end, "overshoot, synchronising step");
                continue;
            }

            self.profile.step_count += 1;
            if ds_sync.is_some() {
                self.profile.step_count_tsyn += 1;
            } else {
                match self.info.fix_step_option {
                    FixStepOption::Later => {
                        self.info.ds = ds;
                        self.info.fix_step_option = FixStepOption::Always;
                    }
                    FixStepOption::None if error_change < grow_threshold => {
                        ds *= 2.0;
                        self.profile.ds_modify_count += 1;
                    }
                    _ => {}
                }
            }

            self.update_slowdown();
            interrupt.time_now = self.time;
            manager.interaction.modify_and_interrupt(
                &mut interrupt,
                &self.info.binary_tree,
                self.particles.members_mut(),
            );
            if interrupt.is_interrupted() {
                let handled = self.handle_interrupt(&interrupt);
                // the rebuilt tree carries its own step estimate
                ds = self.info.ds;
                break handled.map(|()| interrupt);
            }

            if (self.time - time_end).abs() <= time_error_max {
                break Ok(interrupt);
            }
        };

        self.backup = backup;
        self.particles
            .drift_center_of_mass(self.time - time_call_start);
        if self.info.fix_step_option == FixStepOption::None {
            self.info.ds = ds;
        }
        if result.is_ok() {
            self.correct_center_of_mass_drift();
        }
        result
    }

    /// Rebuild the group after the interaction modified members.
    fn handle_interrupt(&mut self, interrupt: &BinaryInterrupt) -> Result<()> {
        let etot_before = self.ekin + self.epot;
        let h_before = self.get_h();

        self.particles.calc_center_of_mass();
        let g = self.manager.interaction.gravitational_constant();
        self.info.generate_binary_tree(self.particles.members(), g)?;
        let n_massive = self.particles.members().iter().filter(|p| p.mass > 0.0).count();
        if n_massive >= 2 {
            self.info.calc_ds_and_step_option(g, self.manager.ds_scale)?;
        }
        self.info.initial_slowdown_reference(
            self.manager.slowdown_pert_ratio_ref,
            self.manager.slowdown_timescale_max,
        );
        self.update_slowdown();
        self.calc_force(self.particles.len() == 2);
        self.ekin = self.calc_ekin();

        let de = self.ekin + self.epot - etot_before;
        self.etot_ref += de;
        self.de_change_interrupt += de;
        let h_after = self.get_h();
        if h_before.is_finite() && h_after.is_finite() {
            self.dh_change_interrupt += h_after - h_before;
        }
        self.profile.interrupt_count += 1;

        tracing::info!(
            status = ?interrupt.status,
            node = ?interrupt.node,
            time = self.time,
            de,
            n_massive,
            "binary interrupt"
        );
        Ok(())
    }

    /// One composed step; `time_table` receives the time after each drift.
    fn step(&mut self, ds: f64, time_table: &mut [f64], two_body: bool) {
        let manager = Arc::clone(&self.manager);
        let kappa = self.slowdown_factor();
        for (k, (ck, dk)) in manager.step.pairs().enumerate() {
            self.drift(ck * ds, kappa);
            time_table[k] = self.time;
            self.calc_force(two_body);
            if dk != 0.0 {
                self.kick(dk * ds, kappa);
            }
        }
    }

    fn drift(&mut self, ds_drift: f64, kappa: f64) {
        let gt_drift_inv = self
            .manager
            .interaction
            .calc_gt_drift_inv(self.ekin - self.etot_ref);
        let dt = ds_drift / gt_drift_inv;
        self.time += dt * kappa;
        for p in self.particles.members_mut() {
            for k in 0..3 {
                p.pos[k] += p.vel[k] * dt;
            }
        }
    }

    fn kick(&mut self, ds_kick: f64, kappa: f64) {
        let dt = ds_kick * kappa / self.gt_kick_inv;
        let mut work = 0.0;
        for (p, f) in self.particles.members_mut().iter_mut().zip(&self.forces) {
            for k in 0..3 {
                let vel_old = p.vel[k];
                p.vel[k] += (f.acc_in[k] / kappa + f.acc_pert[k]) * dt;
                work += p.mass * 0.5 * (vel_old + p.vel[k]) * f.acc_pert[k] * dt;
            }
        }
        self.etot_ref += work;
        self.epert += work;
        self.ekin = self.calc_ekin();
    }

    fn calc_force(&mut self, two_body: bool) {
        let interaction = &self.manager.interaction;
        let (epot, gt_kick_inv) = if two_body {
            interaction.calc_acc_pot_and_gt_kick_inv_two(
                &mut self.forces,
                self.particles.members(),
                self.particles.cm(),
                &self.perturber,
                self.time,
            )
        } else {
            interaction.calc_acc_pot_and_gt_kick_inv(
                &mut self.forces,
                self.particles.members(),
                self.particles.cm(),
                &self.perturber,
                self.time,
            )
        };
        self.epot = epot;
        self.gt_kick_inv = gt_kick_inv;
    }

    fn calc_ekin(&self) -> f64 {
        self.particles.members().iter().map(Particle::kinetic_energy).sum()
    }

    fn energy_scale(&self) -> f64 {
        if self.etot_ref != 0.0 {
            self.etot_ref.abs()
        } else {
            self.epot.abs().max(f64::MIN_POSITIVE)
        }
    }

    /// Refresh the orbits of the tree and the slowdown factor of the root.
    fn update_slowdown(&mut self) {
        let g = self.manager.interaction.gravitational_constant();
        self.info
            .binary_tree
            .update_orbits(self.particles.members(), g);
        let Some(root) = self.info.binary_tree.root().cloned() else {
            return;
        };
        if let Some(root_mut) = self.info.binary_tree.root_mut() {
            self.manager.interaction.calc_slowdown_pert(
                &mut root_mut.slowdown,
                self.particles.cm(),
                &root,
                &self.perturber,
            );
        }
    }

    /// Slowdown factor of the root orbit, 1 without a tree.
    #[must_use]
    pub fn slowdown_factor(&self) -> f64 {
        self.info
            .binary_tree
            .root()
            .map_or(1.0, |root| root.slowdown.slowdown_factor())
    }

    /// Length of a backup buffer for the current members.
    #[must_use]
    pub fn get_backup_data_size(&self) -> usize {
        Self::backup_data_size_for(self.particles.len())
    }

    const fn backup_data_size_for(n: usize) -> usize {
        BACKUP_SCALARS + BACKUP_PER_PARTICLE * n
    }

    /// Store time, energies and member states in `backup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `backup` is shorter than
    /// [`get_backup_data_size`](Self::get_backup_data_size).
    pub fn backup_int_data(&self, backup: &mut [f64]) -> Result<()> {
        self.check_backup_len(backup.len())?;
        self.store_backup(backup);
        Ok(())
    }

    /// Restore the state written by [`backup_int_data`](Self::backup_int_data).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `backup` is shorter than
    /// [`get_backup_data_size`](Self::get_backup_data_size).
    pub fn restore_int_data(&mut self, backup: &[f64]) -> Result<()> {
        self.check_backup_len(backup.len())?;
        self.load_backup(backup);
        Ok(())
    }

    fn check_backup_len(&self, len: usize) -> Result<()> {
        let needed = self.get_backup_data_size();
        if len < needed {
            return Err(Error::InvalidInput(format!(
                "backup buffer needs {needed} values, got {len}"
            )));
        }
        Ok(())
    }

    fn store_backup(&self, backup: &mut [f64]) {
        backup[..BACKUP_SCALARS].copy_from_slice(&[
            self.time,
            self.etot_ref,
            self.ekin,
            self.epot,
            self.epert,
            self.de_change_interrupt,
            self.dh_change_interrupt,
        ]);
        for (chunk, p) in backup[BACKUP_SCALARS..]
            .chunks_exact_mut(BACKUP_PER_PARTICLE)
            .zip(self.particles.members())
        {
            chunk[0] = p.mass;
            chunk[1..4].copy_from_slice(&p.pos);
            chunk[4..7].copy_from_slice(&p.vel);
        }
    }

    fn load_backup(&mut self, backup: &[f64]) {
        self.time = backup[0];
        self.etot_ref = backup[1];
        self.ekin = backup[2];
        self.epot = backup[3];
        self.epert = backup[4];
        self.de_change_interrupt = backup[5];
        self.dh_change_interrupt = backup[6];
        for (chunk, p) in backup[BACKUP_SCALARS..]
            .chunks_exact(BACKUP_PER_PARTICLE)
            .zip(self.particles.members_mut())
        {
            p.mass = chunk[0];
            p.pos.copy_from_slice(&chunk[1..4]);
            p.vel.copy_from_slice(&chunk[4..7]);
        }
    }

    /// Physical time.
    #[must_use]
    pub const fn get_time(&self) -> f64 {
        self.time
    }

    /// Kinetic energy of the members in the c.m. frame.
    #[must_use]
    pub const fn get_ekin(&self) -> f64 {
        self.ekin
    }

    /// Potential energy between members.
    #[must_use]
    pub const fn get_epot(&self) -> f64 {
        self.epot
    }

    /// Accumulated work done by perturbers.
    #[must_use]
    pub const fn get_epert(&self) -> f64 {
        self.epert
    }

    /// `ekin + epot`.
    #[must_use]
    pub fn get_etot(&self) -> f64 {
        self.ekin + self.epot
    }

    /// Reference total energy, including perturber work and interrupt jumps.
    #[must_use]
    pub const fn get_etot_ref(&self) -> f64 {
        self.etot_ref
    }

    /// `get_etot() - get_etot_ref()`.
    #[must_use]
    pub fn get_energy_error(&self) -> f64 {
        self.get_etot() - self.etot_ref
    }

    /// Time-transformed Hamiltonian, zero on the exact solution.
    #[must_use]
    pub fn get_h(&self) -> f64 {
        self.manager
            .interaction
            .calc_h(self.ekin - self.etot_ref, self.epot)
    }

    /// Energy change accumulated by interrupts.
    #[must_use]
    pub const fn get_de_change_binary_interrupt(&self) -> f64 {
        self.de_change_interrupt
    }

    /// Hamiltonian change accumulated by interrupts.
    #[must_use]
    pub const fn get_dh_change_binary_interrupt(&self) -> f64 {
        self.dh_change_interrupt
    }

    /// Reset the interrupt energy and Hamiltonian changes.
    pub fn reset_de_change_binary_interrupt(&mut self) {
        self.de_change_interrupt = 0.0;
        self.dh_change_interrupt = 0.0;
    }

    /// `ekin + epot` stored in `backup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `backup` lacks the scalar head.
    pub fn get_etot_from_backup(backup: &[f64]) -> Result<f64> {
        let head = backup_head(backup)?;
        Ok(head[2] + head[3])
    }

    /// Reference energy stored in `backup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `backup` lacks the scalar head.
    pub fn get_etot_ref_from_backup(backup: &[f64]) -> Result<f64> {
        Ok(backup_head(backup)?[1])
    }

    /// Energy error stored in `backup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `backup` lacks the scalar head.
    pub fn get_energy_error_from_backup(backup: &[f64]) -> Result<f64> {
        Ok(Self::get_etot_from_backup(backup)? - Self::get_etot_ref_from_backup(backup)?)
    }

    /// Hamiltonian of the state stored in `backup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `backup` lacks the scalar head.
    pub fn get_h_from_backup(&self, backup: &[f64]) -> Result<f64> {
        let head = backup_head(backup)?;
        Ok(self.manager.interaction.calc_h(head[2] - head[1], head[3]))
    }

    /// Remove the residual c.m. position and velocity of the members.
    ///
    /// Forces and kinetic energy are refreshed for the shifted state.
    pub fn correct_center_of_mass_drift(&mut self) {
        let mut mass = 0.0;
        let mut pos = [0.0; 3];
        let mut vel = [0.0; 3];
        for p in self.particles.members() {
            mass += p.mass;
            for k in 0..3 {
                pos[k] += p.mass * p.pos[k];
                vel[k] += p.mass * p.vel[k];
            }
        }
        if mass <= 0.0 {
            return;
        }
        for p in self.particles.members_mut() {
            for k in 0..3 {
                p.pos[k] -= pos[k] / mass;
                p.vel[k] -= vel[k] / mass;
            }
        }
        let n = self.particles.len();
        if n >= 2 && self.forces.len() == n {
            self.calc_force(n == 2);
            self.ekin = self.calc_ekin();
        }
    }

    /// Write members in the origin frame into `out`, matched by index.
    pub fn write_back_particles_origin_frame(&self, out: &mut [Particle]) {
        self.particles.write_back_origin_frame(out);
    }

    /// Print column titles for `n_particle` members.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column_title<W: Write>(w: &mut W, width: usize, n_particle: usize) -> Result<()> {
        for title in ["Time", "dE", "Etot", "Ekin", "Epot", "Epert", "H", "dE_intr", "dH_intr"] {
            write!(w, "{title:>width$}")?;
        }
        Information::print_column_title(w, width)?;
        SlowDown::print_column_title(w, width)?;
        for i in 0..n_particle {
            for name in ["mass", "x", "y", "z", "vx", "vy", "vz"] {
                let title = format!("{name}.{}", i + 1);
                write!(w, "{title:>width$}")?;
            }
        }
        Ok(())
    }

    /// Print one row; members are written in the origin frame.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column<W: Write>(&self, w: &mut W, width: usize) -> Result<()> {
        let precision = width.saturating_sub(8).max(1);
        for value in [
            self.time,
            self.get_energy_error(),
            self.etot_ref,
            self.ekin,
            self.epot,
            self.epert,
            self.get_h(),
            self.de_change_interrupt,
            self.dh_change_interrupt,
        ] {
            write!(w, "{value:>width$.precision$e}")?;
        }
        self.info.print_column(w, width)?;
        match self.info.binary_tree.root() {
            Some(root) => root.slowdown.print_column(w, width)?,
            None => SlowDown::default().print_column(w, width)?,
        }

        let cm = self.particles.cm();
        let frame = self.particles.is_center_of_mass_frame();
        for p in self.particles.members() {
            write!(w, "{:>width$.precision$e}", p.mass)?;
            for k in 0..3 {
                let x = if frame { p.pos[k] + cm.pos[k] } else { p.pos[k] };
                write!(w, "{x:>width$.precision$e}")?;
            }
            for k in 0..3 {
                let v = if frame { p.vel[k] + cm.vel[k] } else { p.vel[k] };
                write!(w, "{v:>width$.precision$e}")?;
            }
        }
        Ok(())
    }

    /// Print the orbit table of the binary tree, inner orbits first.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_group_info<W: Write>(&self, w: &mut W, width: usize) -> Result<()> {
        write!(w, "{:>width$}", "n")?;
        BinaryNode::print_column_title(w, width)?;
        writeln!(w)?;
        self.info
            .binary_tree
            .process_root_iter(Ok(()), |acc: Result<()>, node| {
                acc?;
                write!(w, "{:>width$}", node.member_n())?;
                node.print_column(w, width)?;
                writeln!(w)?;
                Ok(())
            })
    }
}

impl<I> TimeTransformedSymplecticIntegrator<I>
where
    I: Interaction,
    I::Perturber: Serialize + DeserializeOwned,
{
    /// Write the integration state as a checkpoint record.
    ///
    /// The manager is not included; write it with
    /// [`SymplecticManager::write_binary`].
    ///
    /// # Errors
    ///
    /// Returns an encode or IO error.
    pub fn write_binary<W: Write>(&self, w: &mut W) -> Result<()> {
        let state = IntegratorStateRef {
            particles: &self.particles,
            perturber: &self.perturber,
            info: &self.info,
            profile: &self.profile,
            time: self.time,
            etot_ref: self.etot_ref,
            ekin: self.ekin,
            epot: self.epot,
            epert: self.epert,
            de_change_interrupt: self.de_change_interrupt,
            dh_change_interrupt: self.dh_change_interrupt,
        };
        checkpoint::write_record(w, checkpoint::INTEGRATOR_MAGIC, &state)
    }

    /// Replace the integration state with one written by
    /// [`write_binary`](Self::write_binary). Forces are recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Checkpoint`] for a foreign header, or a decode/IO
    /// error.
    pub fn read_binary<R: Read>(&mut self, r: &mut R) -> Result<()> {
        let state: IntegratorState<I::Perturber> =
            checkpoint::read_record(r, checkpoint::INTEGRATOR_MAGIC)?;
        self.particles = state.particles;
        self.perturber = state.perturber;
        self.info = state.info;
        self.profile = state.profile;
        self.time = state.time;
        self.etot_ref = state.etot_ref;
        self.ekin = state.ekin;
        self.de_change_interrupt = state.de_change_interrupt;
        self.dh_change_interrupt = state.dh_change_interrupt;
        self.epert = state.epert;

        let n = self.particles.len();
        self.forces.clear();
        self.forces.resize(n, Force::default());
        self.backup.resize(self.get_backup_data_size(), 0.0);
        if n >= 2 {
            self.calc_force(n == 2);
        } else {
            self.epot = state.epot;
        }
        Ok(())
    }
}

fn backup_head(backup: &[f64]) -> Result<&[f64]> {
    backup.get(..BACKUP_SCALARS).ok_or_else(|| {
        Error::InvalidInput(format!(
            "backup buffer needs at least {BACKUP_SCALARS} values, got {}",
            backup.len()
        ))
    })
}

/// Fraction of `ds` that lands on `time_end`, from the drift times of an
/// overshooting step.
fn sync_factor(
    step: &crate::symplectic::SymplecticStep,
    time_table: &[f64],
    time_start: f64,
    time_end: f64,
) -> f64 {
    let Some(k) = time_table.iter().position(|&t| t > time_end) else {
        return 0.5;
    };
    let t_prev = if k == 0 { time_start } else { time_table[k - 1] };
    let span = time_table[k] - t_prev;
    let frac = if span > 0.0 { (time_end - t_prev) / span } else { 0.5 };
    let sum_prev = if k == 0 { 0.0 } else { step.sum_c(k - 1) };
    let factor = sum_prev + step.ck(k) * frac;
    if factor > 0.0 && factor <= 1.0 {
        factor
    } else {
        0.5
    }
}
