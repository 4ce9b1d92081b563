//! Serialized form of the integration state

use serde::{Deserialize, Serialize};

use crate::particle::ParticleGroup;
use crate::symplectic::{Information, Profile};

/// Borrowed state for writing; field order must match [`IntegratorState`]
#[derive(Serialize)]
pub(super) struct IntegratorStateRef<'a, P> {
    pub particles: &'a ParticleGroup,
    pub perturber: &'a P,
    pub info: &'a Information,
    pub profile: &'a Profile,
    pub time: f64,
    pub etot_ref: f64,
    pub ekin: f64,
    pub epot: f64,
    pub epert: f64,
    pub de_change_interrupt: f64,
    pub dh_change_interrupt: f64,
}

/// Owned state for reading
#[derive(Deserialize)]
pub(super) struct IntegratorState<P> {
    pub particles: ParticleGroup,
    pub perturber: P,
    pub info: Information,
    pub profile: Profile,
    pub time: f64,
    pub etot_ref: f64,
    pub ekin: f64,
    pub epot: f64,
    pub epert: f64,
    pub de_change_interrupt: f64,
    pub dh_change_interrupt: f64,
}
