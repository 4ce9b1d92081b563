//! Building blocks of the time-transformed symplectic method
//!
//! - [`SymplecticStep`]: drift/kick coefficients of the composed step
//! - [`SymplecticManager`]: tolerances and interaction shared by integrators
//! - [`Information`]: Kepler hierarchy, step size and fix-step policy
//! - [`Profile`]: step statistics

mod information;
mod manager;
mod profile;
mod step;

pub use information::{FixStepOption, Information};
pub use manager::{
    SymplecticManager, DEFAULT_ENERGY_ERROR_RELATIVE_MAX, DEFAULT_STEP_COUNT_MAX,
    DEFAULT_TIME_ERROR_MAX, DEFAULT_TIME_STEP_MIN,
};
pub use profile::Profile;
pub use step::SymplecticStep;
