//! Fourth-order Hermite integrator for the outer system
//!
//! All particles share one time step chosen by the Aarseth criterion.
//! Tight groups inside the system are meant to be integrated separately
//! with [`TimeTransformedSymplecticIntegrator`](crate::integrator::TimeTransformedSymplecticIntegrator);
//! this module advances everything that does not need regularization.

mod integrator;
mod interaction;

pub use integrator::{HermiteIntegrator, DEFAULT_DT_MIN, DEFAULT_ETA};
pub use interaction::{ForceH4, HermiteInteraction};
