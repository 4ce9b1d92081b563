//! # ar-symplectic: Algorithmic Regularization for Few-Body Gravity
//!
//! Time-transformed symplectic integration of tight few-body groups
//! (binaries, triples, small clusters) with the logarithmic Hamiltonian
//! time transformation, Suzuki-Yoshida high-order composition, adaptive
//! step control by energy error and time synchronisation to an exact end
//! time.
//!
//! ## Building blocks
//!
//! - [`particle`]: particles and center-of-mass groups
//! - [`binary_tree`]: hierarchical Kepler decomposition of a group
//! - [`slowdown`]: slowdown factor of weakly perturbed orbits
//! - [`interaction`]: force law trait and the Newtonian implementation
//! - [`symplectic`]: step coefficients, shared manager, group information
//! - [`integrator`]: the time-transformed symplectic integrator
//! - [`hermite`]: fourth-order Hermite integrator for the outer system
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ar_symplectic::integrator::TimeTransformedSymplecticIntegrator;
//! use ar_symplectic::interaction::NewtonianInteraction;
//! use ar_symplectic::particle::Particle;
//! use ar_symplectic::symplectic::SymplecticManager;
//!
//! let manager = Arc::new(SymplecticManager::new(NewtonianInteraction::new(1.0), 4)?);
//! let mut integrator = TimeTransformedSymplecticIntegrator::new(manager);
//! integrator.particles.add_member(Particle::new(0, 0.5, [-0.5, 0.0, 0.0], [0.0, -0.5, 0.0]));
//! integrator.particles.add_member(Particle::new(1, 0.5, [0.5, 0.0, 0.0], [0.0, 0.5, 0.0]));
//! integrator.initial_integration(0.0)?;
//!
//! let interrupt = integrator.integrate_to_time(1.0)?;
//! assert!(!interrupt.is_interrupted());
//! assert!((integrator.get_time() - 1.0).abs() < 1e-9);
//! # Ok::<(), ar_symplectic::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod binary_tree;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod executor;
pub mod hermite;
pub mod integrator;
pub mod interaction;
pub mod logging;
pub mod particle;
pub mod slowdown;
pub mod symplectic;
mod vec3;

pub use error::{Error, Result};
