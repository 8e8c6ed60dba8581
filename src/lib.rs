//! A Sequential Monte Carlo (particle filter) engine for nonlinear,
//! non-Gaussian state-space systems: predict/weight/resample state
//! estimation, three resampling schemes, and three parameter-estimation
//! strategies (auxiliary particle filter, measurement comparison, SPSA)
//! layered on top of a generic system contract ([`system::GenericSystem`]).
//!
//! This crate is a library with no bundled logger; callers wire up
//! whichever `log` backend fits their driver (a GUI, a CLI, a test
//! harness). Every fallible operation returns [`error::Result`] — nothing
//! is recovered silently.

pub mod config;
pub mod distributions;
pub mod error;
pub mod filter;
pub mod matrix;
pub mod rng;
pub mod system;

pub use error::{Result, SmcError};
pub use filter::{ParticleFilter, ResamplingScheme};
pub use matrix::Matrix;
pub use rng::RngMultiplexer;
