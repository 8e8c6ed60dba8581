//! Crate-wide error type.
//!
//! Every fallible operation in the engine returns [`Result`]; nothing is
//! recovered silently.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmcError {
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("index out of range: {index} not in [1, {bound}]")]
    IndexOutOfRange { index: usize, bound: usize },

    #[error("type mismatch: matrix holds {actual}, accessor expected {expected}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("degenerate importance weights at time index {time_index}")]
    DegenerateWeights { time_index: usize },

    #[error("RNG slot {0} is already occupied")]
    SlotBusy(usize),

    #[error("RNG slot {0} is out of range")]
    SlotUnavailable(usize),

    #[error("particle filter used before initializeParticleFilter")]
    NotInitialized,

    #[error("parameter out of domain: {0}")]
    ParameterOutOfDomain(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SmcError>;
