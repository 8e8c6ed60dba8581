//! Standard samplers built on top of the RNG multiplexer: normal, uniform,
//! and binomial draws, plus the Rademacher draw SPSA needs.
//!
//! These are thin wrappers around `rand_distr`, kept slot-explicit so
//! every draw is attributable to a single stream.

use rand_distr::{Binomial, Distribution, Normal, Uniform};

use crate::error::{Result, SmcError};
use crate::rng::RngMultiplexer;

/// Draws one `N(mean, std_dev)` sample from `slot`.
pub fn normal(mux: &mut RngMultiplexer, slot: usize, mean: f64, std_dev: f64) -> Result<f64> {
    let dist = Normal::new(mean, std_dev)
        .map_err(|e| SmcError::ParameterOutOfDomain(format!("invalid normal params: {e}")))?;
    mux.sample(slot, &dist)
}

/// Draws `n` i.i.d. `N(mean, std_dev)` samples from `slot`.
pub fn normal_vec(
    mux: &mut RngMultiplexer,
    slot: usize,
    mean: f64,
    std_dev: f64,
    n: usize,
) -> Result<Vec<f64>> {
    let dist = Normal::new(mean, std_dev)
        .map_err(|e| SmcError::ParameterOutOfDomain(format!("invalid normal params: {e}")))?;
    mux.sample_vec(slot, &dist, n)
}

/// Draws one `Uniform(low, high)` sample from `slot`.
pub fn uniform(mux: &mut RngMultiplexer, slot: usize, low: f64, high: f64) -> Result<f64> {
    if !(low < high) {
        return Err(SmcError::ParameterOutOfDomain(format!(
            "uniform requires low < high, got low={low}, high={high}"
        )));
    }
    let dist = Uniform::new(low, high);
    mux.sample(slot, &dist)
}

/// Draws one `Binomial(trials, p)` outcome from `slot`, returned as `f64`
/// for uniformity with the rest of the engine's numeric surface.
pub fn binomial(mux: &mut RngMultiplexer, slot: usize, trials: u64, p: f64) -> Result<f64> {
    let dist = Binomial::new(trials, p)
        .map_err(|e| SmcError::ParameterOutOfDomain(format!("invalid binomial params: {e}")))?;
    mux.sample(slot, &dist)
}

/// Draws one Rademacher variate (+1 or -1 with probability 1/2 each) from
/// `slot`, used by SPSA's perturbation vector (spec §4.3).
pub fn rademacher(mux: &mut RngMultiplexer, slot: usize) -> Result<f64> {
    Ok(if mux.uniform(slot)? < 0.5 { -1.0 } else { 1.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_is_reproducible_per_slot() {
        let mut a = RngMultiplexer::new(1, 2, 4);
        let mut b = RngMultiplexer::new(1, 2, 4);
        let draws_a: Vec<f64> = (0..20).map(|_| normal(&mut a, 0, 0.0, 1.0).unwrap()).collect();
        let draws_b: Vec<f64> = (0..20).map(|_| normal(&mut b, 0, 0.0, 1.0).unwrap()).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn rademacher_is_always_plus_or_minus_one() {
        let mut mux = RngMultiplexer::new(9, 9, 2);
        for _ in 0..200 {
            let v = rademacher(&mut mux, 0).unwrap();
            assert!(v == 1.0 || v == -1.0);
        }
    }

    #[test]
    fn invalid_uniform_bounds_rejected() {
        let mut mux = RngMultiplexer::new(1, 1, 2);
        assert!(uniform(&mut mux, 0, 1.0, 0.0).is_err());
    }
}
