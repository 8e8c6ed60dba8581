//! The three resampling schemes (spec §4.2): residual, systematic,
//! multinomial. Every scheme returns a `Vec<usize>` of `N` zero-based
//! survivor indices into the particle set being resampled.
//!
//! Randomness is stream-disciplined per spec §5: the schemes' own
//! stratified/uniform draws come from the resampler slot
//! (`RNGIDForResampler`); the auxiliary multinomial draw residual
//! resampling uses to place its leftover `R` particles comes from the
//! Bernoulli slot (`RNGIDForBernoulli`), matching the specification's
//! "auxiliary binomial draws ... used in residual ... tails" wording.

use crate::error::{Result, SmcError};
use crate::rng::RngMultiplexer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplingScheme {
    Residual,
    Systematic,
    Multinomial,
}

/// Dispatches to the configured scheme.
pub fn resample(
    scheme: ResamplingScheme,
    weights: &[f64],
    mux: &mut RngMultiplexer,
    slot_resampler: usize,
    slot_bernoulli: usize,
) -> Result<Vec<usize>> {
    match scheme {
        ResamplingScheme::Residual => residual(weights, mux, slot_resampler, slot_bernoulli),
        ResamplingScheme::Systematic => systematic(weights, mux, slot_resampler),
        ResamplingScheme::Multinomial => multinomial(weights, mux, slot_resampler),
    }
}

/// Finds the smallest index `j` such that `cumulative[j] >= u`, assuming
/// `cumulative` is non-decreasing and its last element is (numerically)
/// `>= u`.
fn search_cdf(cumulative: &[f64], u: f64) -> usize {
    let (mut lo, mut hi) = (0usize, cumulative.len() - 1);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if cumulative[mid] >= u {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

fn cumulative_sum(weights: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    weights
        .iter()
        .map(|w| {
            acc += w;
            acc
        })
        .collect()
}

fn draws_to_indices(weights: &[f64], draws: &[f64]) -> Vec<usize> {
    let cumulative = cumulative_sum(weights);
    draws.iter().map(|&u| search_cdf(&cumulative, u)).collect()
}

/// Multinomial resampling: `N` i.i.d. uniforms, each mapped to the
/// smallest CDF bin containing it.
pub fn multinomial(
    weights: &[f64],
    mux: &mut RngMultiplexer,
    slot_resampler: usize,
) -> Result<Vec<usize>> {
    let n = weights.len();
    let draws = mux.uniform_vec(slot_resampler, n)?;
    log::trace!("multinomial resample: {n} draws from slot {slot_resampler}");
    Ok(draws_to_indices(weights, &draws))
}

/// Systematic resampling: one uniform draw `u` in `[0, 1/N)`, stratified
/// as `u + k/N` for `k = 0..N`.
pub fn systematic(
    weights: &[f64],
    mux: &mut RngMultiplexer,
    slot_resampler: usize,
) -> Result<Vec<usize>> {
    let n = weights.len();
    let u = mux.uniform(slot_resampler)? / n as f64;
    let draws: Vec<f64> = (0..n).map(|k| u + k as f64 / n as f64).collect();
    log::trace!("systematic resample: single draw u0={u} from slot {slot_resampler}");
    Ok(draws_to_indices(weights, &draws))
}

/// Residual resampling: `floor(N * w_j)` deterministic copies of each `j`,
/// then the `R` leftover slots filled by a multinomial draw over the
/// residual weights `(N * w_j - floor(N * w_j)) / R`.
pub fn residual(
    weights: &[f64],
    mux: &mut RngMultiplexer,
    slot_resampler: usize,
    slot_bernoulli: usize,
) -> Result<Vec<usize>> {
    let n = weights.len();
    let _ = slot_resampler; // the deterministic half draws nothing; kept for signature symmetry
    let scaled: Vec<f64> = weights.iter().map(|w| w * n as f64).collect();
    let counts: Vec<usize> = scaled.iter().map(|s| s.floor() as usize).collect();
    let deterministic_total: usize = counts.iter().sum();

    let mut indices = Vec::with_capacity(n);
    for (j, &count) in counts.iter().enumerate() {
        indices.extend(std::iter::repeat(j).take(count));
    }

    let r = n - deterministic_total;
    log::trace!("residual resample: {deterministic_total} deterministic copies, {r} remainder slots");
    if r == 0 {
        return Ok(indices);
    }

    let residual_weights: Vec<f64> = scaled
        .iter()
        .zip(counts.iter())
        .map(|(s, c)| (s - *c as f64) / r as f64)
        .collect();
    let draws = mux.uniform_vec(slot_bernoulli, r)?;
    indices.extend(draws_to_indices(&residual_weights, &draws));
    Ok(indices)
}

pub fn check_normalized(weights: &[f64], time_index: usize) -> Result<()> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(SmcError::DegenerateWeights { time_index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_scenario_from_spec() {
        let weights = [0.4, 0.35, 0.2, 0.05];
        let mut mux = RngMultiplexer::new(1, 1, 4);
        let indices = residual(&weights, &mut mux, 0, 1).unwrap();
        assert_eq!(indices.len(), 20);
        let mut counts = [0usize; 4];
        for &i in &indices {
            counts[i] += 1;
        }
        assert_eq!(counts, [8, 7, 4, 1]);
    }

    #[test]
    fn systematic_scenario_from_spec() {
        // weights uniform 1/N; a single draw of 0.03/N should map every
        // particle k to itself.
        let n = 10;
        let weights = vec![1.0 / n as f64; n];
        // Force the uniform draw to exactly 0.03 by using a slot whose
        // first draw we pin via a dedicated deterministic check instead:
        // verify the *formula* directly rather than depending on the RNG
        // landing on 0.03.
        let cumulative = cumulative_sum(&weights);
        let u = 0.03 / n as f64;
        let draws: Vec<f64> = (0..n).map(|k| u + k as f64 / n as f64).collect();
        let indices: Vec<usize> = draws.iter().map(|&d| search_cdf(&cumulative, d)).collect();
        assert_eq!(indices, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn every_resampled_index_is_in_range() {
        let weights = [0.1, 0.2, 0.3, 0.4];
        let mut mux = RngMultiplexer::new(5, 5, 4);
        for scheme in [
            ResamplingScheme::Residual,
            ResamplingScheme::Systematic,
            ResamplingScheme::Multinomial,
        ] {
            let indices = resample(scheme, &weights, &mut mux, 0, 1).unwrap();
            assert_eq!(indices.len(), weights.len());
            assert!(indices.iter().all(|&i| i < weights.len()));
        }
    }

    #[test]
    fn degenerate_weights_detected() {
        assert!(check_normalized(&[0.0, 0.0, 0.0], 3).is_err());
        assert!(check_normalized(&[f64::NAN], 1).is_err());
        assert!(check_normalized(&[0.2, 0.3, 0.5], 3).is_ok());
    }
}
