//! Posterior/predictive histogram construction (spec §4.2), grounded on
//! `examples/original_source/MathUtil.c`'s `Hist` routine: a binary search
//! over a strictly increasing `domain` of bin edges.
//!
//! One divergence from the original is deliberate: the C `Hist` aborts its
//! *entire* scan the first time it meets a value past the last edge
//! (`break`), silently zeroing every count after that point whenever values
//! aren't already sorted. The specification's own wording — "samples >=
//! edge_K are discarded" — describes per-sample discarding, the natural
//! reading (spec §9 open question (c)), so this implementation skips only
//! the out-of-range sample (`continue`) rather than the whole scan.

use crate::error::{Result, SmcError};

fn check_domain(domain: &[f64]) -> Result<()> {
    if domain.len() < 2 {
        return Err(SmcError::ParameterOutOfDomain(
            "histogram domain needs at least two edges".into(),
        ));
    }
    if domain.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SmcError::ParameterOutOfDomain(
            "histogram domain must be strictly increasing".into(),
        ));
    }
    Ok(())
}

/// Bins `values` into the `domain.len() - 1` half-open intervals
/// `[domain[j], domain[j+1])`. Values `>= domain[last]` are discarded;
/// values `< domain[0]` fall into bin 0 (the original's binary search
/// converges there since it starts with `left = 0`).
pub fn histogram_counts(values: &[f64], domain: &[f64]) -> Result<Vec<usize>> {
    check_domain(domain)?;
    let mut counts = vec![0usize; domain.len() - 1];
    for &v in values {
        if v >= domain[domain.len() - 1] {
            continue;
        }
        let mut left = 0usize;
        let mut right = domain.len() - 1;
        while right - left > 1 {
            let middle = left + (right - left) / 2;
            if v >= domain[middle] {
                left = middle;
            } else {
                right = middle;
            }
        }
        counts[left] += 1;
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_histogram_example() {
        let domain: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let values = [0.5, 1.5, 1.5, 9.9];
        let counts = histogram_counts(&values, &domain).unwrap();
        assert_eq!(counts, vec![1, 2, 0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn values_at_or_past_last_edge_are_discarded() {
        let domain = [0.0, 1.0, 2.0];
        let counts = histogram_counts(&[2.0, 2.5, 0.5], &domain).unwrap();
        assert_eq!(counts.iter().sum::<usize>(), 1);
    }

    #[test]
    fn rejects_non_increasing_domain() {
        assert!(histogram_counts(&[0.0], &[1.0, 1.0]).is_err());
    }
}
