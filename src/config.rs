//! Engine configuration surface (spec §6): the values a driver passes in
//! and the engine consumes as-is, grounded on
//! `examples/jwschroeder3-nested_sampling/src/lib.rs`'s `Config` — a plain
//! `#[derive(Deserialize)]` struct a driver loads from a file or command
//! line, no validation logic of its own (the engine-side constructors
//! validate).

use serde::{Deserialize, Serialize};

use crate::filter::ResamplingScheme;

/// `(alpha, gamma, a, c, A)`, SPSA's five tuning coefficients (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpsaCoefficients {
    pub alpha: f64,
    pub gamma: f64,
    pub a: f64,
    pub c: f64,
    pub big_a: f64,
}

impl Default for SpsaCoefficients {
    fn default() -> Self {
        // The spec §8 worked SPSA example's own coefficients.
        SpsaCoefficients {
            alpha: 0.602,
            gamma: 0.101,
            a: 0.16,
            c: 0.1,
            big_a: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingSchemeConfig {
    Residual,
    Systematic,
    Multinomial,
}

impl From<ResamplingSchemeConfig> for ResamplingScheme {
    fn from(value: ResamplingSchemeConfig) -> Self {
        match value {
            ResamplingSchemeConfig::Residual => ResamplingScheme::Residual,
            ResamplingSchemeConfig::Systematic => ResamplingScheme::Systematic,
            ResamplingSchemeConfig::Multinomial => ResamplingScheme::Multinomial,
        }
    }
}

/// Everything a driver supplies before running the engine (spec §6
/// "Configuration surface"). The engine never reads this type directly —
/// drivers translate it into the typed constructor arguments
/// (`TimeGrid::from_span`, `ParticleFilter::new`, and so on) — it exists
/// only as the serializable boundary a GUI or CLI driver loads from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,

    #[serde(default = "default_t0")]
    pub t0: f64,
    #[serde(default = "default_t1")]
    pub t1: f64,
    #[serde(default = "default_dt")]
    pub dt: f64,

    #[serde(default = "default_histogram_domain")]
    pub histogram_domain: Vec<f64>,

    #[serde(default = "default_scheme")]
    pub resampling_scheme: ResamplingSchemeConfig,

    #[serde(default)]
    pub spsa: SpsaCoefficients,

    #[serde(default = "default_window_size")]
    pub window_size: usize,

    #[serde(default = "default_iteration_limit")]
    pub iteration_limit: usize,

    pub seed1: u32,
    pub seed2: u32,
}

fn default_particle_count() -> usize {
    200
}

fn default_t0() -> f64 {
    0.0
}

fn default_t1() -> f64 {
    120.0
}

fn default_dt() -> f64 {
    1.0
}

/// 400 equispaced bins on `[-10, 10]` (spec §6's default histogram domain),
/// i.e. 401 edges.
fn default_histogram_domain() -> Vec<f64> {
    let bins = 400;
    let (lo, hi) = (-10.0, 10.0);
    let step = (hi - lo) / bins as f64;
    (0..=bins).map(|k| lo + step * k as f64).collect()
}

fn default_scheme() -> ResamplingSchemeConfig {
    ResamplingSchemeConfig::Systematic
}

fn default_window_size() -> usize {
    20
}

fn default_iteration_limit() -> usize {
    200
}

impl Default for Config {
    fn default() -> Self {
        Config {
            particle_count: default_particle_count(),
            t0: default_t0(),
            t1: default_t1(),
            dt: default_dt(),
            histogram_domain: default_histogram_domain(),
            resampling_scheme: default_scheme(),
            spsa: SpsaCoefficients::default(),
            window_size: default_window_size(),
            iteration_limit: default_iteration_limit(),
            seed1: 521_288_629,
            seed2: 362_436_069,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_histogram_domain_has_401_edges() {
        let cfg = Config::default();
        assert_eq!(cfg.histogram_domain.len(), 401);
        assert_eq!(cfg.histogram_domain.first().copied(), Some(-10.0));
        assert_eq!(cfg.histogram_domain.last().copied(), Some(10.0));
    }

    #[test]
    fn resampling_scheme_config_maps_onto_the_engine_enum() {
        assert_eq!(
            ResamplingScheme::from(ResamplingSchemeConfig::Residual),
            ResamplingScheme::Residual
        );
    }
}
