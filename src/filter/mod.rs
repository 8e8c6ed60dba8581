//! The sequential Monte Carlo engine (spec §4.2 "ParticleFilter"): the
//! predict/weight/estimate/resample recursion driving an arbitrary
//! [`GenericSystem`], grounded on
//! `examples/original_source/GenericParticleFilter.h`.
//!
//! Unlike the teacher crate's `GeneralParticleFilter` (which owns its
//! system by value and keeps a single resampling call inline in
//! `update_estimate`), this filter borrows its system — the specification's
//! parameter estimators need to mutate the system's own parameter column
//! between filter passes, which a by-value filter can't express — and keeps
//! every RNG draw slot-explicit, consistent with [`crate::rng`].

pub mod histogram;
pub mod io;
pub mod parameter_estimation;
pub mod resampling;

use crate::error::{Result, SmcError};
use crate::matrix::{Matrix, TimeGrid};
use crate::rng::RngMultiplexer;
use crate::system::GenericSystem;

pub use resampling::ResamplingScheme;

/// The default RNG slots the filter itself draws from, distinct from any
/// system's own noise slots (spec §4.4's `RNGIDForResampler` /
/// `RNGIDForBernoulli`).
pub const DEFAULT_SLOT_RESAMPLER: usize = 14;
pub const DEFAULT_SLOT_BERNOULLI: usize = 15;

/// Sequential Monte Carlo state estimator over a borrowed [`GenericSystem`].
///
/// `particles[t]`, `weights[t]`, `particles_predicted[t]` and
/// `measurements_predicted[t]` are indexed by zero-based step, each holding
/// one `dimX x N` (or `dimY x N`) matrix; `estimate` is a single `dimX x T`
/// matrix written one column per step. All of this is only valid after
/// [`ParticleFilter::initialize_particle_filter`] has run.
pub struct ParticleFilter<'a, S: GenericSystem> {
    system: &'a mut S,
    count: usize,
    scheme: ResamplingScheme,
    rng_slot_resampler: usize,
    rng_slot_bernoulli: usize,
    particles: Vec<Matrix>,
    weights: Vec<Matrix>,
    particles_predicted: Vec<Matrix>,
    measurements_predicted: Vec<Matrix>,
    estimate: Matrix,
    histogram: Vec<Vec<usize>>,
    initialized: bool,
}

impl<'a, S: GenericSystem> ParticleFilter<'a, S> {
    /// `count` particles (`N` in spec §4.2), driven by `scheme`. The filter
    /// is unusable until [`ParticleFilter::initialize_particle_filter`] is
    /// called.
    pub fn new(system: &'a mut S, count: usize, scheme: ResamplingScheme) -> Self {
        ParticleFilter {
            system,
            count,
            scheme,
            rng_slot_resampler: DEFAULT_SLOT_RESAMPLER,
            rng_slot_bernoulli: DEFAULT_SLOT_BERNOULLI,
            particles: Vec::new(),
            weights: Vec::new(),
            particles_predicted: Vec::new(),
            measurements_predicted: Vec::new(),
            estimate: Matrix::zeros(0, 0),
            histogram: Vec::new(),
            initialized: false,
        }
    }

    /// Overrides the RNG slots the resampler draws from; defaults to
    /// [`DEFAULT_SLOT_RESAMPLER`]/[`DEFAULT_SLOT_BERNOULLI`].
    pub fn with_resampling_slots(mut self, resampler: usize, bernoulli: usize) -> Self {
        self.rng_slot_resampler = resampler;
        self.rng_slot_bernoulli = bernoulli;
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn estimate(&self) -> &Matrix {
        &self.estimate
    }

    pub fn particles_at(&self, time_index: usize) -> Result<&Matrix> {
        self.particles
            .get(time_index - 1)
            .ok_or(SmcError::IndexOutOfRange {
                index: time_index,
                bound: self.particles.len(),
            })
    }

    pub fn weights_at(&self, time_index: usize) -> Result<&Matrix> {
        self.weights
            .get(time_index - 1)
            .ok_or(SmcError::IndexOutOfRange {
                index: time_index,
                bound: self.weights.len(),
            })
    }

    pub fn particles_predicted_at(&self, time_index: usize) -> Result<&Matrix> {
        self.particles_predicted
            .get(time_index - 1)
            .ok_or(SmcError::IndexOutOfRange {
                index: time_index,
                bound: self.particles_predicted.len(),
            })
    }

    pub fn measurements_predicted_at(&self, time_index: usize) -> Result<&Matrix> {
        self.measurements_predicted
            .get(time_index - 1)
            .ok_or(SmcError::IndexOutOfRange {
                index: time_index,
                bound: self.measurements_predicted.len(),
            })
    }

    pub fn histogram_at(&self, time_index: usize) -> Result<&[usize]> {
        self.histogram
            .get(time_index - 1)
            .map(Vec::as_slice)
            .ok_or(SmcError::IndexOutOfRange {
                index: time_index,
                bound: self.histogram.len(),
            })
    }

    fn horizon(&self) -> usize {
        self.system.state().horizon()
    }

    /// Seeds step 1: draws `N` i.i.d. samples from the system's prior and
    /// sets uniform weights `1/N` (spec §4.2 "initializeParticleFilter").
    pub fn initialize_particle_filter(&mut self, mux: &mut RngMultiplexer) -> Result<()> {
        let dim_x = self.system.dims().dim_x;
        let dim_y = self.system.dims().dim_y;
        let t = self.horizon();
        let n = self.count;

        let mut particles = vec![Matrix::zeros(dim_x, n); t];
        let weights = vec![Matrix::from_element(1, n, 1.0 / n as f64); t];
        let particles_predicted = vec![Matrix::zeros(dim_x, n); t];
        let measurements_predicted = vec![Matrix::zeros(dim_y, n); t];
        let mut estimate = Matrix::zeros(dim_x, t);

        for k in 0..n {
            let x0 = self.system.initial_state_sample(mux)?;
            particles[0].set_column(k, &x0.column(0));
        }
        let mean0 = weighted_mean(&particles[0], &weights[0]);
        estimate.set_column(0, &mean0.column(0));

        self.particles = particles;
        self.weights = weights;
        self.particles_predicted = particles_predicted;
        self.measurements_predicted = measurements_predicted;
        self.estimate = estimate;
        self.histogram = vec![Vec::new(); t];
        self.initialized = true;
        Ok(())
    }

    /// Rebuilds every time-indexed array against a new time grid, discarding
    /// any already-computed trajectory (spec §4.2 "setTimeSpan" reallocates
    /// dependent resources; the filter must be re-initialized afterwards).
    pub fn set_time_span(&mut self, time_span: TimeGrid) -> Result<()> {
        let dims = self.system.dims();
        let t = time_span.len();
        let parameters = self.system.state().parameters.clone();
        let rng_slot_x_noise = self.system.state().rng_slot_x_noise;
        let rng_slot_y_noise = self.system.state().rng_slot_y_noise;
        *self.system.state_mut() = crate::system::SystemState::new(
            time_span,
            dims,
            parameters,
            rng_slot_x_noise,
            rng_slot_y_noise,
        );
        self.particles.clear();
        self.weights.clear();
        self.particles_predicted.clear();
        self.measurements_predicted.clear();
        self.estimate = Matrix::zeros(dims.dim_x, t);
        self.histogram = Vec::new();
        self.initialized = false;
        Ok(())
    }

    /// Runs the predict/weight/estimate/resample recursion over the whole
    /// horizon (spec §4.2 "estimateStates"). Each step:
    ///   1. predicts every particle one step ahead (no resampling yet),
    ///   2. reweights by the observation likelihood at the recorded
    ///      measurement,
    ///   3. records the pre-resampling weighted mean as that step's
    ///      estimate,
    ///   4. resamples, handing the next step uniform weights again.
    pub fn estimate_states(&mut self, mux: &mut RngMultiplexer) -> Result<()> {
        if !self.initialized {
            return Err(SmcError::NotInitialized);
        }
        let t = self.horizon();
        let params = self.system.state().parameters.clone();

        for i in 2..=t {
            let ti = i - 1;
            log::debug!("estimate_states: step {i}/{t}, N={}", self.count);
            let x_prev = self.particles[ti - 1].clone();
            let x_hat = self.system.next_state(mux, i, &x_prev, None)?;
            let y_hat = self.system.noise_free_measurement(i, &x_hat)?;

            let w_prev = self.weights[ti - 1].clone();
            let mut w_unnorm = Matrix::zeros(1, self.count);
            for k in 0..self.count {
                let xk = x_hat.column(k).into_owned();
                let xk = Matrix::from_column_slice(xk.nrows(), 1, xk.as_slice());
                let likelihood = self.system.importance_weight_at_time_index(i, &xk, &params)?;
                w_unnorm[(0, k)] = w_prev[(0, k)] * likelihood;
            }
            resampling::check_normalized(w_unnorm.as_slice(), i)?;
            let total: f64 = w_unnorm.iter().sum();
            let w_norm = w_unnorm.map(|w| w / total);

            let ess = 1.0 / w_norm.iter().map(|w| w * w).sum::<f64>();
            if ess < 0.1 * self.count as f64 {
                log::warn!(
                    "estimate_states: step {i} effective sample size {ess:.1} is low relative to N={}",
                    self.count
                );
            }

            let mean = weighted_mean(&x_hat, &w_norm);

            self.particles_predicted[ti] = x_hat.clone();
            self.measurements_predicted[ti] = y_hat;
            self.weights[ti] = w_norm.clone();
            self.estimate.set_column(ti, &mean.column(0));

            let indices = resampling::resample(
                self.scheme,
                w_norm.as_slice(),
                mux,
                self.rng_slot_resampler,
                self.rng_slot_bernoulli,
            )?;
            self.particles[ti] = gather_columns(&x_hat, &indices);
            self.weights[ti] = Matrix::from_element(1, self.count, 1.0 / self.count as f64);
        }
        Ok(())
    }

    /// Builds the posterior (post-resampling) histogram of state component
    /// `component` (1-based) across every step, for scalar-per-component
    /// plotting (spec §4.2 "makePosteriorDistributionHistogram").
    pub fn make_posterior_distribution_histogram_for_state_component(
        &mut self,
        component: usize,
        domain: &[f64],
    ) -> Result<()> {
        if component == 0 || component > self.system.dims().dim_x {
            return Err(SmcError::IndexOutOfRange {
                index: component,
                bound: self.system.dims().dim_x,
            });
        }
        let mut histogram = Vec::with_capacity(self.particles.len());
        for particles in &self.particles {
            let values: Vec<f64> = particles.row(component - 1).iter().copied().collect();
            histogram.push(histogram::histogram_counts(&values, domain)?);
        }
        self.histogram = histogram;
        Ok(())
    }

    /// As above, but over the pre-resampling predictive measurements (spec
    /// §4.2 "makePredictiveDistributionHistogram").
    pub fn make_predictive_distribution_histogram_for_measurement_component(
        &mut self,
        component: usize,
        domain: &[f64],
    ) -> Result<()> {
        if component == 0 || component > self.system.dims().dim_y {
            return Err(SmcError::IndexOutOfRange {
                index: component,
                bound: self.system.dims().dim_y,
            });
        }
        let mut histogram = Vec::with_capacity(self.measurements_predicted.len());
        for measurements in &self.measurements_predicted {
            let values: Vec<f64> = if measurements.ncols() == 0 {
                Vec::new()
            } else {
                measurements.row(component - 1).iter().copied().collect()
            };
            histogram.push(histogram::histogram_counts(&values, domain)?);
        }
        self.histogram = histogram;
        Ok(())
    }

    /// `mean(|estimate - truth|)` per state component across the horizon
    /// (spec §8's accuracy checks), `dimX x 1`.
    pub fn mean_absolute_estimation_error(&self, truth: &Matrix) -> Result<Matrix> {
        if truth.shape() != self.estimate.shape() {
            return Err(SmcError::ShapeMismatch {
                expected: self.estimate.shape(),
                actual: truth.shape(),
            });
        }
        let diff = (&self.estimate - truth).abs();
        let t = diff.ncols() as f64;
        let mut out = Matrix::zeros(diff.nrows(), 1);
        for row in 0..diff.nrows() {
            out[(row, 0)] = diff.row(row).sum() / t;
        }
        Ok(out)
    }
}

fn weighted_mean(particles: &Matrix, weights: &Matrix) -> Matrix {
    let total: f64 = weights.iter().sum();
    let mean = particles * weights.transpose();
    if total > 0.0 {
        mean.map(|v| v / total)
    } else {
        mean
    }
}

fn gather_columns(m: &Matrix, indices: &[usize]) -> Matrix {
    let mut out = Matrix::zeros(m.nrows(), indices.len());
    for (col, &src) in indices.iter().enumerate() {
        out.set_column(col, &m.column(src));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::TimeGrid;
    use crate::system::random_walk::RandomWalk;

    fn tiny_filter() -> (RandomWalk, RngMultiplexer) {
        let grid = TimeGrid::from_span(1.0, 5.0, 1.0).unwrap();
        let system = RandomWalk::new(grid, 0.1, 0.1, 0.0, 1.0, 0, 1).unwrap();
        let mux = RngMultiplexer::with_default_slots(7, 13);
        (system, mux)
    }

    #[test]
    fn using_the_filter_before_initializing_it_errors() {
        let (mut system, mut mux) = tiny_filter();
        let mut pf = ParticleFilter::new(&mut system, 50, ResamplingScheme::Systematic);
        assert!(matches!(
            pf.estimate_states(&mut mux),
            Err(SmcError::NotInitialized)
        ));
    }

    #[test]
    fn initialize_then_estimate_populates_every_step() {
        let (mut system, mut mux) = tiny_filter();
        let mut pf = ParticleFilter::new(&mut system, 200, ResamplingScheme::Systematic);
        pf.initialize_particle_filter(&mut mux).unwrap();
        pf.estimate_states(&mut mux).unwrap();
        assert_eq!(pf.estimate().ncols(), 5);
        for w in pf.weights_at(5).unwrap().iter() {
            assert!((w - 0.005).abs() < 1e-12);
        }
    }

    #[test]
    fn resampled_particles_are_drawn_from_the_predicted_set() {
        let (mut system, mut mux) = tiny_filter();
        let mut pf = ParticleFilter::new(&mut system, 64, ResamplingScheme::Multinomial);
        pf.initialize_particle_filter(&mut mux).unwrap();
        pf.estimate_states(&mut mux).unwrap();
        let predicted: Vec<f64> = pf.particles_predicted_at(5).unwrap().iter().copied().collect();
        for &survivor in pf.particles_at(5).unwrap().iter() {
            assert!(predicted.contains(&survivor));
        }
    }
}
