//! `GenericSystem` contract: the abstraction the particle filter operates
//! on. A system exposes dimensions, a (possibly stochastic) state
//! transition, an observation map, and an observation likelihood; the
//! filter never knows which concrete system it is driving.
//!
//! This splits the transition and observation responsibilities the way a
//! motion-model/measurement-model pair would, generalized to runtime
//! state/parameter/time-grid dimensions rather than fixed at compile
//! time.

pub mod hull_white;
pub mod random_walk;
pub mod simple;

use crate::error::Result;
use crate::matrix::{get_column, Matrix, TimeGrid};
use crate::rng::RngMultiplexer;

/// Fixed dimensions of a system: state, control, observation, and the two
/// noise spaces. Controls and noises may be zero-dimensional.
#[derive(Debug, Clone, Copy)]
pub struct SystemDims {
    pub dim_x: usize,
    pub dim_u: usize,
    pub dim_y: usize,
    pub dim_x_noise: usize,
    pub dim_y_noise: usize,
}

/// The trajectory matrices and bookkeeping every `GenericSystem` owns
/// (spec §3's `GenericSystem` data model): time grid, parameters, and the
/// five `dim x T` matrices populated by a simulation run, plus the two RNG
/// slots this system's noises are drawn from.
#[derive(Debug, Clone)]
pub struct SystemState {
    pub time_span: TimeGrid,
    pub parameters: Matrix,
    pub x: Matrix,
    pub u: Matrix,
    pub y: Matrix,
    pub x_noise: Matrix,
    pub y_noise: Matrix,
    pub rng_slot_x_noise: usize,
    pub rng_slot_y_noise: usize,
}

impl SystemState {
    pub fn new(
        time_span: TimeGrid,
        dims: SystemDims,
        parameters: Matrix,
        rng_slot_x_noise: usize,
        rng_slot_y_noise: usize,
    ) -> Self {
        let t = time_span.len();
        SystemState {
            time_span,
            parameters,
            x: Matrix::zeros(dims.dim_x, t),
            u: Matrix::zeros(dims.dim_u, t),
            y: Matrix::zeros(dims.dim_y, t),
            x_noise: Matrix::zeros(dims.dim_x_noise, t),
            y_noise: Matrix::zeros(dims.dim_y_noise, t),
            rng_slot_x_noise,
            rng_slot_y_noise,
        }
    }

    pub fn horizon(&self) -> usize {
        self.time_span.len()
    }
}

/// The generic system contract (spec §4.1). Implementors are stateless
/// between invocations except for their stored trajectory matrices:
/// repeated calls to the deterministic half (`drift`) on the same inputs
/// are bit-identical, and every stochastic draw consumes exactly one fresh
/// sample from the registered stream.
pub trait GenericSystem {
    fn dims(&self) -> SystemDims;
    fn state(&self) -> &SystemState;
    fn state_mut(&mut self) -> &mut SystemState;

    /// Deterministic part of the state transition, `f(x, u, t)`, evaluated
    /// under `params` (not necessarily the system's own stored
    /// parameters — this is the "parameter-accepting overload" the
    /// specification calls out, letting a filter evaluate hypothetical
    /// parameters without mutating `self`). `x` may hold several particles
    /// as columns; the result has the same column count.
    fn drift(&self, i: usize, x: &Matrix, params: &Matrix, u: Option<&Matrix>) -> Result<Matrix>;

    /// Draws `n` columns of fresh process noise for step `i` (the step
    /// being transitioned *into*), using this system's registered X-noise
    /// slot. `params` is the same hypothetical-parameter column `drift`
    /// takes: a system whose noise scale is itself an estimated parameter
    /// (e.g. `RandomWalk`'s process variance) reads it from here rather
    /// than from `self`.
    fn draw_process_noise(
        &self,
        mux: &mut RngMultiplexer,
        i: usize,
        n: usize,
        params: &Matrix,
    ) -> Result<Matrix>;

    /// Maps process noise (`dimXNoise x n`) onto the state space
    /// (`dimX x n`). Defaults to the identity map when the two spaces
    /// coincide, which holds for every reference system in this crate.
    fn noise_to_state(&self, noise: &Matrix) -> Matrix {
        noise.clone()
    }

    /// Deterministic observation map `h(x, t)`.
    fn noise_free_measurement(&self, i: usize, x: &Matrix) -> Result<Matrix>;

    /// Draws `n` columns of fresh measurement noise for step `i`, using
    /// this system's registered Y-noise slot. `params` mirrors
    /// [`GenericSystem::draw_process_noise`]'s hypothetical-parameter
    /// column.
    fn draw_measurement_noise(
        &self,
        mux: &mut RngMultiplexer,
        i: usize,
        n: usize,
        params: &Matrix,
    ) -> Result<Matrix>;

    /// Maps measurement noise (`dimYNoise x n`) onto the observation space
    /// (`dimY x n`). Defaults to the identity map.
    fn noise_to_measurement(&self, noise: &Matrix) -> Matrix {
        noise.clone()
    }

    /// `p(y | x, params, t_i)`, the observation density. Must be
    /// non-negative.
    fn probability_of(&self, y: &Matrix, x: &Matrix, i: usize, params: &Matrix) -> Result<f64>;

    /// Draws one sample of the prior over the initial state, used by
    /// `initializeParticleFilter` (spec §4.2).
    fn initial_state_sample(&self, mux: &mut RngMultiplexer) -> Result<Matrix>;

    /// `x(t_i) = f(x(t_{i-1}), v_i)` using the system's own stored
    /// parameters and a fresh process-noise draw.
    fn next_state(
        &self,
        mux: &mut RngMultiplexer,
        i: usize,
        x: &Matrix,
        u: Option<&Matrix>,
    ) -> Result<Matrix> {
        let params = self.state().parameters.clone();
        self.next_state_with_params(mux, i, x, &params, u)
    }

    /// As [`GenericSystem::next_state`], but evaluated under an arbitrary
    /// `params` column rather than the system's own stored parameters —
    /// used by the parameter estimators to propagate hypothetical
    /// parameter values (spec §4.1).
    fn next_state_with_params(
        &self,
        mux: &mut RngMultiplexer,
        i: usize,
        x: &Matrix,
        params: &Matrix,
        u: Option<&Matrix>,
    ) -> Result<Matrix> {
        let mean = self.drift(i, x, params, u)?;
        let noise = self.draw_process_noise(mux, i, x.ncols(), params)?;
        Ok(mean + self.noise_to_state(&noise))
    }

    /// `y(t_i) = h(x(t_i), t_i) + w_i`, drawing a fresh measurement-noise
    /// sample.
    fn measurement(
        &self,
        mux: &mut RngMultiplexer,
        i: usize,
        x: &Matrix,
        params: &Matrix,
    ) -> Result<Matrix> {
        let mean = self.noise_free_measurement(i, x)?;
        let noise = self.draw_measurement_noise(mux, i, x.ncols(), params)?;
        Ok(mean + self.noise_to_measurement(&noise))
    }

    /// `probabilityOf(measured_y_at_i, x, i, params)` — the filter calls
    /// this once per particle per step; the system looks its own recorded
    /// measurement at `i` up internally so the filter never has to carry a
    /// separate "current observation" value.
    fn importance_weight_at_time_index(
        &self,
        i: usize,
        x: &Matrix,
        params: &Matrix,
    ) -> Result<f64> {
        let y_i = get_column(&self.state().y, i)?;
        self.probability_of(&y_i, x, i, params)
    }

    /// Fills `X[:,1] <- x0`, then for `i = 2..=T` draws `x(t_i)` and
    /// `y(t_i)` (spec §4.1). The initial observation `y(t_1)` is produced
    /// deterministically from `x(t_1)` (no noise), per the specification's
    /// explicit phrasing contrasting it with the noisy `i >= 2` case.
    fn simulate_with_initial_state(
        &mut self,
        mux: &mut RngMultiplexer,
        x0: &Matrix,
        u: Option<&Matrix>,
    ) -> Result<()> {
        let t = self.state().horizon();
        {
            let state = self.state_mut();
            crate::matrix::set_column(&mut state.x, 1, x0)?;
        }
        let y0 = self.noise_free_measurement(1, x0)?;
        {
            let state = self.state_mut();
            crate::matrix::set_column(&mut state.y, 1, &y0)?;
        }

        for i in 2..=t {
            let x_prev = get_column(&self.state().x, i - 1)?;
            let u_col = match u {
                Some(u) if u.ncols() >= i => Some(get_column(u, i)?),
                _ => None,
            };
            let x_i = self.next_state(mux, i, &x_prev, u_col.as_ref())?;
            let params = self.state().parameters.clone();
            let y_i = self.measurement(mux, i, &x_i, &params)?;
            let state = self.state_mut();
            crate::matrix::set_column(&mut state.x, i, &x_i)?;
            crate::matrix::set_column(&mut state.y, i, &y_i)?;
        }
        Ok(())
    }
}

/// `p(y | x)` under additive isotropic Gaussian measurement noise with
/// common standard deviation `std_dev` — spec §4.1: "for systems with
/// additive Gaussian measurement noise it is the isotropic normal
/// density."
pub fn gaussian_isotropic_density(y: &Matrix, mean: &Matrix, std_dev: f64) -> f64 {
    debug_assert_eq!(y.shape(), mean.shape());
    let dim = y.nrows() as f64;
    let sq_err: f64 = y
        .iter()
        .zip(mean.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    if std_dev == 0.0 {
        return if sq_err < 1e-12 { 1.0 } else { 0.0 };
    }
    let variance = std_dev * std_dev;
    let normalizer = (2.0 * std::f64::consts::PI * variance).powf(dim / 2.0);
    (-sq_err / (2.0 * variance)).exp() / normalizer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_density_peaks_at_mean() {
        let y = Matrix::from_row_slice(1, 1, &[0.0]);
        let mean = Matrix::from_row_slice(1, 1, &[0.0]);
        let at_mean = gaussian_isotropic_density(&y, &mean, 1.0);
        let off_mean = gaussian_isotropic_density(
            &Matrix::from_row_slice(1, 1, &[5.0]),
            &mean,
            1.0,
        );
        assert!(at_mean > off_mean);
        assert!(off_mean >= 0.0);
    }

    #[test]
    fn gaussian_density_with_zero_noise_is_finite() {
        let y = Matrix::from_row_slice(1, 1, &[3.0]);
        let matching = Matrix::from_row_slice(1, 1, &[3.0]);
        let mismatched = Matrix::from_row_slice(1, 1, &[3.5]);
        let at_match = gaussian_isotropic_density(&y, &matching, 0.0);
        let at_mismatch = gaussian_isotropic_density(&y, &mismatched, 0.0);
        assert!(at_match.is_finite());
        assert_eq!(at_match, 1.0);
        assert!(at_mismatch.is_finite());
        assert_eq!(at_mismatch, 0.0);
    }
}
