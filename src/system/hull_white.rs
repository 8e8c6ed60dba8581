//! One-factor Hull-White short-rate reference system (spec §4.1
//! "HullWhiteOne"), grounded on `examples/original_source/HullWhiteOne.h`.
//!
//! The state `x` is an Ornstein-Uhlenbeck deviation process (mean-reverting
//! around zero with speed `mrs` and volatility `vol`); the observation is a
//! vector of spot rates at fixed maturities, built from the initial term
//! structure (a natural cubic spline over given maturities) and the
//! standard Hull-White affine loading of the short-rate factor onto the
//! spot curve. `CubicSpline2D`, the original's spline collaborator, was
//! filtered out of the retrieval pack, so the spline used here
//! (`NaturalCubicSpline`) is a from-scratch natural cubic spline — no
//! spline crate appears anywhere in the example pack, so hand-rolling the
//! interpolation itself is the only ecosystem-consistent choice available.

use crate::distributions;
use crate::error::{Result, SmcError};
use crate::matrix::{Matrix, TimeGrid};
use crate::rng::RngMultiplexer;
use crate::system::{gaussian_isotropic_density, GenericSystem, SystemDims, SystemState};

/// A natural cubic spline through `(x_i, y_i)` knots, solved with the
/// standard tridiagonal (Thomas algorithm) system for the second
/// derivatives.
#[derive(Debug, Clone)]
pub struct NaturalCubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    second_derivatives: Vec<f64>,
}

impl NaturalCubicSpline {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return Err(SmcError::ParameterOutOfDomain(
                "cubic spline requires at least two matching (x, y) knots".into(),
            ));
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SmcError::ParameterOutOfDomain(
                "cubic spline knots must be strictly increasing".into(),
            ));
        }
        let n = xs.len();
        let mut second_derivatives = vec![0.0; n];
        if n > 2 {
            let mut sub = vec![0.0; n];
            let mut diag = vec![0.0; n];
            let mut sup = vec![0.0; n];
            let mut rhs = vec![0.0; n];

            diag[0] = 1.0;
            diag[n - 1] = 1.0;

            for i in 1..n - 1 {
                let h_im1 = xs[i] - xs[i - 1];
                let h_i = xs[i + 1] - xs[i];
                sub[i] = h_im1;
                diag[i] = 2.0 * (h_im1 + h_i);
                sup[i] = h_i;
                rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h_i - (ys[i] - ys[i - 1]) / h_im1);
            }

            // Thomas algorithm.
            for i in 1..n {
                let m = sub[i] / diag[i - 1];
                diag[i] -= m * sup[i - 1];
                rhs[i] -= m * rhs[i - 1];
            }
            second_derivatives[n - 1] = rhs[n - 1] / diag[n - 1];
            for i in (0..n - 1).rev() {
                second_derivatives[i] = (rhs[i] - sup[i] * second_derivatives[i + 1]) / diag[i];
            }
        }

        Ok(NaturalCubicSpline {
            xs,
            ys,
            second_derivatives,
        })
    }

    /// Evaluates the spline at `x`, clamping to the boundary knots when `x`
    /// falls outside the fitted range.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        let segment = self
            .xs
            .windows(2)
            .position(|w| x >= w[0] && x <= w[1])
            .unwrap_or(n - 2);
        let (x0, x1) = (self.xs[segment], self.xs[segment + 1]);
        let (y0, y1) = (self.ys[segment], self.ys[segment + 1]);
        let (d0, d1) = (
            self.second_derivatives[segment],
            self.second_derivatives[segment + 1],
        );
        let h = x1 - x0;
        let a = (x1 - x) / h;
        let b = (x - x0) / h;
        a * y0
            + b * y1
            + ((a * a * a - a) * d0 + (b * b * b - b) * d1) * (h * h) / 6.0
    }
}

pub struct HullWhiteOne {
    state: SystemState,
    mrs: f64,
    vol: f64,
    measurement_noise_std: f64,
    maturities: Vec<f64>,
    initial_term_structure: NaturalCubicSpline,
}

impl HullWhiteOne {
    pub const DIM_X: usize = 1;
    pub const DIM_U: usize = 0;
    pub const DIM_X_NOISE: usize = 1;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        time_span: TimeGrid,
        mean_revert_speed: f64,
        vol: f64,
        measurement_noise_std: f64,
        maturities: Vec<f64>,
        initial_spot_rates: Vec<f64>,
        rng_slot_x_noise: usize,
        rng_slot_y_noise: usize,
    ) -> Result<Self> {
        if mean_revert_speed < 0.0 || vol < 0.0 {
            return Err(SmcError::ParameterOutOfDomain(
                "mean reversion speed and volatility must be non-negative".into(),
            ));
        }
        let dim_y = maturities.len();
        let spline = NaturalCubicSpline::new(maturities.clone(), initial_spot_rates)?;
        let dims = SystemDims {
            dim_x: Self::DIM_X,
            dim_u: Self::DIM_U,
            dim_y,
            dim_x_noise: Self::DIM_X_NOISE,
            dim_y_noise: dim_y,
        };
        let parameters = Matrix::from_column_slice(2, 1, &[mean_revert_speed, vol]);
        Ok(HullWhiteOne {
            state: SystemState::new(time_span, dims, parameters, rng_slot_x_noise, rng_slot_y_noise),
            mrs: mean_revert_speed,
            vol,
            measurement_noise_std,
            maturities,
            initial_term_structure: spline,
        })
    }

    /// `r(t) = phi(t) + x`, the instantaneous short rate implied by OU
    /// deviation `oup` at time `t` (spec: "the short-rate map
    /// `shortRateForOUPState`"), where `phi(t)` is read off the initial
    /// term structure spline as a stand-in for the initial instantaneous
    /// forward curve.
    pub fn short_rate_for_oup_state(&self, oup: f64, t: f64) -> f64 {
        self.initial_term_structure.eval(t) + oup
    }

    /// Standard Hull-White affine loading of the short-rate factor onto a
    /// spot rate of maturity `tau`: `B(tau) / tau`, bounded in `(0, 1]` and
    /// decaying as `tau` grows, so the OU factor's influence on long
    /// maturities washes out the way mean reversion implies it should.
    fn loading(&self, tau: f64) -> f64 {
        if tau <= 0.0 {
            return 1.0;
        }
        if self.mrs.abs() < 1e-12 {
            return 1.0;
        }
        (1.0 - (-self.mrs * tau).exp()) / (self.mrs * tau)
    }

    fn transition_mean_and_std(mrs: f64, vol: f64, dt: f64) -> (f64, f64) {
        if mrs.abs() < 1e-12 {
            return (1.0, vol * dt.sqrt());
        }
        let decay = (-mrs * dt).exp();
        let variance = vol * vol * (1.0 - decay * decay) / (2.0 * mrs);
        (decay, variance.max(0.0).sqrt())
    }
}

impl GenericSystem for HullWhiteOne {
    fn dims(&self) -> SystemDims {
        SystemDims {
            dim_x: Self::DIM_X,
            dim_u: Self::DIM_U,
            dim_y: self.maturities.len(),
            dim_x_noise: Self::DIM_X_NOISE,
            dim_y_noise: self.maturities.len(),
        }
    }

    fn state(&self) -> &SystemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }

    fn drift(&self, i: usize, x: &Matrix, params: &Matrix, _u: Option<&Matrix>) -> Result<Matrix> {
        let mrs = params[(0, 0)];
        let dt = self.state.time_span.at(i)? - self.state.time_span.at(i - 1)?;
        let decay = if mrs.abs() < 1e-12 {
            1.0
        } else {
            (-mrs * dt).exp()
        };
        Ok(x.map(|xi| xi * decay))
    }

    fn draw_process_noise(
        &self,
        mux: &mut RngMultiplexer,
        i: usize,
        n: usize,
        params: &Matrix,
    ) -> Result<Matrix> {
        let dt = self.state.time_span.at(i)? - self.state.time_span.at(i - 1)?;
        let (_, std_dev) = Self::transition_mean_and_std(params[(0, 0)], params[(1, 0)], dt);
        let samples = distributions::normal_vec(mux, self.state.rng_slot_x_noise, 0.0, std_dev, n)?;
        Ok(Matrix::from_row_slice(1, n, &samples))
    }

    fn noise_free_measurement(&self, i: usize, x: &Matrix) -> Result<Matrix> {
        let t = self.state.time_span.at(i)?;
        let ncols = x.ncols();
        let mut out = Matrix::zeros(self.maturities.len(), ncols);
        for (row, tau) in self.maturities.iter().enumerate() {
            let loading = self.loading(*tau);
            let base = self.initial_term_structure.eval(t + tau);
            for col in 0..ncols {
                out[(row, col)] = base + loading * x[(0, col)];
            }
        }
        Ok(out)
    }

    fn draw_measurement_noise(
        &self,
        mux: &mut RngMultiplexer,
        _i: usize,
        n: usize,
        _params: &Matrix,
    ) -> Result<Matrix> {
        let dim_y = self.maturities.len();
        let mut out = Matrix::zeros(dim_y, n);
        for col in 0..n {
            let samples =
                distributions::normal_vec(mux, self.state.rng_slot_y_noise, 0.0, self.measurement_noise_std, dim_y)?;
            for row in 0..dim_y {
                out[(row, col)] = samples[row];
            }
        }
        Ok(out)
    }

    fn probability_of(&self, y: &Matrix, x: &Matrix, i: usize, _params: &Matrix) -> Result<f64> {
        let mean = self.noise_free_measurement(i, x)?;
        Ok(gaussian_isotropic_density(y, &mean, self.measurement_noise_std))
    }

    fn initial_state_sample(&self, mux: &mut RngMultiplexer) -> Result<Matrix> {
        // The OU deviation starts at its stationary mean, zero.
        let v = distributions::normal(mux, self.state.rng_slot_x_noise, 0.0, self.vol)?;
        Ok(Matrix::from_row_slice(1, 1, &[v]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn spline_interpolates_through_its_own_knots() {
        let spline =
            NaturalCubicSpline::new(vec![1.0, 2.0, 3.0, 5.0], vec![0.02, 0.025, 0.03, 0.035]).unwrap();
        for (x, y) in [(1.0, 0.02), (2.0, 0.025), (3.0, 0.03), (5.0, 0.035)] {
            assert_relative_eq!(spline.eval(x), y, epsilon = 1e-9);
        }
    }

    #[test]
    fn spline_rejects_non_increasing_knots() {
        assert!(NaturalCubicSpline::new(vec![1.0, 1.0], vec![0.0, 0.0]).is_err());
    }

    #[test]
    fn loading_decays_to_zero_for_long_maturities() {
        let grid = TimeGrid::from_span(0.0, 10.0, 1.0).unwrap();
        let sys = HullWhiteOne::new(
            grid,
            0.1,
            0.01,
            0.001,
            vec![1.0, 5.0, 30.0],
            vec![0.02, 0.025, 0.03],
            0,
            1,
        )
        .unwrap();
        assert!(sys.loading(1.0) > sys.loading(30.0));
    }
}
