//! The canonical nonlinear test system (spec §4.1 "SimpleSystem"), grounded
//! on `examples/original_source/SimpleSystem.h`: a scalar state with a
//! folded-sine drift and a squared observation, the standard benchmark for
//! particle filters since Gordon, Salmond & Smith (1993).
//!
//! `x(t+1) = phi1 x(t) + phi2 x(t) / (1 + x(t)^2) + phi3 cos(1.2 t) + v(t)`
//! `y(t)   = x(t)^2 / 20 + w(t)`

use crate::distributions;
use crate::error::Result;
use crate::matrix::{Matrix, TimeGrid};
use crate::rng::RngMultiplexer;
use crate::system::{gaussian_isotropic_density, GenericSystem, SystemDims, SystemState};

pub struct SimpleSystem {
    state: SystemState,
    sigma: f64,
    initial_x_mean: f64,
    initial_x_std: f64,
}

impl SimpleSystem {
    pub const DIM_X: usize = 1;
    pub const DIM_U: usize = 0;
    pub const DIM_Y: usize = 1;
    pub const DIM_X_NOISE: usize = 1;
    pub const DIM_Y_NOISE: usize = 1;

    /// `phi1, phi2, phi3` default to the textbook coefficients
    /// `(0.5, 25.0, 8.0)`.
    pub fn new(
        time_span: TimeGrid,
        sigma: f64,
        phi1: f64,
        phi2: f64,
        phi3: f64,
        initial_x_mean: f64,
        initial_x_std: f64,
        rng_slot_x_noise: usize,
        rng_slot_y_noise: usize,
    ) -> Self {
        let dims = SystemDims {
            dim_x: Self::DIM_X,
            dim_u: Self::DIM_U,
            dim_y: Self::DIM_Y,
            dim_x_noise: Self::DIM_X_NOISE,
            dim_y_noise: Self::DIM_Y_NOISE,
        };
        let parameters = Matrix::from_column_slice(3, 1, &[phi1, phi2, phi3]);
        SimpleSystem {
            state: SystemState::new(time_span, dims, parameters, rng_slot_x_noise, rng_slot_y_noise),
            sigma,
            initial_x_mean,
            initial_x_std,
        }
    }

    pub fn with_textbook_coefficients(
        time_span: TimeGrid,
        sigma: f64,
        initial_x_mean: f64,
        initial_x_std: f64,
        rng_slot_x_noise: usize,
        rng_slot_y_noise: usize,
    ) -> Self {
        Self::new(
            time_span,
            sigma,
            0.5,
            25.0,
            8.0,
            initial_x_mean,
            initial_x_std,
            rng_slot_x_noise,
            rng_slot_y_noise,
        )
    }
}

impl GenericSystem for SimpleSystem {
    fn dims(&self) -> SystemDims {
        SystemDims {
            dim_x: Self::DIM_X,
            dim_u: Self::DIM_U,
            dim_y: Self::DIM_Y,
            dim_x_noise: Self::DIM_X_NOISE,
            dim_y_noise: Self::DIM_Y_NOISE,
        }
    }

    fn state(&self) -> &SystemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }

    fn drift(&self, i: usize, x: &Matrix, params: &Matrix, _u: Option<&Matrix>) -> Result<Matrix> {
        let phi1 = params[(0, 0)];
        let phi2 = params[(1, 0)];
        let phi3 = params[(2, 0)];
        let t_prev = self.state.time_span.at(i - 1)?;
        let forcing = phi3 * (1.2 * t_prev).cos();
        Ok(x.map(|xi| phi1 * xi + phi2 * xi / (1.0 + xi * xi) + forcing))
    }

    fn draw_process_noise(
        &self,
        mux: &mut RngMultiplexer,
        i: usize,
        n: usize,
        _params: &Matrix,
    ) -> Result<Matrix> {
        let samples = distributions::normal_vec(mux, self.state.rng_slot_x_noise, 0.0, self.sigma, n)?;
        let _ = i;
        Ok(Matrix::from_row_slice(1, n, &samples))
    }

    fn noise_free_measurement(&self, _i: usize, x: &Matrix) -> Result<Matrix> {
        Ok(x.map(|xi| xi * xi / 20.0))
    }

    fn draw_measurement_noise(
        &self,
        mux: &mut RngMultiplexer,
        i: usize,
        n: usize,
        _params: &Matrix,
    ) -> Result<Matrix> {
        let samples = distributions::normal_vec(mux, self.state.rng_slot_y_noise, 0.0, self.sigma, n)?;
        let _ = i;
        Ok(Matrix::from_row_slice(1, n, &samples))
    }

    fn probability_of(&self, y: &Matrix, x: &Matrix, i: usize, _params: &Matrix) -> Result<f64> {
        let mean = self.noise_free_measurement(i, x)?;
        Ok(gaussian_isotropic_density(y, &mean, self.sigma))
    }

    fn initial_state_sample(&self, mux: &mut RngMultiplexer) -> Result<Matrix> {
        let v = distributions::normal(mux, self.state.rng_slot_x_noise, self.initial_x_mean, self.initial_x_std)?;
        Ok(Matrix::from_row_slice(1, 1, &[v]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_is_deterministic_given_same_inputs() {
        let grid = TimeGrid::from_span(0.0, 10.0, 1.0).unwrap();
        let sys = SimpleSystem::with_textbook_coefficients(grid, 1.0, 0.0, 1.0, 4, 5);
        let x = Matrix::from_row_slice(1, 1, &[2.0]);
        let params = sys.state().parameters.clone();
        let a = sys.drift(2, &x, &params, None).unwrap();
        let b = sys.drift(2, &x, &params, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn measurement_is_the_squared_state_over_twenty() {
        let grid = TimeGrid::from_span(0.0, 10.0, 1.0).unwrap();
        let sys = SimpleSystem::with_textbook_coefficients(grid, 1.0, 0.0, 1.0, 4, 5);
        let x = Matrix::from_row_slice(1, 1, &[4.0]);
        let y = sys.noise_free_measurement(1, &x).unwrap();
        assert_eq!(y[(0, 0)], 16.0 / 20.0);
    }
}
