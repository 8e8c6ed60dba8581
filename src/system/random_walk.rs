//! The random-walk reference system (spec §4.1 "RandomWalk"), grounded on
//! `examples/original_source/RandomWalk.h`: a scalar Gaussian random walk
//! observed with additive Gaussian noise, used both as the Kalman-filter
//! cross-check target and as the SPSA worked example.
//!
//! `x(t+1) = x(t) + v(t)`, `y(t) = x(t) + w(t)`, with independently
//! configurable process/measurement noise *variances* (matching the
//! original's `processNoise`/`measurementNoise` ivars, which are variances,
//! not standard deviations).

use crate::distributions;
use crate::error::{Result, SmcError};
use crate::matrix::{Matrix, TimeGrid};
use crate::rng::RngMultiplexer;
use crate::system::{gaussian_isotropic_density, GenericSystem, SystemDims, SystemState};

pub struct RandomWalk {
    state: SystemState,
    measurement_noise_variance: f64,
    initial_x_mean: f64,
    initial_x_std: f64,
}

impl RandomWalk {
    pub const DIM_X: usize = 1;
    pub const DIM_U: usize = 0;
    pub const DIM_Y: usize = 1;
    pub const DIM_X_NOISE: usize = 1;
    pub const DIM_Y_NOISE: usize = 1;

    pub fn new(
        time_span: TimeGrid,
        process_noise_variance: f64,
        measurement_noise_variance: f64,
        initial_x_mean: f64,
        initial_x_std: f64,
        rng_slot_x_noise: usize,
        rng_slot_y_noise: usize,
    ) -> Result<Self> {
        if process_noise_variance < 0.0 || measurement_noise_variance < 0.0 {
            return Err(SmcError::ParameterOutOfDomain(
                "noise variances must be non-negative".into(),
            ));
        }
        let dims = SystemDims {
            dim_x: Self::DIM_X,
            dim_u: Self::DIM_U,
            dim_y: Self::DIM_Y,
            dim_x_noise: Self::DIM_X_NOISE,
            dim_y_noise: Self::DIM_Y_NOISE,
        };
        // The process noise variance is RandomWalk's one estimable
        // parameter (the SPSA worked example varies it), so it lives in the
        // `P = 1` parameter column rather than a plain field.
        let parameters = Matrix::from_column_slice(1, 1, &[process_noise_variance]);
        Ok(RandomWalk {
            state: SystemState::new(time_span, dims, parameters, rng_slot_x_noise, rng_slot_y_noise),
            measurement_noise_variance,
            initial_x_mean,
            initial_x_std,
        })
    }

    pub fn set_process_noise(&mut self, var: f64) -> Result<()> {
        if var < 0.0 {
            return Err(SmcError::ParameterOutOfDomain(
                "process noise variance must be non-negative".into(),
            ));
        }
        self.state.parameters[(0, 0)] = var;
        Ok(())
    }

    pub fn process_noise(&self) -> f64 {
        self.state.parameters[(0, 0)]
    }

    pub fn set_measurement_noise(&mut self, var: f64) -> Result<()> {
        if var < 0.0 {
            return Err(SmcError::ParameterOutOfDomain(
                "measurement noise variance must be non-negative".into(),
            ));
        }
        self.measurement_noise_variance = var;
        Ok(())
    }

    pub fn measurement_noise(&self) -> f64 {
        self.measurement_noise_variance
    }
}

impl GenericSystem for RandomWalk {
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

    fn drift(&self, _i: usize, x: &Matrix, _params: &Matrix, _u: Option<&Matrix>) -> Result<Matrix> {
        Ok(x.clone())
    }

    fn draw_process_noise(
        &self,
        mux: &mut RngMultiplexer,
        _i: usize,
        n: usize,
        params: &Matrix,
    ) -> Result<Matrix> {
        let std_dev = params[(0, 0)].sqrt();
        let samples = distributions::normal_vec(mux, self.state.rng_slot_x_noise, 0.0, std_dev, n)?;
        Ok(Matrix::from_row_slice(1, n, &samples))
    }

    fn noise_free_measurement(&self, _i: usize, x: &Matrix) -> Result<Matrix> {
        Ok(x.clone())
    }

    fn draw_measurement_noise(
        &self,
        mux: &mut RngMultiplexer,
        _i: usize,
        n: usize,
        _params: &Matrix,
    ) -> Result<Matrix> {
        let std_dev = self.measurement_noise_variance.sqrt();
        let samples = distributions::normal_vec(mux, self.state.rng_slot_y_noise, 0.0, std_dev, n)?;
        Ok(Matrix::from_row_slice(1, n, &samples))
    }

    fn probability_of(&self, y: &Matrix, x: &Matrix, i: usize, _params: &Matrix) -> Result<f64> {
        let mean = self.noise_free_measurement(i, x)?;
        Ok(gaussian_isotropic_density(
            y,
            &mean,
            self.measurement_noise_variance.sqrt(),
        ))
    }

    fn initial_state_sample(&self, mux: &mut RngMultiplexer) -> Result<Matrix> {
        let v = distributions::normal(
            mux,
            self.state.rng_slot_x_noise,
            self.initial_x_mean,
            self.initial_x_std,
        )?;
        Ok(Matrix::from_row_slice(1, 1, &[v]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_variance_is_rejected() {
        let grid = TimeGrid::from_span(0.0, 10.0, 1.0).unwrap();
        assert!(RandomWalk::new(grid, -1.0, 1.0, 0.0, 1.0, 0, 1).is_err());
    }

    #[test]
    fn drift_is_identity() {
        let grid = TimeGrid::from_span(0.0, 10.0, 1.0).unwrap();
        let sys = RandomWalk::new(grid, 1.0, 1.0, 0.0, 1.0, 0, 1).unwrap();
        let x = Matrix::from_row_slice(1, 1, &[3.5]);
        let params = sys.state().parameters.clone();
        assert_eq!(sys.drift(2, &x, &params, None).unwrap(), x);
    }
}
