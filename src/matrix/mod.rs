//! Dense numeric matrix used throughout the engine.
//!
//! Internal numeric computation runs on a single parameterized
//! instantiation (`Matrix`, an alias over [`nalgebra::DMatrix<f64>`]).
//! A separate dynamically element-typed variant, needed only at the
//! file-output/driver boundary where callers genuinely mix element types,
//! lives in [`typed`].

pub mod io;
pub mod typed;

use nalgebra::DMatrix;

use crate::error::{Result, SmcError};

/// The single numeric container every engine component shares: a dense
/// `f64` matrix, runtime-sized since particle count `N` and horizon `T`
/// are configured per run rather than fixed at compile time.
pub type Matrix = DMatrix<f64>;

/// 1-based scalar read: indices are 1-based at the public surface.
pub fn get(m: &Matrix, row: usize, col: usize) -> Result<f64> {
    check_index(row, m.nrows())?;
    check_index(col, m.ncols())?;
    Ok(m[(row - 1, col - 1)])
}

/// 1-based scalar write.
pub fn set(m: &mut Matrix, row: usize, col: usize, value: f64) -> Result<()> {
    check_index(row, m.nrows())?;
    check_index(col, m.ncols())?;
    m[(row - 1, col - 1)] = value;
    Ok(())
}

/// 1-based column read into an owned vector.
pub fn get_column(m: &Matrix, col: usize) -> Result<Matrix> {
    check_index(col, m.ncols())?;
    Ok(Matrix::from_column_slice(
        m.nrows(),
        1,
        m.column(col - 1).as_slice(),
    ))
}

/// 1-based column write; `v` must be a `nrows x 1` vector.
pub fn set_column(m: &mut Matrix, col: usize, v: &Matrix) -> Result<()> {
    check_index(col, m.ncols())?;
    if v.nrows() != m.nrows() || v.ncols() != 1 {
        return Err(SmcError::ShapeMismatch {
            expected: (m.nrows(), 1),
            actual: (v.nrows(), v.ncols()),
        });
    }
    m.set_column(col - 1, &v.column(0));
    Ok(())
}

/// 1-based row read into an owned `1 x ncols` vector.
pub fn get_row(m: &Matrix, row: usize) -> Result<Matrix> {
    check_index(row, m.nrows())?;
    Ok(Matrix::from_row_slice(
        1,
        m.ncols(),
        m.row(row - 1).transpose().as_slice(),
    ))
}

/// 1-based row write; `v` must be a `1 x ncols` vector.
pub fn set_row(m: &mut Matrix, row: usize, v: &Matrix) -> Result<()> {
    check_index(row, m.nrows())?;
    if v.ncols() != m.ncols() || v.nrows() != 1 {
        return Err(SmcError::ShapeMismatch {
            expected: (1, m.ncols()),
            actual: (v.nrows(), v.ncols()),
        });
    }
    m.set_row(row - 1, &v.row(0));
    Ok(())
}

/// In-place scalar multiply.
pub fn multiply_scalar(m: &mut Matrix, scalar: f64) {
    m.scale_mut(scalar);
}

/// In-place add; shapes must match exactly.
pub fn add_matrix(m: &mut Matrix, other: &Matrix) -> Result<()> {
    require_same_shape(m, other)?;
    *m += other;
    Ok(())
}

/// In-place subtract; shapes must match exactly.
pub fn subtract_matrix(m: &mut Matrix, other: &Matrix) -> Result<()> {
    require_same_shape(m, other)?;
    *m -= other;
    Ok(())
}

/// 1-based rank (ascending) of each element within the flattened
/// column-major sequence. Ties receive the rank of their first occurrence
/// (a stable sort over the flattened values).
pub fn rank_of_elements(m: &Matrix) -> Matrix {
    let flat: Vec<f64> = m.iter().copied().collect();
    let mut order: Vec<usize> = (0..flat.len()).collect();
    order.sort_by(|&a, &b| flat[a].partial_cmp(&flat[b]).unwrap());

    let mut ranks = vec![0usize; flat.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = rank + 1;
    }
    Matrix::from_iterator(m.nrows(), m.ncols(), ranks.into_iter().map(|r| r as f64))
}

fn check_index(index: usize, bound: usize) -> Result<()> {
    if index == 0 || index > bound {
        return Err(SmcError::IndexOutOfRange { index, bound });
    }
    Ok(())
}

fn require_same_shape(a: &Matrix, b: &Matrix) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(SmcError::ShapeMismatch {
            expected: a.shape(),
            actual: b.shape(),
        });
    }
    Ok(())
}

/// A strictly increasing `1 x T` row of time points, `T >= 2`.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    values: Matrix,
}

impl TimeGrid {
    /// Builds a time grid from `t0` to `t1` inclusive with step `dt`.
    pub fn from_span(t0: f64, t1: f64, dt: f64) -> Result<Self> {
        if dt <= 0.0 || t1 <= t0 {
            return Err(SmcError::ParameterOutOfDomain(format!(
                "time span must satisfy t0 < t1 and dt > 0, got t0={t0}, t1={t1}, dt={dt}"
            )));
        }
        let n = ((t1 - t0) / dt).round() as usize + 1;
        Self::from_values((0..n).map(|i| t0 + dt * i as f64).collect())
    }

    /// Builds a time grid from an explicit, already strictly increasing
    /// sequence of values.
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.len() < 2 {
            return Err(SmcError::ParameterOutOfDomain(
                "time grid requires at least two points".into(),
            ));
        }
        if values.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SmcError::ParameterOutOfDomain(
                "time grid must be strictly increasing".into(),
            ));
        }
        Ok(TimeGrid {
            values: Matrix::from_row_slice(1, values.len(), &values),
        })
    }

    pub fn len(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// 1-based lookup of `t_i`.
    pub fn at(&self, i: usize) -> Result<f64> {
        get(&self.values, 1, i)
    }

    pub fn as_matrix(&self) -> &Matrix {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn one_based_scalar_access_round_trips() {
        let mut m = Matrix::zeros(2, 3);
        set(&mut m, 2, 3, 7.5).unwrap();
        assert_relative_eq!(get(&m, 2, 3).unwrap(), 7.5);
    }

    #[test]
    fn out_of_range_index_errors() {
        let m = Matrix::zeros(2, 2);
        assert!(matches!(
            get(&m, 3, 1),
            Err(SmcError::IndexOutOfRange { index: 3, bound: 2 })
        ));
        assert!(matches!(
            get(&m, 0, 1),
            Err(SmcError::IndexOutOfRange { index: 0, bound: 2 })
        ));
    }

    #[test]
    fn column_round_trip() {
        let mut m = Matrix::zeros(3, 2);
        let v = Matrix::from_column_slice(3, 1, &[1.0, 2.0, 3.0]);
        set_column(&mut m, 1, &v).unwrap();
        assert_eq!(get_column(&m, 1).unwrap(), v);
    }

    #[test]
    fn mismatched_shape_add_errors() {
        let mut a = Matrix::zeros(2, 2);
        let b = Matrix::zeros(3, 2);
        assert!(matches!(
            add_matrix(&mut a, &b),
            Err(SmcError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rank_breaks_ties_by_first_occurrence() {
        let m = Matrix::from_row_slice(1, 4, &[10.0, 5.0, 5.0, 1.0]);
        let ranks = rank_of_elements(&m);
        assert_eq!(ranks.as_slice(), &[4.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn time_grid_rejects_non_increasing_values() {
        assert!(TimeGrid::from_values(vec![0.0, 1.0, 1.0]).is_err());
        assert!(TimeGrid::from_values(vec![0.0]).is_err());
    }

    #[test]
    fn time_grid_from_span_has_expected_length() {
        let grid = TimeGrid::from_span(0.0, 120.0, 1.0).unwrap();
        assert_eq!(grid.len(), 121);
        assert_relative_eq!(grid.at(121).unwrap(), 120.0);
    }
}
