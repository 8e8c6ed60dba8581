//! `NumericMatrix`: a dynamically element-typed dense container, used only
//! at the file-output/driver boundary where callers genuinely mix element
//! types (`i8`, `u8`, `i32`, `u32`, `f32`, `f64`). Internal engine numerics
//! use [`super::Matrix`] instead.

use std::io::Write;
use std::path::Path;

use crate::error::{Result, SmcError};

/// Element type tag, fixed at construction and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    I8,
    U8,
    I32,
    U32,
    F32,
    F64,
}

impl ElementType {
    fn name(self) -> &'static str {
        match self {
            ElementType::I8 => "i8",
            ElementType::U8 => "u8",
            ElementType::I32 => "i32",
            ElementType::U32 => "u32",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        }
    }
}

/// Backing storage for a [`NumericMatrix`]. One variant per supported
/// element type; width/height are implied by `Vec` length plus the
/// matrix's own `width`/`height` fields.
#[derive(Debug, Clone)]
enum Storage {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Dense, rectangular, element-type-tagged matrix with 1-based public
/// indexing. Width x height is fixed at construction; the element type is
/// immutable after construction.
#[derive(Debug, Clone)]
pub struct NumericMatrix {
    width: usize,
    height: usize,
    storage: Storage,
}

impl NumericMatrix {
    pub fn new(ty: ElementType, width: usize, height: usize) -> Self {
        let n = width * height;
        let storage = match ty {
            ElementType::I8 => Storage::I8(vec![0; n]),
            ElementType::U8 => Storage::U8(vec![0; n]),
            ElementType::I32 => Storage::I32(vec![0; n]),
            ElementType::U32 => Storage::U32(vec![0; n]),
            ElementType::F32 => Storage::F32(vec![0.0; n]),
            ElementType::F64 => Storage::F64(vec![0.0; n]),
        };
        NumericMatrix {
            width,
            height,
            storage,
        }
    }

    pub fn element_type(&self) -> ElementType {
        match &self.storage {
            Storage::I8(_) => ElementType::I8,
            Storage::U8(_) => ElementType::U8,
            Storage::I32(_) => ElementType::I32,
            Storage::U32(_) => ElementType::U32,
            Storage::F32(_) => ElementType::F32,
            Storage::F64(_) => ElementType::F64,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn count(&self) -> usize {
        self.width * self.height
    }

    fn flat_index(&self, row: usize, col: usize) -> Result<usize> {
        if row == 0 || row > self.height {
            return Err(SmcError::IndexOutOfRange {
                index: row,
                bound: self.height,
            });
        }
        if col == 0 || col > self.width {
            return Err(SmcError::IndexOutOfRange {
                index: col,
                bound: self.width,
            });
        }
        // row-major storage: row r, column c -> (r-1) * width + (c-1)
        Ok((row - 1) * self.width + (col - 1))
    }

    fn require_same_shape(&self, other: &NumericMatrix) -> Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(SmcError::ShapeMismatch {
                expected: (self.height, self.width),
                actual: (other.height, other.width),
            });
        }
        Ok(())
    }

    fn require_same_type(&self, other: &NumericMatrix) -> Result<()> {
        if self.element_type() != other.element_type() {
            return Err(SmcError::TypeMismatch {
                expected: self.element_type().name(),
                actual: other.element_type().name(),
            });
        }
        Ok(())
    }

    /// Builds a `NumericMatrix` from an f64 [`super::Matrix`], converting
    /// element-wise. Used when writing engine results to the typed
    /// boundary for file output.
    pub fn from_f64_matrix(m: &super::Matrix) -> Self {
        let mut out = NumericMatrix::new(ElementType::F64, m.ncols(), m.nrows());
        for r in 1..=m.nrows() {
            for c in 1..=m.ncols() {
                out.set_f64(r, c, m[(r - 1, c - 1)]).unwrap();
            }
        }
        out
    }

    pub fn get_f64(&self, row: usize, col: usize) -> Result<f64> {
        let idx = self.flat_index(row, col)?;
        match &self.storage {
            Storage::I8(v) => Ok(v[idx] as f64),
            Storage::U8(v) => Ok(v[idx] as f64),
            Storage::I32(v) => Ok(v[idx] as f64),
            Storage::U32(v) => Ok(v[idx] as f64),
            Storage::F32(v) => Ok(v[idx] as f64),
            Storage::F64(v) => Ok(v[idx]),
        }
    }

    pub fn set_f64(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let idx = self.flat_index(row, col)?;
        match &mut self.storage {
            Storage::F64(v) => {
                v[idx] = value;
                Ok(())
            }
            _ => Err(SmcError::TypeMismatch {
                expected: "f64",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn get_i8(&self, row: usize, col: usize) -> Result<i8> {
        let idx = self.flat_index(row, col)?;
        match &self.storage {
            Storage::I8(v) => Ok(v[idx]),
            _ => Err(SmcError::TypeMismatch {
                expected: "i8",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn set_i8(&mut self, row: usize, col: usize, value: i8) -> Result<()> {
        let idx = self.flat_index(row, col)?;
        match &mut self.storage {
            Storage::I8(v) => {
                v[idx] = value;
                Ok(())
            }
            _ => Err(SmcError::TypeMismatch {
                expected: "i8",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn get_u8(&self, row: usize, col: usize) -> Result<u8> {
        let idx = self.flat_index(row, col)?;
        match &self.storage {
            Storage::U8(v) => Ok(v[idx]),
            _ => Err(SmcError::TypeMismatch {
                expected: "u8",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn set_u8(&mut self, row: usize, col: usize, value: u8) -> Result<()> {
        let idx = self.flat_index(row, col)?;
        match &mut self.storage {
            Storage::U8(v) => {
                v[idx] = value;
                Ok(())
            }
            _ => Err(SmcError::TypeMismatch {
                expected: "u8",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn get_i32(&self, row: usize, col: usize) -> Result<i32> {
        let idx = self.flat_index(row, col)?;
        match &self.storage {
            Storage::I32(v) => Ok(v[idx]),
            _ => Err(SmcError::TypeMismatch {
                expected: "i32",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn set_i32(&mut self, row: usize, col: usize, value: i32) -> Result<()> {
        let idx = self.flat_index(row, col)?;
        match &mut self.storage {
            Storage::I32(v) => {
                v[idx] = value;
                Ok(())
            }
            _ => Err(SmcError::TypeMismatch {
                expected: "i32",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn get_u32(&self, row: usize, col: usize) -> Result<u32> {
        let idx = self.flat_index(row, col)?;
        match &self.storage {
            Storage::U32(v) => Ok(v[idx]),
            _ => Err(SmcError::TypeMismatch {
                expected: "u32",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn set_u32(&mut self, row: usize, col: usize, value: u32) -> Result<()> {
        let idx = self.flat_index(row, col)?;
        match &mut self.storage {
            Storage::U32(v) => {
                v[idx] = value;
                Ok(())
            }
            _ => Err(SmcError::TypeMismatch {
                expected: "u32",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn get_f32(&self, row: usize, col: usize) -> Result<f32> {
        let idx = self.flat_index(row, col)?;
        match &self.storage {
            Storage::F32(v) => Ok(v[idx]),
            _ => Err(SmcError::TypeMismatch {
                expected: "f32",
                actual: self.element_type().name(),
            }),
        }
    }

    pub fn set_f32(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        let idx = self.flat_index(row, col)?;
        match &mut self.storage {
            Storage::F32(v) => {
                v[idx] = value;
                Ok(())
            }
            _ => Err(SmcError::TypeMismatch {
                expected: "f32",
                actual: self.element_type().name(),
            }),
        }
    }

    /// Row `r` as a vector of `f64`, widening whatever the storage type is.
    pub fn row_as_f64(&self, r: usize) -> Result<Vec<f64>> {
        (1..=self.width).map(|c| self.get_f64(r, c)).collect()
    }

    /// Column `c` as a vector of `f64`.
    pub fn column_as_f64(&self, c: usize) -> Result<Vec<f64>> {
        (1..=self.height).map(|r| self.get_f64(r, c)).collect()
    }

    /// Overwrites row `r` from `values` (widened/narrowed into whatever the
    /// storage type is); `values.len()` must equal `width`.
    pub fn set_row(&mut self, r: usize, values: &[f64]) -> Result<()> {
        if values.len() != self.width {
            return Err(SmcError::ShapeMismatch {
                expected: (1, self.width),
                actual: (1, values.len()),
            });
        }
        for (c, &v) in values.iter().enumerate() {
            self.set_from_f64(r, c + 1, v)?;
        }
        Ok(())
    }

    /// Overwrites column `c` from `values`; `values.len()` must equal
    /// `height`.
    pub fn set_column(&mut self, c: usize, values: &[f64]) -> Result<()> {
        if values.len() != self.height {
            return Err(SmcError::ShapeMismatch {
                expected: (self.height, 1),
                actual: (values.len(), 1),
            });
        }
        for (r, &v) in values.iter().enumerate() {
            self.set_from_f64(r + 1, c, v)?;
        }
        Ok(())
    }

    /// Writes a single scalar, converting `value` into the matrix's own
    /// storage type (saturating/truncating as the target integer width
    /// requires).
    fn set_from_f64(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let idx = self.flat_index(row, col)?;
        match &mut self.storage {
            Storage::I8(v) => v[idx] = value as i8,
            Storage::U8(v) => v[idx] = value as u8,
            Storage::I32(v) => v[idx] = value as i32,
            Storage::U32(v) => v[idx] = value as u32,
            Storage::F32(v) => v[idx] = value as f32,
            Storage::F64(v) => v[idx] = value,
        }
        Ok(())
    }

    /// 1-based rank (ascending) of each element within the flattened,
    /// row-major sequence, as a same-shape `U32` matrix. Ties receive the
    /// rank of their first occurrence (spec §4.5 "rankOfElements").
    pub fn rank_of_elements(&self) -> NumericMatrix {
        let flat: Vec<f64> = match &self.storage {
            Storage::I8(v) => v.iter().map(|&x| x as f64).collect(),
            Storage::U8(v) => v.iter().map(|&x| x as f64).collect(),
            Storage::I32(v) => v.iter().map(|&x| x as f64).collect(),
            Storage::U32(v) => v.iter().map(|&x| x as f64).collect(),
            Storage::F32(v) => v.iter().map(|&x| x as f64).collect(),
            Storage::F64(v) => v.clone(),
        };
        let mut order: Vec<usize> = (0..flat.len()).collect();
        order.sort_by(|&a, &b| flat[a].partial_cmp(&flat[b]).unwrap());
        let mut ranks = vec![0u32; flat.len()];
        for (rank, &idx) in order.iter().enumerate() {
            ranks[idx] = rank as u32 + 1;
        }
        let mut out = NumericMatrix::new(ElementType::U32, self.width, self.height);
        if let Storage::U32(v) = &mut out.storage {
            v.copy_from_slice(&ranks);
        }
        out
    }

    /// In-place scalar multiply; integer storage rounds to the nearest
    /// representable value.
    pub fn multiply_scalar(&mut self, scalar: f64) {
        match &mut self.storage {
            Storage::I8(v) => v.iter_mut().for_each(|x| *x = ((*x as f64) * scalar).round() as i8),
            Storage::U8(v) => v.iter_mut().for_each(|x| *x = ((*x as f64) * scalar).round() as u8),
            Storage::I32(v) => v.iter_mut().for_each(|x| *x = ((*x as f64) * scalar).round() as i32),
            Storage::U32(v) => v.iter_mut().for_each(|x| *x = ((*x as f64) * scalar).round() as u32),
            Storage::F32(v) => v.iter_mut().for_each(|x| *x = (*x as f64 * scalar) as f32),
            Storage::F64(v) => v.iter_mut().for_each(|x| *x *= scalar),
        }
    }

    /// In-place add; `other` must share both shape and element type.
    pub fn add_matrix(&mut self, other: &NumericMatrix) -> Result<()> {
        self.require_same_shape(other)?;
        self.require_same_type(other)?;
        match (&mut self.storage, &other.storage) {
            (Storage::I8(a), Storage::I8(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x = x.wrapping_add(*y)),
            (Storage::U8(a), Storage::U8(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x = x.wrapping_add(*y)),
            (Storage::I32(a), Storage::I32(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x = x.wrapping_add(*y)),
            (Storage::U32(a), Storage::U32(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x = x.wrapping_add(*y)),
            (Storage::F32(a), Storage::F32(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x += *y),
            (Storage::F64(a), Storage::F64(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x += *y),
            _ => unreachable!("require_same_type already rejected mismatched storage"),
        }
        Ok(())
    }

    /// In-place subtract; `other` must share both shape and element type.
    pub fn subtract_matrix(&mut self, other: &NumericMatrix) -> Result<()> {
        self.require_same_shape(other)?;
        self.require_same_type(other)?;
        match (&mut self.storage, &other.storage) {
            (Storage::I8(a), Storage::I8(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x = x.wrapping_sub(*y)),
            (Storage::U8(a), Storage::U8(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x = x.wrapping_sub(*y)),
            (Storage::I32(a), Storage::I32(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x = x.wrapping_sub(*y)),
            (Storage::U32(a), Storage::U32(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x = x.wrapping_sub(*y)),
            (Storage::F32(a), Storage::F32(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x -= *y),
            (Storage::F64(a), Storage::F64(b)) => a.iter_mut().zip(b).for_each(|(x, y)| *x -= *y),
            _ => unreachable!("require_same_type already rejected mismatched storage"),
        }
        Ok(())
    }

    /// Formats row `r` (1-based) as a single whitespace-joined line, using
    /// `%.17g`-equivalent formatting for floats (satisfied by `f64`/`f32`'s
    /// round-tripping `Display`) and plain decimal for integers.
    fn format_row(&self, r: usize) -> String {
        (1..=self.width)
            .map(|c| self.format_element(r, c))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn format_element(&self, row: usize, col: usize) -> String {
        let idx = self.flat_index(row, col).expect("row/col already bounds-checked by caller");
        match &self.storage {
            Storage::I8(v) => v[idx].to_string(),
            Storage::U8(v) => v[idx].to_string(),
            Storage::I32(v) => v[idx].to_string(),
            Storage::U32(v) => v[idx].to_string(),
            Storage::F32(v) => format!("{}", v[idx]),
            Storage::F64(v) => format!("{}", v[idx]),
        }
    }

    /// Writes the full matrix, one row per line, whitespace-separated
    /// values (spec §4.5 "File output writes whitespace-separated values
    /// ... one row per line for the full-matrix form").
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut f = std::fs::File::create(path)?;
        for r in 1..=self.height {
            writeln!(f, "{}", self.format_row(r))?;
        }
        Ok(())
    }

    /// Writes row `r` (1-based) as a single line of values (the row form
    /// of spec §4.5's file output).
    pub fn write_row_to_file(&self, r: usize, path: impl AsRef<Path>) -> Result<()> {
        if r == 0 || r > self.height {
            return Err(SmcError::IndexOutOfRange {
                index: r,
                bound: self.height,
            });
        }
        let mut f = std::fs::File::create(path)?;
        writeln!(f, "{}", self.format_row(r))?;
        Ok(())
    }

    /// Writes column `c` (1-based) as a single line of values (the column
    /// form of spec §4.5's file output).
    pub fn write_column_to_file(&self, c: usize, path: impl AsRef<Path>) -> Result<()> {
        if c == 0 || c > self.width {
            return Err(SmcError::IndexOutOfRange {
                index: c,
                bound: self.width,
            });
        }
        let mut f = std::fs::File::create(path)?;
        let line: Vec<String> = (1..=self.height).map(|r| self.format_element(r, c)).collect();
        writeln!(f, "{}", line.join(" "))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_is_zero_initialized() {
        let m = NumericMatrix::new(ElementType::F64, 3, 2);
        assert_eq!(m.count(), 6);
        for c in 1..=3 {
            for r in 1..=2 {
                assert_eq!(m.get_f64(r, c).unwrap(), 0.0);
            }
        }
    }

    #[test]
    fn typed_accessor_rejects_wrong_type() {
        let mut m = NumericMatrix::new(ElementType::I32, 2, 2);
        assert!(matches!(
            m.set_f64(1, 1, 1.0),
            Err(SmcError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn index_out_of_range_rejected() {
        let m = NumericMatrix::new(ElementType::F64, 2, 2);
        assert!(matches!(
            m.get_f64(3, 1),
            Err(SmcError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn from_f64_matrix_round_trips() {
        let dm = super::super::Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let tm = NumericMatrix::from_f64_matrix(&dm);
        assert_eq!(tm.get_f64(1, 1).unwrap(), 1.0);
        assert_eq!(tm.get_f64(2, 2).unwrap(), 4.0);
    }

    #[test]
    fn set_row_and_column_round_trip() {
        let mut m = NumericMatrix::new(ElementType::F64, 3, 2);
        m.set_row(1, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(m.row_as_f64(1).unwrap(), vec![1.0, 2.0, 3.0]);
        m.set_column(2, &[9.0, 8.0]).unwrap();
        assert_eq!(m.column_as_f64(2).unwrap(), vec![9.0, 8.0]);
        assert!(matches!(
            m.set_row(1, &[1.0, 2.0]),
            Err(SmcError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn rank_of_elements_breaks_ties_by_first_occurrence() {
        let mut m = NumericMatrix::new(ElementType::F64, 4, 1);
        m.set_row(1, &[10.0, 5.0, 5.0, 1.0]).unwrap();
        let ranks = m.rank_of_elements();
        assert_eq!(ranks.element_type(), ElementType::U32);
        assert_eq!(
            (1..=4).map(|c| ranks.get_u32(1, c).unwrap()).collect::<Vec<_>>(),
            vec![4, 2, 3, 1]
        );
    }

    #[test]
    fn multiply_scalar_scales_every_element() {
        let mut m = NumericMatrix::new(ElementType::F64, 2, 1);
        m.set_row(1, &[2.0, 3.0]).unwrap();
        m.multiply_scalar(1.5);
        assert_eq!(m.row_as_f64(1).unwrap(), vec![3.0, 4.5]);
    }

    #[test]
    fn add_and_subtract_require_matching_shape_and_type() {
        let mut a = NumericMatrix::new(ElementType::F64, 2, 1);
        a.set_row(1, &[1.0, 2.0]).unwrap();
        let mut b = NumericMatrix::new(ElementType::F64, 2, 1);
        b.set_row(1, &[10.0, 20.0]).unwrap();
        a.add_matrix(&b).unwrap();
        assert_eq!(a.row_as_f64(1).unwrap(), vec![11.0, 22.0]);
        a.subtract_matrix(&b).unwrap();
        assert_eq!(a.row_as_f64(1).unwrap(), vec![1.0, 2.0]);

        let wrong_shape = NumericMatrix::new(ElementType::F64, 3, 1);
        assert!(matches!(
            a.add_matrix(&wrong_shape),
            Err(SmcError::ShapeMismatch { .. })
        ));
        let wrong_type = NumericMatrix::new(ElementType::I32, 2, 1);
        assert!(matches!(
            a.add_matrix(&wrong_type),
            Err(SmcError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn write_to_file_emits_one_row_per_line() {
        let mut m = NumericMatrix::new(ElementType::F64, 2, 2);
        m.set_row(1, &[1.0, 2.5]).unwrap();
        m.set_row(2, &[-3.0, 4.0]).unwrap();
        let tmp = std::env::temp_dir().join("smc_numeric_matrix_write_test.txt");
        m.write_to_file(&tmp).unwrap();
        let contents = std::fs::read_to_string(&tmp).unwrap();
        let parsed: Vec<Vec<f64>> = contents
            .lines()
            .map(|line| line.split_whitespace().map(|t| t.parse().unwrap()).collect())
            .collect();
        assert_eq!(parsed, vec![vec![1.0, 2.5], vec![-3.0, 4.0]]);
        let _ = std::fs::remove_file(&tmp);
    }
}
