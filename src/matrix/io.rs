//! Plain-text file output for matrices.
//!
//! No locale-dependent separators, no serialization crate: output is a
//! direct whitespace/newline separated ASCII dump, not a structured format
//! a generic serializer would buy anything for.

use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::matrix::typed::NumericMatrix;
use crate::matrix::Matrix;

/// Formats a single double the way `%.17g` would: Rust's `Display` for
/// `f64` already emits the shortest decimal that round-trips exactly, so
/// no extra precision juggling is needed to round-trip within 1 ULP.
fn format_double(value: f64) -> String {
    format!("{value}")
}

/// Writes the full matrix, one row per line, whitespace-separated values.
/// Routed through [`NumericMatrix`] so the typed container is the one
/// codec that actually touches the filesystem (spec §4.5).
pub fn write_matrix_to_file(m: &Matrix, path: impl AsRef<Path>) -> Result<()> {
    NumericMatrix::from_f64_matrix(m).write_to_file(path)
}

/// Writes row `r` (1-based) as a single line of values.
pub fn write_row_to_file(m: &Matrix, r: usize, path: impl AsRef<Path>) -> Result<()> {
    NumericMatrix::from_f64_matrix(m).write_row_to_file(r, path)
}

/// Writes row `r` (1-based) transposed: one value per line.
pub fn write_row_transposed_to_file(m: &Matrix, r: usize, path: impl AsRef<Path>) -> Result<()> {
    let row = crate::matrix::get_row(m, r)?;
    let mut f = std::fs::File::create(path)?;
    for v in row.iter() {
        writeln!(f, "{}", format_double(*v))?;
    }
    Ok(())
}

/// Writes column `c` (1-based) as a single line of values.
pub fn write_column_to_file(m: &Matrix, c: usize, path: impl AsRef<Path>) -> Result<()> {
    NumericMatrix::from_f64_matrix(m).write_column_to_file(c, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn matrix_round_trips_through_plain_text() {
        let m = Matrix::from_row_slice(2, 2, &[1.0, 2.5, -3.0, 4.0]);
        let tmp = std::env::temp_dir().join("smc_matrix_roundtrip_test.txt");
        write_matrix_to_file(&m, &tmp).unwrap();

        let mut contents = String::new();
        std::fs::File::open(&tmp)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        let parsed: Vec<Vec<f64>> = contents
            .lines()
            .map(|line| {
                line.split_whitespace()
                    .map(|tok| tok.parse::<f64>().unwrap())
                    .collect()
            })
            .collect();
        assert_eq!(parsed, vec![vec![1.0, 2.5], vec![-3.0, 4.0]]);
        let _ = std::fs::remove_file(&tmp);
    }
}
