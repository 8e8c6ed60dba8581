//! Plain-text file output for a [`ParticleFilter`] run (spec §6 "File
//! outputs"), built on the same whitespace/newline ASCII convention as
//! [`crate::matrix::io`] — ``%.17g`` for doubles (satisfied by `f64`'s
//! round-tripping `Display`), ``%u`` for counts.

use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::filter::ParticleFilter;
use crate::matrix::typed::{ElementType, NumericMatrix};
use crate::matrix::Matrix;
use crate::system::GenericSystem;

fn format_double(value: f64) -> String {
    format!("{value}")
}

/// `T` blocks, each block `N x dimX` values, one particle per line, blocks
/// separated by a blank line. Each block is written through
/// [`NumericMatrix`] so the typed container remains the one codec that
/// touches the filesystem.
pub fn write_particles_to_file<S: GenericSystem>(
    pf: &ParticleFilter<S>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut f = std::fs::File::create(path)?;
    for t in 1..=pf.estimate().ncols() {
        let particles = pf.particles_at(t)?;
        let block = NumericMatrix::from_f64_matrix(&particles.transpose());
        for k in 1..=block.height() {
            writeln!(f, "{}", block.row_as_f64(k)?.into_iter().map(format_double).collect::<Vec<_>>().join(" "))?;
        }
        if t != pf.estimate().ncols() {
            writeln!(f)?;
        }
    }
    Ok(())
}

/// `T` lines of `N` weights.
pub fn write_weights_to_file<S: GenericSystem>(
    pf: &ParticleFilter<S>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut f = std::fs::File::create(path)?;
    for t in 1..=pf.estimate().ncols() {
        let weights = pf.weights_at(t)?;
        let row = NumericMatrix::from_f64_matrix(weights);
        writeln!(f, "{}", row.row_as_f64(1)?.into_iter().map(format_double).collect::<Vec<_>>().join(" "))?;
    }
    Ok(())
}

/// `T` lines of `K - 1` bin counts, mirroring `writeWeightsToFile`'s one
/// line per step.
pub fn write_histogram_to_file<S: GenericSystem>(
    pf: &ParticleFilter<S>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut f = std::fs::File::create(path)?;
    for t in 1..=pf.estimate().ncols() {
        let counts = pf.histogram_at(t)?;
        let mut row = NumericMatrix::new(ElementType::U32, counts.len(), 1);
        row.set_row(1, &counts.iter().map(|&c| c as f64).collect::<Vec<_>>())?;
        let line: Vec<String> = (1..=row.width())
            .map(|c| row.get_u32(1, c).map(|v| v.to_string()))
            .collect::<Result<_>>()?;
        writeln!(f, "{}", line.join(" "))?;
    }
    Ok(())
}

/// Three-column `t edge count` tuples suitable for a gnuplot heatmap.
pub fn write_histogram_for_gnuplot_to_file<S: GenericSystem>(
    pf: &ParticleFilter<S>,
    domain: &[f64],
    time_values: &[f64],
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut f = std::fs::File::create(path)?;
    for (t_idx, &t_value) in time_values.iter().enumerate() {
        let counts = pf.histogram_at(t_idx + 1)?;
        for (bin, &count) in counts.iter().enumerate() {
            writeln!(f, "{} {} {}", format_double(t_value), format_double(domain[bin]), count)?;
        }
    }
    Ok(())
}

/// `T` lines of `dimX` values, from the running estimate.
pub fn write_estimate_to_file<S: GenericSystem>(
    pf: &ParticleFilter<S>,
    path: impl AsRef<Path>,
) -> Result<()> {
    write_matrix_columns_as_lines(pf.estimate(), path)
}

/// As [`write_estimate_to_file`], over an arbitrary `dimX x T` matrix (the
/// system's own recorded trajectory, for `writeStateToFile`).
pub fn write_state_to_file(x: &Matrix, path: impl AsRef<Path>) -> Result<()> {
    write_matrix_columns_as_lines(x, path)
}

/// `T` lines of `dimX` values: `estimate - truth`, column by column.
pub fn write_estimation_error_to_file<S: GenericSystem>(
    pf: &ParticleFilter<S>,
    truth: &Matrix,
    path: impl AsRef<Path>,
) -> Result<()> {
    let diff = pf.estimate() - truth;
    write_matrix_columns_as_lines(&diff, path)
}

fn write_matrix_columns_as_lines(m: &Matrix, path: impl AsRef<Path>) -> Result<()> {
    NumericMatrix::from_f64_matrix(&m.transpose()).write_to_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ResamplingScheme;
    use crate::matrix::TimeGrid;
    use crate::rng::RngMultiplexer;
    use crate::system::random_walk::RandomWalk;
    use std::io::Read as _;

    #[test]
    fn writes_one_weight_line_per_step() {
        let grid = TimeGrid::from_span(1.0, 4.0, 1.0).unwrap();
        let mut system = RandomWalk::new(grid, 0.5, 0.5, 0.0, 1.0, 0, 1).unwrap();
        let mut mux = RngMultiplexer::with_default_slots(3, 5);
        let mut pf = ParticleFilter::new(&mut system, 16, ResamplingScheme::Systematic);
        pf.initialize_particle_filter(&mut mux).unwrap();
        pf.estimate_states(&mut mux).unwrap();

        let tmp = std::env::temp_dir().join("smc_weights_test.txt");
        write_weights_to_file(&pf, &tmp).unwrap();
        let mut contents = String::new();
        std::fs::File::open(&tmp).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents.lines().count(), 4);
        for line in contents.lines() {
            assert_eq!(line.split_whitespace().count(), 16);
        }
        let _ = std::fs::remove_file(&tmp);
    }
}
