//! Harmonic steering of oriented band responses.
//!
//! A steerable level stores `K` oriented bands at angles `pi*k/K`. Any other
//! orientation is a linear combination of them; the weights come from the
//! angular harmonics of the filters and the pseudo-inverse of the matrix
//! that evaluates those harmonics at the stored angles.

use log::warn;
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use crate::error::{PyramidError, PyramidResult};
use crate::float_trait::PyrFloat;

/// Phase convention of the harmonic basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// `(cos h*theta, sin h*theta)` pairs: symmetric filters.
    #[default]
    Even,
    /// `(sin h*theta, -cos h*theta)` pairs: antisymmetric filters.
    Odd,
}

/// Angular harmonics of a `num_orientations`-band steerable filter set.
///
/// `{1, 3, ..., K-1}` for even `K`, `{0, 2, ..., K-1}` for odd `K`.
pub fn harmonics(num_orientations: usize) -> Vec<usize> {
    if num_orientations % 2 == 0 {
        (0..num_orientations / 2).map(|k| 2 * k + 1).collect()
    } else {
        (0..num_orientations.div_ceil(2)).map(|k| 2 * k).collect()
    }
}

/// Evenly spaced steering angles `pi*k/K` for `k = 0..K`.
pub fn steering_angles<F: PyrFloat>(num_orientations: usize) -> Vec<F> {
    (0..num_orientations)
        .map(|k| F::PI() * F::usize_as(k) / F::usize_as(num_orientations))
        .collect()
}

/// Row of the harmonic basis evaluated at `angle`.
fn harmonic_row(harmonics: &[usize], angle: f64, phase: Phase) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 * harmonics.len());
    for &h in harmonics {
        let arg = h as f64 * angle;
        if h == 0 {
            row.push(1.0);
            continue;
        }
        match phase {
            Phase::Even => {
                row.push(arg.cos());
                row.push(arg.sin());
            }
            Phase::Odd => {
                row.push(arg.sin());
                row.push(-arg.cos());
            }
        }
    }
    row
}

/// Pseudo-inverse steering matrix for a harmonic set and sampling angles.
#[derive(Debug, Clone)]
pub struct SteeringMatrix<F: PyrFloat> {
    harmonics: Vec<usize>,
    angles: Vec<F>,
    phase: Phase,
    /// `numh x num_angles`: maps harmonic responses to stored bands.
    matrix: Array2<F>,
    rank: usize,
    rank_deficient: bool,
}

impl<F: PyrFloat> SteeringMatrix<F> {
    /// Steering matrix for a pyramid with `num_orientations` bands.
    pub fn for_orientations(num_orientations: usize) -> PyramidResult<Self> {
        if num_orientations == 0 {
            return Err(PyramidError::invalid("num_orientations must be >= 1"));
        }
        Self::new(
            harmonics(num_orientations),
            steering_angles(num_orientations),
            Phase::Even,
        )
    }

    /// Build the harmonic matrix at `angles` and take its pseudo-inverse.
    ///
    /// Rank deficiency is reported through the log and
    /// [`Self::is_rank_deficient`]; steering still works, with reduced
    /// angular selectivity.
    pub fn new(harmonics: Vec<usize>, angles: Vec<F>, phase: Phase) -> PyramidResult<Self> {
        if harmonics.is_empty() || angles.is_empty() {
            return Err(PyramidError::invalid(
                "steering matrix needs at least one harmonic and one angle",
            ));
        }

        let rows: Vec<Vec<f64>> = angles
            .iter()
            .map(|a| harmonic_row(&harmonics, a.as_f64(), phase))
            .collect();
        let numh = rows[0].len();
        let basis = DMatrix::from_fn(angles.len(), numh, |i, j| rows[i][j]);

        let svd = basis.svd(true, true);
        let max_sv = svd.singular_values.iter().cloned().fold(0.0f64, f64::max);
        let tolerance = max_sv * (angles.len().max(numh) as f64) * f64::EPSILON;
        let rank = svd.rank(tolerance);
        let rank_deficient = rank != numh && rank != angles.len();
        if rank_deficient {
            warn!(
                "steering matrix is rank deficient: rank {} with {} harmonic terms and {} angles",
                rank,
                numh,
                angles.len()
            );
        }

        let pinv = svd
            .pseudo_inverse(tolerance)
            .map_err(|e| PyramidError::invalid(format!("steering pseudo-inverse failed: {}", e)))?;
        let matrix = Array2::from_shape_fn((pinv.nrows(), pinv.ncols()), |(i, j)| {
            F::from_f64_c(pinv[(i, j)])
        });

        Ok(Self {
            harmonics,
            angles,
            phase,
            matrix,
            rank,
            rank_deficient,
        })
    }

    pub fn harmonics(&self) -> &[usize] {
        &self.harmonics
    }

    pub fn angles(&self) -> &[F] {
        &self.angles
    }

    pub fn matrix(&self) -> &Array2<F> {
        &self.matrix
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_rank_deficient(&self) -> bool {
        self.rank_deficient
    }

    /// Per-band weights that synthesise the response at `angle`.
    pub fn weights(&self, angle: F) -> Array1<F> {
        let row = harmonic_row(&self.harmonics, angle.as_f64(), self.phase);
        let num_bands = self.matrix.ncols();
        Array1::from_shape_fn(num_bands, |k| {
            row.iter()
                .enumerate()
                .map(|(h, &v)| F::from_f64_c(v) * self.matrix[[h, k]])
                .sum()
        })
    }
}
