//! Spatial-domain Gaussian and Laplacian pyramids.
//!
//! Both use the 5-tap binomial kernel `[1, 4, 6, 4, 1] / 16`, applied
//! separably with reflect boundaries. Reduction blurs and keeps every other
//! sample (`ceil(n / 2)` output samples); expansion inserts zeros to the
//! target size and blurs with a gain of 2 per axis.

use log::debug;
use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{PyramidError, PyramidResult};
use crate::float_trait::PyrFloat;
use crate::grid::max_pyramid_height;
use crate::pyramid::{ImagePyramid, PyramidType, Subband};

// =============================================================================
// Constants
// =============================================================================

/// Binomial taps, normalised by [`BINOMIAL_NORM`].
const BINOMIAL_TAPS: [f64; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];
const BINOMIAL_NORM: f64 = 16.0;

/// Spatial pyramids always halve.
pub(crate) const SPATIAL_SCALE: f64 = 0.5;

/// Transition width recorded on spatial pyramids; unused by them.
const SPATIAL_TWIDTH: f64 = 1.0;

// =============================================================================
// Separable filtering
// =============================================================================

fn binomial_kernel<F: PyrFloat>(gain: F) -> [F; 5] {
    let norm = F::from_f64_c(BINOMIAL_NORM);
    BINOMIAL_TAPS.map(|t| F::from_f64_c(t) * gain / norm)
}

/// Reflect index for boundary handling (edge sample repeated).
/// reflect(-1) = 0, reflect(-2) = 1, reflect(n) = n-1, reflect(n+1) = n-2
#[inline(always)]
fn reflect_index(idx: isize, len: usize) -> usize {
    let n = len as isize;
    if idx < 0 {
        (-idx - 1).min(n - 1) as usize
    } else if idx >= n {
        let excess = idx - n;
        (n - 2 - excess).max(0) as usize
    } else {
        idx as usize
    }
}

/// Convolve every lane along `axis` with `kernel`, reflect boundaries.
fn convolve_axis<F: PyrFloat>(input: ArrayView2<F>, kernel: &[F; 5], axis: Axis) -> Array2<F> {
    let radius = (kernel.len() / 2) as isize;
    let mut output = Array2::zeros(input.dim());
    for (in_lane, mut out_lane) in input.lanes(axis).into_iter().zip(output.lanes_mut(axis)) {
        let n = in_lane.len();
        for i in 0..n {
            let mut sum = F::zero();
            for (k, &w) in kernel.iter().enumerate() {
                let src = reflect_index(i as isize + k as isize - radius, n);
                sum += w * in_lane[src];
            }
            out_lane[i] = sum;
        }
    }
    output
}

/// Separable binomial blur; `gain` multiplies each 1-D pass.
pub fn binomial_blur<F: PyrFloat>(image: ArrayView2<F>, gain: F) -> Array2<F> {
    let kernel = binomial_kernel(gain);
    let rows_done = convolve_axis(image, &kernel, Axis(1));
    convolve_axis(rows_done.view(), &kernel, Axis(0))
}

/// Blur then keep every other sample in both directions.
pub fn reduce<F: PyrFloat>(image: ArrayView2<F>) -> Array2<F> {
    let blurred = binomial_blur(image, F::one());
    let (rows, cols) = image.dim();
    Array2::from_shape_fn((rows.div_ceil(2), cols.div_ceil(2)), |(r, c)| {
        blurred[[2 * r, 2 * c]]
    })
}

/// Zero-insertion upsample to `shape`, then blur with gain 2 per axis.
pub fn expand<F: PyrFloat>(image: ArrayView2<F>, shape: (usize, usize)) -> Array2<F> {
    let mut upsampled = Array2::zeros(shape);
    for ((r, c), &v) in image.indexed_iter() {
        if 2 * r < shape.0 && 2 * c < shape.1 {
            upsampled[[2 * r, 2 * c]] = v;
        }
    }
    binomial_blur(upsampled.view(), F::from_f64_c(2.0))
}

// =============================================================================
// Pyramids
// =============================================================================

fn check_height<F: PyrFloat>(image: ArrayView2<F>, height: usize) -> PyramidResult<()> {
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 {
        return Err(PyramidError::invalid("image must not be empty"));
    }
    let max_height = max_pyramid_height(rows, cols, F::from_f64_c(SPATIAL_SCALE));
    if height > max_height {
        return Err(PyramidError::invalid(format!(
            "height {} exceeds the maximum {} for a {}x{} image",
            height, max_height, rows, cols
        )));
    }
    Ok(())
}

/// Gaussian levels `G_0 = image`, `G_k = reduce(G_{k-1})` for `k = 1..=height+1`.
fn gaussian_levels<F: PyrFloat>(image: ArrayView2<F>, height: usize) -> Vec<Array2<F>> {
    let mut levels = Vec::with_capacity(height + 2);
    levels.push(image.to_owned());
    for _ in 0..=height {
        let next = match levels.last() {
            Some(prev) => reduce(prev.view()),
            None => break,
        };
        levels.push(next);
    }
    levels
}

fn assemble<F: PyrFloat>(
    pyramid_type: PyramidType,
    levels: Vec<Array2<F>>,
) -> PyramidResult<ImagePyramid<F>> {
    ImagePyramid::from_levels(
        pyramid_type,
        F::from_f64_c(SPATIAL_SCALE),
        1,
        F::from_f64_c(SPATIAL_TWIDTH),
        levels.into_iter().map(|l| vec![Subband::Real(l)]).collect(),
    )
}

/// Build a Gaussian pyramid with `height` levels between the residuals.
pub fn build_gaussian<F: PyrFloat>(image: ArrayView2<F>, height: usize) -> PyramidResult<ImagePyramid<F>> {
    check_height(image, height)?;
    debug!(
        "building gaussian pyramid: {}x{} image, height {}",
        image.nrows(),
        image.ncols(),
        height
    );
    assemble(PyramidType::Gaussian, gaussian_levels(image, height))
}

/// Build a Laplacian pyramid: `L_k = G_k - expand(G_{k+1})`, last level `G_{height+1}`.
pub fn build_laplacian<F: PyrFloat>(image: ArrayView2<F>, height: usize) -> PyramidResult<ImagePyramid<F>> {
    check_height(image, height)?;
    debug!(
        "building laplacian pyramid: {}x{} image, height {}",
        image.nrows(),
        image.ncols(),
        height
    );
    let gaussian = gaussian_levels(image, height);
    let mut levels = Vec::with_capacity(gaussian.len());
    for pair in gaussian.windows(2) {
        let (fine, coarse) = (&pair[0], &pair[1]);
        levels.push(fine - &expand(coarse.view(), fine.dim()));
    }
    if let Some(coarsest) = gaussian.last() {
        levels.push(coarsest.clone());
    }
    assemble(PyramidType::Laplacian, levels)
}

/// Collapse a Laplacian pyramid, coarsest level first.
///
/// `keep(level)` decides whether a level contributes; dropped levels count
/// as zero.
pub(crate) fn collapse_laplacian<F: PyrFloat>(
    pyramid: &ImagePyramid<F>,
    keep: impl Fn(usize) -> bool,
) -> PyramidResult<Array2<F>> {
    let top = pyramid.num_levels() + 1;
    let band = |level: usize| -> PyramidResult<Array2<F>> {
        let values = pyramid.subband(level, None)?;
        Ok(if keep(level) {
            values.to_real()
        } else {
            Array2::zeros(values.shape())
        })
    };

    let mut image = band(top)?;
    for level in (0..top).rev() {
        let detail = band(level)?;
        let dim = detail.dim();
        image = detail + &expand(image.view(), dim);
    }
    Ok(image)
}

/// Invert a Laplacian pyramid.
pub fn reconstruct_laplacian<F: PyrFloat>(pyramid: &ImagePyramid<F>) -> PyramidResult<Array2<F>> {
    expect_type(pyramid, PyramidType::Laplacian)?;
    collapse_laplacian(pyramid, |_| true)
}

/// A Gaussian pyramid's reconstruction is its full-resolution level.
pub fn reconstruct_gaussian<F: PyrFloat>(pyramid: &ImagePyramid<F>) -> PyramidResult<Array2<F>> {
    expect_type(pyramid, PyramidType::Gaussian)?;
    Ok(pyramid.subband(0, None)?.to_real())
}

fn expect_type<F: PyrFloat>(pyramid: &ImagePyramid<F>, expected: PyramidType) -> PyramidResult<()> {
    if pyramid.pyramid_type() != expected {
        return Err(PyramidError::invalid(format!(
            "expected a {} pyramid, got {}",
            expected,
            pyramid.pyramid_type()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;

    // Helper: Simple Linear Congruential Generator for deterministic "random" test data
    struct SimpleLcg {
        state: u64,
    }

    impl SimpleLcg {
        fn new(seed: u64) -> Self {
            Self { state: seed }
        }

        fn next_f64(&mut self) -> f64 {
            self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((self.state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        }
    }

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut rng = SimpleLcg::new(seed);
        Array2::from_shape_fn((rows, cols), |_| rng.next_f64())
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 5), 0);
        assert_eq!(reflect_index(-2, 5), 1);
        assert_eq!(reflect_index(5, 5), 4);
        assert_eq!(reflect_index(6, 5), 3);
        assert_eq!(reflect_index(2, 5), 2);
        assert_eq!(reflect_index(-2, 1), 0);
        assert_eq!(reflect_index(2, 1), 0);
    }

    #[test]
    fn test_blur_preserves_constant() {
        let image = Array2::from_elem((7, 9), 2.5f64);
        let blurred = binomial_blur(image.view(), 1.0);
        assert!(blurred.iter().all(|&v| (v - 2.5).abs() < 1e-12));
    }

    #[test]
    fn test_gaussian_shapes_halve_with_ceil() {
        let image = random_matrix(45, 64, 1);
        let pyr = build_gaussian(image.view(), 3).unwrap();
        assert_eq!(pyr.pyramid_type(), PyramidType::Gaussian);
        assert_eq!(pyr.num_levels(), 3);
        assert_eq!(
            pyr.level_shapes(),
            vec![(45, 64), (23, 32), (12, 16), (6, 8), (3, 4)]
        );
        assert_eq!(reconstruct_gaussian(&pyr).unwrap(), image);
    }

    #[test]
    fn test_laplacian_roundtrip_exact() {
        for (rows, cols) in [(64, 64), (45, 37), (32, 50)] {
            let image = random_matrix(rows, cols, (rows * cols) as u64);
            let pyr = build_laplacian(image.view(), 2).unwrap();
            let back = reconstruct_laplacian(&pyr).unwrap();
            let max_diff = image
                .iter()
                .zip(back.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0f64, f64::max);
            assert!(max_diff < 1e-10, "{}x{}: {}", rows, cols, max_diff);
        }
    }

    #[test]
    fn test_collapse_expands_to_each_detail_shape() {
        let image = random_matrix(33, 47, 9);
        let pyr = build_laplacian(image.view(), 2).unwrap();

        let none = collapse_laplacian(&pyr, |_| false).unwrap();
        assert_eq!(none.dim(), (33, 47));
        assert!(none.iter().all(|&v| v == 0.0));

        let fine = collapse_laplacian(&pyr, |level| level == 0).unwrap();
        assert_eq!(fine, pyr.subband(0, None).unwrap().to_real());

        let all = collapse_laplacian(&pyr, |_| true).unwrap();
        assert_eq!(all, reconstruct_laplacian(&pyr).unwrap());
    }

    #[test]
    fn test_laplacian_details_vanish_on_constant() {
        let image = Array2::from_elem((32, 32), 1.0f64);
        let pyr = build_laplacian(image.view(), 2).unwrap();
        // reflect boundaries bias the expanded border; the interior is flat
        let detail = pyr.subband(0, None).unwrap().to_real();
        assert!(detail.slice(s![2..30, 2..30]).iter().all(|&v| v.abs() < 1e-12));
        let top = pyr.subband(3, None).unwrap().to_real();
        assert_eq!(top.dim(), (4, 4));
        assert!(top.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_height_limit() {
        let image = random_matrix(16, 16, 3);
        assert!(build_gaussian(image.view(), 2).is_ok());
        assert!(matches!(
            build_laplacian(image.view(), 3),
            Err(PyramidError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let image = random_matrix(16, 16, 4);
        let pyr = build_gaussian(image.view(), 1).unwrap();
        assert!(reconstruct_laplacian(&pyr).is_err());
    }
}
