//! Complex steerable pyramid construction.
//!
//! The whole decomposition happens on one centred spectrum of the input:
//!
//! 1. Split off the highpass residual and keep the lowpass part.
//! 2. For each level, multiply the lowpass spectrum by the radial highpass
//!    and one half-plane angular window per orientation; each product is
//!    inverted to give a complex (analytic) band.
//! 3. Crop the lowpass spectrum to the next, smaller region and apply that
//!    level's lowpass mask.
//! 4. The last lowpass spectrum is inverted to give the real low residual.
//!
//! Masks come from [`MaskLadder`], the same source the inverse uses.

use log::debug;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::PyramidConfig;
use crate::error::{PyramidError, PyramidResult};
use crate::float_trait::PyrFloat;
use crate::ladder::{Direction, MaskLadder};
use crate::pyramid::{ImagePyramid, PyramidType, Subband};
use crate::transforms::{apply_mask, centered_spectrum, filtered, from_centered_spectrum, Fft2dPlans};

/// Build a complex steerable pyramid with explicit parameters.
///
/// `height` oriented levels, `num_orientations` bands per level,
/// transition width `twidth` (octaves) and per-level `scale` in (0, 1).
///
/// With a single orientation the angular window is zero on its own
/// boundary, so frequencies on the vertical axis are lost and the
/// pyramid is not exactly invertible. Use two or more orientations when
/// reconstruction matters.
pub fn build_steerable<F: PyrFloat>(
    image: ArrayView2<F>,
    height: usize,
    num_orientations: usize,
    twidth: F,
    scale: F,
) -> PyramidResult<ImagePyramid<F>> {
    let config = PyramidConfig {
        pyramid_type: PyramidType::ComplexSteerable,
        height: Some(height),
        num_orientations,
        twidth,
        scale,
        ..PyramidConfig::default()
    };
    build_steerable_with(image, &config)
}

/// Build a complex steerable pyramid from a configuration.
///
/// `config.height = None` selects the maximum height for the image.
pub fn build_steerable_with<F: PyrFloat>(
    image: ArrayView2<F>,
    config: &PyramidConfig<F>,
) -> PyramidResult<ImagePyramid<F>> {
    config.validate()?;
    let (rows, cols) = image.dim();
    if rows < 2 || cols < 2 {
        return Err(PyramidError::invalid(format!(
            "image must be at least 2x2, got {}x{}",
            rows, cols
        )));
    }
    let height = config.resolve_height(rows, cols)?;
    let ladder = MaskLadder::new(
        rows,
        cols,
        height,
        config.num_orientations,
        config.twidth,
        config.scale,
    )?;
    let parallel_min_pixels = config.effective_parallel_min_pixels();

    debug!(
        "building steerable pyramid: {}x{} image, height {}, {} orientations",
        rows, cols, height, config.num_orientations
    );

    let mut planner = FftPlanner::new();
    let full_plans = Fft2dPlans::with_planner(&mut planner, rows, cols);
    let image_fft = centered_spectrum(image, &full_plans);

    let mut levels = Vec::with_capacity(height + 2);

    let mut high_fft = image_fft.clone();
    apply_mask(high_fft.view_mut(), ladder.high_mask(0).view());
    levels.push(vec![Subband::Complex(from_centered_spectrum(
        high_fft.view(),
        &full_plans,
    ))]);

    let mut low_fft = image_fft;
    apply_mask(low_fft.view_mut(), ladder.low_mask(0).view());

    for level in 1..=height {
        let region = ladder.level_region(level);
        let plans = Fft2dPlans::with_planner(&mut planner, region.rows, region.cols);
        let parallel = region.rows * region.cols >= parallel_min_pixels;
        debug!(
            "level {}: region {}x{}, {} orientations ({})",
            level,
            region.rows,
            region.cols,
            ladder.num_orientations(),
            if parallel { "parallel" } else { "sequential" }
        );

        levels.push(analyse_level(&ladder, level, low_fft.view(), &plans, parallel));

        let next = ladder.region(level);
        low_fft = region.relative(&next).view(&low_fft).to_owned();
        apply_mask(low_fft.view_mut(), ladder.low_mask(level).view());
    }

    let smallest = ladder.region(height);
    let low_plans = Fft2dPlans::with_planner(&mut planner, smallest.rows, smallest.cols);
    let low_residual = from_centered_spectrum(low_fft.view(), &low_plans).mapv(|v| v.re);
    debug!(
        "low residual: {}x{}",
        low_residual.nrows(),
        low_residual.ncols()
    );
    levels.push(vec![Subband::Real(low_residual)]);

    ImagePyramid::from_levels(
        PyramidType::ComplexSteerable,
        config.scale,
        config.num_orientations,
        config.twidth,
        levels,
    )
}

/// Oriented bands of one level from its lowpass spectrum.
fn analyse_level<F: PyrFloat>(
    ladder: &MaskLadder<F>,
    level: usize,
    low_fft: ArrayView2<Complex<F>>,
    plans: &Fft2dPlans<F>,
    parallel: bool,
) -> Vec<Subband<F>> {
    let band = |orientation: usize| -> Subband<F> {
        let filter = ladder.band_filter(level, orientation, Direction::Analysis);
        let spectrum: Array2<Complex<F>> = filtered(low_fft.view(), filter.view());
        Subband::Complex(from_centered_spectrum(spectrum.view(), plans))
    };

    let orientations = 1..=ladder.num_orientations();
    if parallel {
        orientations.into_par_iter().map(band).collect()
    } else {
        orientations.map(band).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_bump(rows: usize, cols: usize, sigma: f64) -> Array2<f64> {
        let (cr, cc) = (rows as f64 / 2.0, cols as f64 / 2.0);
        Array2::from_shape_fn((rows, cols), |(r, c)| {
            let dr = r as f64 - cr;
            let dc = c as f64 - cc;
            (-(dr * dr + dc * dc) / (2.0 * sigma * sigma)).exp()
        })
    }

    #[test]
    fn test_level_layout_64() {
        let image = gaussian_bump(64, 64, 6.0);
        let pyr = build_steerable(image.view(), 3, 4, 1.0, 0.5).unwrap();

        assert_eq!(pyr.num_levels(), 3);
        assert_eq!(pyr.num_orientations(), 4);
        assert_eq!(pyr.len(), 5);
        assert_eq!(pyr.subband(0, None).unwrap().shape(), (64, 64));
        for (level, size) in [(1, 64), (2, 32), (3, 16)] {
            for o in 1..=4 {
                let band = pyr.subband(level, Some(o)).unwrap();
                assert!(band.is_complex());
                assert_eq!(band.shape(), (size, size));
            }
        }
        let low = pyr.subband(4, None).unwrap();
        assert!(!low.is_complex());
        assert_eq!(low.shape(), (8, 8));
    }

    #[test]
    fn test_shapes_shrink_monotonically() {
        let image = Array2::from_shape_fn((48, 40), |(r, c)| ((r * 5 + c * 3) % 7) as f64);
        let pyr = build_steerable(image.view(), 2, 2, 1.0, 0.5).unwrap();
        let shapes = pyr.level_shapes();
        assert_eq!(shapes[0], (48, 40));
        for pair in shapes.windows(2) {
            assert!(pair[1].0 <= pair[0].0 && pair[1].1 <= pair[0].1);
        }
    }

    #[test]
    fn test_constant_image_lands_in_low_residual() {
        let image = Array2::from_elem((32, 32), 3.0f64);
        let pyr = build_steerable(image.view(), 2, 4, 1.0, 0.5).unwrap();

        let high = pyr.subband(0, None).unwrap().magnitude();
        assert!(high.iter().all(|&v| v < 1e-12));
        for level in 1..=2 {
            for o in 1..=4 {
                let band = pyr.subband(level, Some(o)).unwrap().magnitude();
                assert!(band.iter().all(|&v| v < 1e-12));
            }
        }
        // the DC coefficient survives the crops unnormalised
        let low = pyr.subband(3, None).unwrap().to_real();
        let expected = 3.0 * (32.0 * 32.0) / (8.0 * 8.0);
        assert!(low.iter().all(|&v| (v - expected).abs() < 1e-9));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let image = gaussian_bump(64, 64, 4.0);
        let mut config = PyramidConfig::new();
        config.height = Some(2);
        config.parallel_min_pixels = usize::MAX;
        let sequential = build_steerable_with(image.view(), &config).unwrap();
        config.parallel_min_pixels = 0;
        let parallel = build_steerable_with(image.view(), &config).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let image = Array2::<f64>::zeros((64, 64));
        for result in [
            build_steerable(image.view(), 2, 0, 1.0, 0.5),
            build_steerable(image.view(), 2, 4, 0.0, 0.5),
            build_steerable(image.view(), 2, 4, 1.0, 1.5),
            build_steerable(image.view(), 5, 4, 1.0, 0.5),
        ] {
            assert!(matches!(result, Err(PyramidError::InvalidParameter(_))));
        }
        let tiny = Array2::<f64>::zeros((1, 8));
        assert!(build_steerable(tiny.view(), 0, 4, 1.0, 0.5).is_err());
    }

    #[test]
    fn test_height_zero_keeps_residuals_only() {
        let image = gaussian_bump(16, 16, 2.0);
        let pyr = build_steerable(image.view(), 0, 4, 1.0, 0.5).unwrap();
        assert_eq!(pyr.len(), 2);
        assert_eq!(pyr.subband(1, None).unwrap().shape(), (16, 16));
    }
}
