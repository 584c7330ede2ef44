//! Pyramid inversion.
//!
//! [`reconstruct`] dispatches on the pyramid type. The steerable inverse
//! works on a real-band copy of the pyramid and accumulates every level's
//! contribution into one full-resolution centred spectrum:
//!
//! 1. Low residual spectrum times its lowpass mask, placed at the smallest
//!    region.
//! 2. Coarsest to finest: add each orientation's band spectrum times its
//!    synthesis filter, then apply that region's lowpass mask.
//! 3. Add the highpass residual through the base highpass mask and invert.

use log::{debug, warn};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::PyramidConfig;
use crate::error::{PyramidError, PyramidResult};
use crate::float_trait::PyrFloat;
use crate::ladder::{Direction, MaskLadder};
use crate::pyramid::{ImagePyramid, PyramidType};
use crate::real_bands::to_real_bands;
use crate::spatial::{collapse_laplacian, reconstruct_gaussian, reconstruct_laplacian};
use crate::transforms::{apply_mask, centered_spectrum, filtered, from_centered_spectrum, Fft2dPlans};

/// Subset of subbands that contributes to a partial reconstruction.
///
/// `None` selects everything along that axis. Orientations only filter the
/// oriented levels of a steerable pyramid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BandSelection {
    pub levels: Option<Vec<usize>>,
    pub orientations: Option<Vec<usize>>,
}

impl BandSelection {
    /// Every subband.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_levels(levels: impl IntoIterator<Item = usize>) -> Self {
        Self {
            levels: Some(levels.into_iter().collect()),
            orientations: None,
        }
    }

    pub fn with_orientations(mut self, orientations: impl IntoIterator<Item = usize>) -> Self {
        self.orientations = Some(orientations.into_iter().collect());
        self
    }

    pub fn includes_level(&self, level: usize) -> bool {
        self.levels.as_ref().map_or(true, |l| l.contains(&level))
    }

    pub fn includes_orientation(&self, orientation: usize) -> bool {
        self.orientations
            .as_ref()
            .map_or(true, |o| o.contains(&orientation))
    }

    /// Reject levels or orientations the pyramid does not have.
    pub fn validate<F: PyrFloat>(&self, pyramid: &ImagePyramid<F>) -> PyramidResult<()> {
        let top = pyramid.num_levels() + 1;
        if let Some(levels) = &self.levels {
            if let Some(&bad) = levels.iter().find(|&&l| l > top) {
                return Err(PyramidError::index(
                    bad,
                    None,
                    format!("selected level must be in 0..={}", top),
                ));
            }
        }
        if let Some(orientations) = &self.orientations {
            let k = pyramid.num_orientations();
            if let Some(&bad) = orientations.iter().find(|&&o| o == 0 || o > k) {
                return Err(PyramidError::index(
                    1,
                    Some(bad),
                    format!("selected orientation must be in 1..={}", k),
                ));
            }
        }
        Ok(())
    }
}

/// Invert a pyramid of any supported type.
pub fn reconstruct<F: PyrFloat>(pyramid: &ImagePyramid<F>) -> PyramidResult<Array2<F>> {
    reconstruct_with(pyramid, &PyramidConfig::default())
}

/// Invert a pyramid, taking the parallel threshold from `config`.
///
/// Only `parallel_min_pixels` (and its environment overrides) is read; the
/// transform parameters come from the pyramid itself.
pub fn reconstruct_with<F: PyrFloat>(
    pyramid: &ImagePyramid<F>,
    config: &PyramidConfig<F>,
) -> PyramidResult<Array2<F>> {
    match pyramid.pyramid_type() {
        PyramidType::ComplexSteerable => reconstruct_steerable(
            pyramid,
            &BandSelection::all(),
            config.effective_parallel_min_pixels(),
        ),
        PyramidType::Laplacian => reconstruct_laplacian(pyramid),
        PyramidType::Gaussian => reconstruct_gaussian(pyramid),
    }
}

/// Reconstruct from a subset of subbands; the rest count as zero.
pub fn reconstruct_selected<F: PyrFloat>(
    pyramid: &ImagePyramid<F>,
    selection: &BandSelection,
) -> PyramidResult<Array2<F>> {
    selection.validate(pyramid)?;
    match pyramid.pyramid_type() {
        PyramidType::ComplexSteerable => reconstruct_steerable(
            pyramid,
            selection,
            PyramidConfig::<F>::default().effective_parallel_min_pixels(),
        ),
        PyramidType::Laplacian => collapse_laplacian(pyramid, |level| selection.includes_level(level)),
        PyramidType::Gaussian => {
            let full = reconstruct_gaussian(pyramid)?;
            if selection.includes_level(0) {
                Ok(full)
            } else {
                Ok(Array2::zeros(full.dim()))
            }
        }
    }
}

fn reconstruct_steerable<F: PyrFloat>(
    pyramid: &ImagePyramid<F>,
    selection: &BandSelection,
    parallel_min_pixels: usize,
) -> PyramidResult<Array2<F>> {
    let (rows, cols) = pyramid.image_shape();
    let num_levels = pyramid.num_levels();
    let num_orientations = pyramid.num_orientations();

    let edited = (1..=num_levels)
        .flat_map(|level| (1..=num_orientations).map(move |o| (level, o)))
        .filter(|&(level, o)| {
            pyramid
                .subband(level, Some(o))
                .map(|b| !b.is_complex())
                .unwrap_or(false)
        })
        .count();
    if edited > 0 {
        warn!(
            "{} oriented bands hold real values and are used without half-plane conversion",
            edited
        );
    }

    let real = to_real_bands(pyramid)?;
    let ladder = MaskLadder::new(
        rows,
        cols,
        num_levels,
        num_orientations,
        pyramid.twidth(),
        pyramid.scale(),
    )?;
    debug!(
        "reconstructing steerable pyramid: {}x{} image, height {}, {} orientations",
        rows, cols, num_levels, num_orientations
    );

    let mut planner = FftPlanner::new();
    let mut spectrum = Array2::from_elem((rows, cols), Complex::new(F::zero(), F::zero()));

    let smallest = ladder.region(num_levels);
    if selection.includes_level(num_levels + 1) {
        let low = real.subband(num_levels + 1, None)?.to_real();
        expect_shape(smallest.dim(), low.dim())?;
        let plans = Fft2dPlans::with_planner(&mut planner, smallest.rows, smallest.cols);
        let mut low_fft = centered_spectrum(low.view(), &plans);
        apply_mask(low_fft.view_mut(), ladder.low_mask(num_levels).view());
        smallest.view_mut(&mut spectrum).assign(&low_fft);
    }

    for level in (1..=num_levels).rev() {
        let region = ladder.level_region(level);
        let plans = Fft2dPlans::with_planner(&mut planner, region.rows, region.cols);
        debug!("level {}: region {}x{}", level, region.rows, region.cols);

        if selection.includes_level(level) {
            let mut bands = Vec::with_capacity(num_orientations);
            for o in (1..=num_orientations).filter(|&o| selection.includes_orientation(o)) {
                let band = real.subband(level, Some(o))?.to_real();
                expect_shape(region.dim(), band.dim())?;
                bands.push((o, band));
            }
            let parallel = region.rows * region.cols >= parallel_min_pixels;
            let contributions = synthesise_level(&ladder, level, &bands, &plans, parallel);

            let mut target = region.view_mut(&mut spectrum);
            for contribution in &contributions {
                target += contribution;
            }
        }

        apply_mask(region.view_mut(&mut spectrum), ladder.low_mask(level - 1).view());
    }

    let full_plans = Fft2dPlans::with_planner(&mut planner, rows, cols);
    if selection.includes_level(0) {
        let high = real.subband(0, None)?.to_real();
        expect_shape((rows, cols), high.dim())?;
        let mut high_fft = centered_spectrum(high.view(), &full_plans);
        apply_mask(high_fft.view_mut(), ladder.high_mask(0).view());
        spectrum += &high_fft;
    }

    Ok(from_centered_spectrum(spectrum.view(), &full_plans).mapv(|v| v.re))
}

/// Per-orientation spectral contributions, in orientation order.
fn synthesise_level<F: PyrFloat>(
    ladder: &MaskLadder<F>,
    level: usize,
    bands: &[(usize, Array2<F>)],
    plans: &Fft2dPlans<F>,
    parallel: bool,
) -> Vec<Array2<Complex<F>>> {
    let contribution = |(orientation, band): &(usize, Array2<F>)| -> Array2<Complex<F>> {
        let band_fft = centered_spectrum(band.view(), plans);
        let filter = ladder.band_filter(level, *orientation, Direction::Synthesis);
        filtered(band_fft.view(), filter.view())
    };
    if parallel {
        bands.par_iter().map(contribution).collect()
    } else {
        bands.iter().map(contribution).collect()
    }
}

fn expect_shape(expected: (usize, usize), actual: (usize, usize)) -> PyramidResult<()> {
    if expected != actual {
        return Err(PyramidError::ShapeMismatch { expected, actual });
    }
    Ok(())
}

/// Largest absolute difference between two equally shaped arrays.
pub fn max_abs_error<F: PyrFloat>(a: ArrayView2<F>, b: ArrayView2<F>) -> F {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y).abs())
        .fold(F::zero(), F::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{build_gaussian, build_laplacian};
    use crate::steerable::build_steerable;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn init_logger() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();
    }

    fn random_image(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((rows, cols), |_| rng.gen::<f64>())
    }

    fn gaussian_bump(size: usize, sigma: f64) -> Array2<f64> {
        let c = size as f64 / 2.0;
        Array2::from_shape_fn((size, size), |(r, col)| {
            let (dr, dc) = (r as f64 - c, col as f64 - c);
            (-(dr * dr + dc * dc) / (2.0 * sigma * sigma)).exp()
        })
    }

    #[test]
    fn test_steerable_roundtrip_heights_and_orientations() {
        init_logger();
        let image = random_image(32, 32, 7);
        for height in 1..=3 {
            for k in [2, 4, 8] {
                let pyr = build_steerable(image.view(), height, k, 1.0, 0.5).unwrap();
                let back = reconstruct(&pyr).unwrap();
                let err = max_abs_error(image.view(), back.view());
                assert!(err < 1e-4, "height {} K {}: error {}", height, k, err);
            }
        }
    }

    #[test]
    fn test_parallel_inverse_matches_sequential() {
        let image = random_image(64, 64, 21);
        let pyr = build_steerable(image.view(), 2, 4, 1.0, 0.5).unwrap();
        let mut config = PyramidConfig::new();
        config.parallel_min_pixels = usize::MAX;
        let sequential = reconstruct_with(&pyr, &config).unwrap();
        config.parallel_min_pixels = 0;
        let parallel = reconstruct_with(&pyr, &config).unwrap();
        assert_eq!(sequential, parallel);
        assert!(max_abs_error(image.view(), parallel.view()) < 1e-4);
    }

    #[test]
    fn test_single_orientation_keeps_horizontal_frequencies() {
        // no energy on the vertical frequency axis, which one orientation drops
        let image = Array2::from_shape_fn((32, 32), |(_, c)| {
            let x = c as f64 / 32.0;
            (2.0 * std::f64::consts::PI * 3.0 * x).sin()
                + 0.5 * (2.0 * std::f64::consts::PI * 7.0 * x).cos()
        });
        let pyr = build_steerable(image.view(), 2, 1, 1.0, 0.5).unwrap();
        let back = reconstruct(&pyr).unwrap();
        assert!(max_abs_error(image.view(), back.view()) < 1e-4);
    }

    #[test]
    fn test_gaussian_bump_scenario() {
        init_logger();
        let image = gaussian_bump(64, 5.0);
        let pyr = build_steerable(image.view(), 3, 4, 1.0, 0.5).unwrap();
        assert_eq!(pyr.num_levels(), 3);
        assert_eq!(pyr.subband(4, None).unwrap().shape(), (8, 8));
        let back = reconstruct(&pyr).unwrap();
        assert!(max_abs_error(image.view(), back.view()) < 1e-4);
    }

    #[test]
    fn test_roundtrip_non_square_and_other_scale() {
        let image = random_image(48, 64, 11);
        let pyr = build_steerable(image.view(), 2, 4, 1.0, 0.5).unwrap();
        let back = reconstruct(&pyr).unwrap();
        assert!(max_abs_error(image.view(), back.view()) < 1e-4);

        // scales other than 0.5 crop inside the last lowpass transition, so
        // only band-limited content survives exactly
        let image = gaussian_bump(64, 5.0);
        let pyr = build_steerable(image.view(), 2, 3, 0.75, 0.6).unwrap();
        assert_eq!(pyr.level_shapes(), vec![(64, 64), (64, 64), (39, 39), (24, 24)]);
        let back = reconstruct(&pyr).unwrap();
        assert!(max_abs_error(image.view(), back.view()) < 1e-4);
    }

    #[test]
    fn test_roundtrip_after_real_conversion() {
        let image = random_image(32, 32, 5);
        let pyr = build_steerable(image.view(), 2, 4, 1.0, 0.5).unwrap();
        let real = to_real_bands(&pyr).unwrap();
        let back = reconstruct(&real).unwrap();
        assert!(max_abs_error(image.view(), back.view()) < 1e-4);
    }

    #[test]
    fn test_roundtrip_f32() {
        let image = random_image(32, 32, 9).mapv(|v| v as f32);
        let pyr = build_steerable(image.view(), 2, 4, 1.0f32, 0.5f32).unwrap();
        let back = reconstruct(&pyr).unwrap();
        assert!(max_abs_error(image.view(), back.view()) < 1e-3);
    }

    #[test]
    fn test_partial_reconstructions_sum_to_whole() {
        let image = random_image(32, 32, 21);
        let pyr = build_steerable(image.view(), 2, 4, 1.0, 0.5).unwrap();
        let whole = reconstruct(&pyr).unwrap();

        let mut total = Array2::<f64>::zeros((32, 32));
        for level in 0..=3 {
            total += &reconstruct_selected(&pyr, &BandSelection::with_levels([level])).unwrap();
        }
        assert!(max_abs_error(whole.view(), total.view()) < 1e-10);

        let by_orientation: Vec<Array2<f64>> = (1..=4)
            .map(|o| {
                let selection = BandSelection::with_levels([1]).with_orientations([o]);
                reconstruct_selected(&pyr, &selection).unwrap()
            })
            .collect();
        let level1 = reconstruct_selected(&pyr, &BandSelection::with_levels([1])).unwrap();
        let mut summed = Array2::<f64>::zeros((32, 32));
        for part in &by_orientation {
            summed += part;
        }
        assert!(max_abs_error(level1.view(), summed.view()) < 1e-10);
    }

    #[test]
    fn test_selection_out_of_range() {
        let image = random_image(32, 32, 2);
        let pyr = build_steerable(image.view(), 2, 4, 1.0, 0.5).unwrap();
        assert!(matches!(
            reconstruct_selected(&pyr, &BandSelection::with_levels([4])),
            Err(PyramidError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            reconstruct_selected(&pyr, &BandSelection::all().with_orientations([5])),
            Err(PyramidError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_zeroed_band_changes_only_that_band() {
        let image = random_image(32, 32, 8);
        let pyr = build_steerable(image.view(), 2, 4, 1.0, 0.5).unwrap();
        let zeroed = pyr
            .update_subband(2, Array2::from_elem((16, 16), Complex::new(0.0, 0.0)), Some(3))
            .unwrap();

        let full = reconstruct(&pyr).unwrap();
        let edited = reconstruct(&zeroed).unwrap();
        let band = reconstruct_selected(&pyr, &BandSelection::with_levels([2]).with_orientations([3])).unwrap();
        let restored = &edited + &band;
        assert!(max_abs_error(full.view(), restored.view()) < 1e-10);
    }

    #[test]
    fn test_spatial_dispatch() {
        let image = random_image(32, 32, 3);
        let lap = build_laplacian(image.view(), 2).unwrap();
        assert!(max_abs_error(image.view(), reconstruct(&lap).unwrap().view()) < 1e-10);

        let gauss = build_gaussian(image.view(), 2).unwrap();
        assert_eq!(reconstruct(&gauss).unwrap(), image);
        let none = reconstruct_selected(&gauss, &BandSelection::with_levels([1])).unwrap();
        assert!(none.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_shape_mismatch_on_reconstruct() {
        // a pyramid assembled by hand with a wrongly sized band
        use crate::pyramid::Subband;
        let levels = vec![
            vec![Subband::Real(Array2::<f64>::zeros((32, 32)))],
            (0..2).map(|_| Subband::Real(Array2::zeros((32, 32)))).collect(),
            vec![Subband::Real(Array2::zeros((8, 8)))],
        ];
        let pyr = ImagePyramid::from_levels(PyramidType::ComplexSteerable, 0.5, 2, 1.0, levels).unwrap();
        assert!(matches!(
            reconstruct(&pyr),
            Err(PyramidError::ShapeMismatch { .. })
        ));
    }
}
