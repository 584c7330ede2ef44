//! Conversion of analytic (complex) oriented bands to real bands.
//!
//! A complex band only carries the half of the spectrum its angular window
//! keeps. Doubling that half plane and taking half the real part of the
//! inverse restores a real band holding both halves, which is what the
//! inverse transform expects.

use log::debug;
use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{PyramidError, PyramidResult};
use crate::float_trait::PyrFloat;
use crate::grid::wrap_angle;
use crate::ladder::MaskLadder;
use crate::pyramid::{ImagePyramid, PyramidType, Subband};
use crate::transforms::{apply_mask, fft2d_complex, ifft2d, ifftshift, Fft2dPlans};

/// Half-plane doubling mask for orientation `orientation` of `num_orientations`,
/// in FFT layout (zero frequency at `[0, 0]`).
///
/// `angle` is the centred angle grid of the band's frequency region. The
/// mask is 2 inside the half plane, 1 on its boundary and 0 outside; the
/// zero frequency, the first row and the first column of the centred
/// layout are set to 1.
pub fn half_plane_mask<F: PyrFloat>(
    angle: ArrayView2<F>,
    orientation: usize,
    num_orientations: usize,
) -> Array2<F> {
    let (rows, cols) = angle.dim();
    let steer = F::PI() * F::usize_as(orientation - 1) / F::usize_as(num_orientations);
    let half_pi = F::FRAC_PI_2();
    let two = F::from_f64_c(2.0);

    let (cr, cc) = (rows / 2, cols / 2);
    let mut mask = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let theta = if (r, c) == (cr, cc) { -half_pi } else { angle[[r, c]] };
        let x = wrap_angle(theta - steer).abs();
        if x < half_pi {
            two
        } else if x == half_pi {
            F::one()
        } else {
            F::zero()
        }
    });
    mask[[cr, cc]] = F::one();
    mask.row_mut(0).fill(F::one());
    mask.column_mut(0).fill(F::one());

    ifftshift(mask.view())
}

/// `0.5 * real(ifft2(mask * fft2(band)))` for one analytic band.
pub fn analytic_to_real<F: PyrFloat>(
    band: ArrayView2<Complex<F>>,
    mask: ArrayView2<F>,
    plans: &Fft2dPlans<F>,
) -> Array2<F> {
    let half = F::from_f64_c(0.5);
    let mut spectrum = fft2d_complex(band, plans);
    apply_mask(spectrum.view_mut(), mask);
    ifft2d(spectrum.view(), plans).mapv(|v| v.re * half)
}

/// Copy of `pyramid` with every complex oriented band made real.
pub fn to_real_bands<F: PyrFloat>(pyramid: &ImagePyramid<F>) -> PyramidResult<ImagePyramid<F>> {
    let mut converted = pyramid.clone();
    make_real_bands(&mut converted)?;
    Ok(converted)
}

/// Convert the complex oriented bands of a steerable pyramid in place.
///
/// Bands that already hold real values are left as they are, as are the
/// residuals. Returns the number of bands converted.
pub fn make_real_bands<F: PyrFloat>(pyramid: &mut ImagePyramid<F>) -> PyramidResult<usize> {
    if pyramid.pyramid_type() != PyramidType::ComplexSteerable {
        return Err(PyramidError::invalid(format!(
            "real band conversion applies to complex steerable pyramids, not {}",
            pyramid.pyramid_type()
        )));
    }
    let (rows, cols) = pyramid.image_shape();
    let num_levels = pyramid.num_levels();
    let num_orientations = pyramid.num_orientations();
    let ladder = MaskLadder::new(
        rows,
        cols,
        num_levels,
        num_orientations,
        pyramid.twidth(),
        pyramid.scale(),
    )?;

    let mut planner = FftPlanner::new();
    let mut converted = 0usize;
    for level in 1..=num_levels {
        let region = ladder.level_region(level);
        let plans = Fft2dPlans::with_planner(&mut planner, region.rows, region.cols);
        let bands = &mut pyramid.levels_mut()[level];
        for (idx, band) in bands.iter_mut().enumerate() {
            let Subband::Complex(values) = band else {
                continue;
            };
            if values.dim() != region.dim() {
                return Err(PyramidError::ShapeMismatch {
                    expected: region.dim(),
                    actual: values.dim(),
                });
            }
            let mask = half_plane_mask(ladder.grid().angle_in(&region), idx + 1, num_orientations);
            *band = Subband::Real(analytic_to_real(values.view(), mask.view(), &plans));
            converted += 1;
        }
    }
    debug!("converted {} oriented bands to real", converted);
    Ok(converted)
}
