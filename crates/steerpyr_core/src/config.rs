//! Pyramid construction parameters.
//!
//! All parameters have defaults matching the standard steerable pyramid:
//! four orientations, one-octave transition width, half-resolution levels
//! and the maximum height the image supports.
//!
//! ## Environment overrides
//!
//! - `STEERPYR_PARALLEL_MIN_PIXELS`: minimum level size (in pixels) for the
//!   orientation loop to run on the rayon pool.
//! - `STEERPYR_FORCE_SEQUENTIAL`: `1/true/yes/on` disables the parallel path.

use ndarray::ArrayView2;

use crate::error::{PyramidError, PyramidResult};
use crate::float_trait::PyrFloat;
use crate::grid::max_pyramid_height;
use crate::pyramid::{ImagePyramid, PyramidType};
use crate::spatial::{build_gaussian, build_laplacian, SPATIAL_SCALE};
use crate::steerable::build_steerable_with;

// =============================================================================
// Constants
// =============================================================================

/// Default number of orientation bands per level
const DEFAULT_NUM_ORIENTATIONS: usize = 4;

/// Default raised-cosine transition width, in octaves
const DEFAULT_TWIDTH: f64 = 1.0;

/// Default per-level downsampling factor
const DEFAULT_SCALE: f64 = 0.5;

/// Default minimum level size for parallel orientation processing.
/// Below this the rayon overhead outweighs the per-band FFTs.
const DEFAULT_PARALLEL_MIN_PIXELS: usize = 4096;

const PARALLEL_MIN_PIXELS_ENV: &str = "STEERPYR_PARALLEL_MIN_PIXELS";
const FORCE_SEQUENTIAL_ENV: &str = "STEERPYR_FORCE_SEQUENTIAL";

// =============================================================================
// Types
// =============================================================================

/// Configuration for building any supported pyramid.
///
/// Use `Default::default()` for standard settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidConfig<F: PyrFloat> {
    /// Decomposition to build. Default: ComplexSteerable
    pub pyramid_type: PyramidType,
    /// Number of frequency levels; `None` picks the maximum. Default: None
    pub height: Option<usize>,
    /// Orientation bands per steerable level. Default: 4
    pub num_orientations: usize,
    /// Raised-cosine transition width in octaves. Default: 1.0
    pub twidth: F,
    /// Downsampling factor per level, in (0, 1). Default: 0.5
    pub scale: F,
    /// Minimum level size for the parallel orientation loop. Default: 4096
    pub parallel_min_pixels: usize,
}

impl<F: PyrFloat> Default for PyramidConfig<F> {
    fn default() -> Self {
        Self {
            pyramid_type: PyramidType::default(),
            height: None,
            num_orientations: DEFAULT_NUM_ORIENTATIONS,
            twidth: F::from_f64_c(DEFAULT_TWIDTH),
            scale: F::from_f64_c(DEFAULT_SCALE),
            parallel_min_pixels: DEFAULT_PARALLEL_MIN_PIXELS,
        }
    }
}

impl<F: PyrFloat> PyramidConfig<F> {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration for another pyramid type.
    pub fn for_type(pyramid_type: PyramidType) -> Self {
        Self {
            pyramid_type,
            ..Self::default()
        }
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> PyramidResult<()> {
        if self.num_orientations == 0 {
            return Err(PyramidError::invalid("num_orientations must be >= 1"));
        }
        if !(self.twidth > F::zero()) {
            return Err(PyramidError::invalid("twidth must be > 0"));
        }
        if !(self.scale > F::zero() && self.scale < F::one()) {
            return Err(PyramidError::invalid("scale must be in (0, 1)"));
        }
        if self.pyramid_type != PyramidType::ComplexSteerable
            && self.scale != F::from_f64_c(SPATIAL_SCALE)
        {
            return Err(PyramidError::invalid(format!(
                "{} pyramids only support scale 0.5",
                self.pyramid_type
            )));
        }
        Ok(())
    }

    /// Height for an image of `rows x cols`: the configured one, or the
    /// largest the image supports.
    pub fn resolve_height(&self, rows: usize, cols: usize) -> PyramidResult<usize> {
        let max_height = max_pyramid_height(rows, cols, self.scale);
        match self.height {
            None => Ok(max_height),
            Some(h) if h <= max_height => Ok(h),
            Some(h) => Err(PyramidError::invalid(format!(
                "height {} exceeds the maximum {} for a {}x{} image",
                h, max_height, rows, cols
            ))),
        }
    }

    /// Effective parallel threshold after environment overrides.
    pub fn effective_parallel_min_pixels(&self) -> usize {
        resolve_parallel_min_pixels(
            self.parallel_min_pixels,
            std::env::var(PARALLEL_MIN_PIXELS_ENV).ok().as_deref(),
            std::env::var(FORCE_SEQUENTIAL_ENV).ok().as_deref(),
        )
    }
}

// =============================================================================
// Environment resolution
// =============================================================================

fn parse_flag(value: &str) -> bool {
    let v = value.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

/// Combine the configured threshold with raw environment values.
fn resolve_parallel_min_pixels(
    configured: usize,
    min_pixels_env: Option<&str>,
    force_sequential_env: Option<&str>,
) -> usize {
    if force_sequential_env.map(parse_flag).unwrap_or(false) {
        return usize::MAX;
    }
    min_pixels_env
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(configured)
}

// =============================================================================
// Entry point
// =============================================================================

/// Build the pyramid described by `config`.
pub fn build_with_config<F: PyrFloat>(
    image: ArrayView2<F>,
    config: &PyramidConfig<F>,
) -> PyramidResult<ImagePyramid<F>> {
    config.validate()?;
    match config.pyramid_type {
        PyramidType::ComplexSteerable => build_steerable_with(image, config),
        PyramidType::Laplacian => {
            let (rows, cols) = image.dim();
            build_laplacian(image, config.resolve_height(rows, cols)?)
        }
        PyramidType::Gaussian => {
            let (rows, cols) = image.dim();
            build_gaussian(image, config.resolve_height(rows, cols)?)
        }
    }
}
