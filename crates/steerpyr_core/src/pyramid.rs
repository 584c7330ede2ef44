//! The pyramid container shared by every pyramid type.
//!
//! A pyramid is a list of levels, each a list of subbands. Level 0 is the
//! highest-frequency residual and the last level the lowest-frequency one.
//! Only the oriented levels of a complex steerable pyramid hold more than
//! one subband.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex;

use crate::error::{PyramidError, PyramidResult};
use crate::float_trait::PyrFloat;
use crate::steering::SteeringMatrix;

// =============================================================================
// Types
// =============================================================================

/// Closed set of supported decompositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PyramidType {
    /// Frequency-domain complex steerable pyramid.
    #[default]
    ComplexSteerable,
    /// Spatial band-pass pyramid; collapses exactly.
    Laplacian,
    /// Spatial low-pass pyramid.
    Gaussian,
}

impl PyramidType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PyramidType::ComplexSteerable => "complex_steerable",
            PyramidType::Laplacian => "laplacian",
            PyramidType::Gaussian => "gaussian",
        }
    }
}

impl fmt::Display for PyramidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PyramidType {
    type Err = PyramidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match tag.as_str() {
            "complex_steerable" | "complexsteerable" | "steerable" => {
                Ok(PyramidType::ComplexSteerable)
            }
            "laplacian" => Ok(PyramidType::Laplacian),
            "gaussian" => Ok(PyramidType::Gaussian),
            _ => Err(PyramidError::UnsupportedPyramidType(s.to_string())),
        }
    }
}

/// One stored band: real samples or complex (analytic) samples.
#[derive(Debug, Clone, PartialEq)]
pub enum Subband<F: PyrFloat> {
    Real(Array2<F>),
    Complex(Array2<Complex<F>>),
}

impl<F: PyrFloat> Subband<F> {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Subband::Real(a) => a.dim(),
            Subband::Complex(a) => a.dim(),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Subband::Complex(_))
    }

    /// Real samples; the real part for complex bands.
    pub fn to_real(&self) -> Array2<F> {
        match self {
            Subband::Real(a) => a.clone(),
            Subband::Complex(a) => a.mapv(|v| v.re),
        }
    }

    /// Complex samples; real bands get a zero imaginary part.
    pub fn to_complex(&self) -> Array2<Complex<F>> {
        match self {
            Subband::Real(a) => a.mapv(|v| Complex::new(v, F::zero())),
            Subband::Complex(a) => a.clone(),
        }
    }

    pub fn as_real(&self) -> Option<ArrayView2<'_, F>> {
        match self {
            Subband::Real(a) => Some(a.view()),
            Subband::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<ArrayView2<'_, Complex<F>>> {
        match self {
            Subband::Real(_) => None,
            Subband::Complex(a) => Some(a.view()),
        }
    }

    /// Per-sample magnitude (absolute value for real bands).
    pub fn magnitude(&self) -> Array2<F> {
        match self {
            Subband::Real(a) => a.mapv(|v| v.abs()),
            Subband::Complex(a) => a.mapv(|v| v.norm()),
        }
    }
}

impl<F: PyrFloat> From<Array2<F>> for Subband<F> {
    fn from(values: Array2<F>) -> Self {
        Subband::Real(values)
    }
}

impl<F: PyrFloat> From<Array2<Complex<F>>> for Subband<F> {
    fn from(values: Array2<Complex<F>>) -> Self {
        Subband::Complex(values)
    }
}

/// A built pyramid: parameters plus the subband storage.
///
/// `Clone` is a deep copy. [`ImagePyramid::update_subband`] returns a new
/// pyramid and leaves `self` untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePyramid<F: PyrFloat> {
    scale: F,
    num_levels: usize,
    num_orientations: usize,
    twidth: F,
    pyramid_type: PyramidType,
    levels: Vec<Vec<Subband<F>>>,
}

// =============================================================================
// Construction and accessors
// =============================================================================

impl<F: PyrFloat> ImagePyramid<F> {
    /// Assemble a pyramid from already computed levels.
    ///
    /// Checks the level layout: `num_levels + 2` levels, one subband per
    /// residual and per spatial level, `num_orientations` per oriented level.
    pub fn from_levels(
        pyramid_type: PyramidType,
        scale: F,
        num_orientations: usize,
        twidth: F,
        levels: Vec<Vec<Subband<F>>>,
    ) -> PyramidResult<Self> {
        if levels.len() < 2 {
            return Err(PyramidError::invalid(format!(
                "a pyramid needs at least two residual levels, got {}",
                levels.len()
            )));
        }
        let num_levels = levels.len() - 2;
        let num_orientations = match pyramid_type {
            PyramidType::ComplexSteerable => num_orientations,
            PyramidType::Laplacian | PyramidType::Gaussian => 1,
        };
        if num_orientations == 0 {
            return Err(PyramidError::invalid("num_orientations must be >= 1"));
        }

        let pyramid = Self {
            scale,
            num_levels,
            num_orientations,
            twidth,
            pyramid_type,
            levels,
        };
        for (level, bands) in pyramid.levels.iter().enumerate() {
            let expected = pyramid.num_bands(level);
            if bands.len() != expected {
                return Err(PyramidError::invalid(format!(
                    "level {} holds {} subbands, expected {}",
                    level,
                    bands.len(),
                    expected
                )));
            }
        }
        Ok(pyramid)
    }

    pub fn scale(&self) -> F {
        self.scale
    }

    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    pub fn num_orientations(&self) -> usize {
        self.num_orientations
    }

    pub fn twidth(&self) -> F {
        self.twidth
    }

    pub fn pyramid_type(&self) -> PyramidType {
        self.pyramid_type
    }

    /// Total number of stored levels, residuals included.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Shape of the input image (the level-0 residual).
    pub fn image_shape(&self) -> (usize, usize) {
        self.levels[0][0].shape()
    }

    /// Whether `level` holds one band per orientation.
    pub fn is_oriented_level(&self, level: usize) -> bool {
        self.pyramid_type == PyramidType::ComplexSteerable
            && level >= 1
            && level <= self.num_levels
    }

    /// Number of subbands stored at `level`.
    pub fn num_bands(&self, level: usize) -> usize {
        if self.is_oriented_level(level) {
            self.num_orientations
        } else {
            1
        }
    }

    /// All subbands of one level, in orientation order.
    pub fn level(&self, level: usize) -> PyramidResult<&[Subband<F>]> {
        self.levels
            .get(level)
            .map(|bands| bands.as_slice())
            .ok_or_else(|| {
                PyramidError::index(
                    level,
                    None,
                    format!("level must be in 0..={}", self.num_levels + 1),
                )
            })
    }

    /// Shape of the first subband of every level, finest first.
    pub fn level_shapes(&self) -> Vec<(usize, usize)> {
        self.levels.iter().map(|bands| bands[0].shape()).collect()
    }

    pub fn iter_levels(&self) -> impl Iterator<Item = &[Subband<F>]> {
        self.levels.iter().map(|bands| bands.as_slice())
    }

    /// Resolve `(level, orientation)` to a position in the level's list.
    fn slot(&self, level: usize, orientation: Option<usize>) -> PyramidResult<usize> {
        if level > self.num_levels + 1 {
            return Err(PyramidError::index(
                level,
                orientation,
                format!("level must be in 0..={}", self.num_levels + 1),
            ));
        }
        match (self.is_oriented_level(level), orientation) {
            (true, Some(o)) if o >= 1 && o <= self.num_orientations => Ok(o - 1),
            (true, Some(_)) => Err(PyramidError::index(
                level,
                orientation,
                format!("orientation must be in 1..={}", self.num_orientations),
            )),
            (true, None) => Err(PyramidError::index(
                level,
                None,
                "oriented level requires an orientation",
            )),
            (false, None) => Ok(0),
            (false, Some(_)) => Err(PyramidError::index(
                level,
                orientation,
                "level has no orientations",
            )),
        }
    }

    /// Borrow one subband.
    ///
    /// Oriented levels need `Some(o)` with `o` in `1..=num_orientations`;
    /// residual and spatial levels need `None`.
    pub fn subband(&self, level: usize, orientation: Option<usize>) -> PyramidResult<&Subband<F>> {
        let idx = self.slot(level, orientation)?;
        Ok(&self.levels[level][idx])
    }

    /// Return a copy of the pyramid with one subband replaced.
    pub fn update_subband(
        &self,
        level: usize,
        new_values: impl Into<Subband<F>>,
        orientation: Option<usize>,
    ) -> PyramidResult<Self> {
        let mut updated = self.clone();
        updated.set_subband(level, new_values, orientation)?;
        Ok(updated)
    }

    /// Replace one subband in place. The new data must match the slot's shape.
    pub fn set_subband(
        &mut self,
        level: usize,
        new_values: impl Into<Subband<F>>,
        orientation: Option<usize>,
    ) -> PyramidResult<()> {
        let idx = self.slot(level, orientation)?;
        let new_values = new_values.into();
        let expected = self.levels[level][idx].shape();
        let actual = new_values.shape();
        if expected != actual {
            return Err(PyramidError::ShapeMismatch { expected, actual });
        }
        self.levels[level][idx] = new_values;
        Ok(())
    }

    /// Mutable access for converters that rewrite bands without changing shape.
    pub(crate) fn levels_mut(&mut self) -> &mut [Vec<Subband<F>>] {
        &mut self.levels
    }

    /// Synthesise the real response of an oriented level at `angle`.
    ///
    /// Weighted sum of the real parts of the level's bands, with weights
    /// from the harmonic steering matrix.
    pub fn steer(&self, level: usize, angle: F) -> PyramidResult<Array2<F>> {
        if !self.is_oriented_level(level) {
            return Err(PyramidError::index(
                level,
                None,
                "steering needs an oriented level of a complex steerable pyramid",
            ));
        }
        let steering = SteeringMatrix::for_orientations(self.num_orientations)?;
        let weights = steering.weights(angle);

        let bands = &self.levels[level];
        let mut response = Array2::zeros(bands[0].shape());
        for (band, &w) in bands.iter().zip(weights.iter()) {
            response.scaled_add(w, &band.to_real());
        }
        Ok(response)
    }
}
