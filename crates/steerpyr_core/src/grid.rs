//! Centred frequency-plane coordinate grids and the nested crop regions of
//! a frequency-domain pyramid.
//!
//! The radial and angular grids are built once at full resolution. Coarser
//! levels read cropped views of them; they are never recomputed, so a mask
//! built for a level during construction and during reconstruction comes
//! from exactly the same numbers.

use ndarray::{s, Array2, ArrayView2, ArrayViewMut2};

use crate::error::{PyramidError, PyramidResult};
use crate::float_trait::PyrFloat;

/// Axis-aligned sub-rectangle of the full-resolution frequency plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Region {
    pub fn full(rows: usize, cols: usize) -> Self {
        Self {
            row: 0,
            col: 0,
            rows,
            cols,
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn view<'a, T>(&self, array: &'a Array2<T>) -> ArrayView2<'a, T> {
        array.slice(s![self.row..self.row + self.rows, self.col..self.col + self.cols])
    }

    pub fn view_mut<'a, T>(&self, array: &'a mut Array2<T>) -> ArrayViewMut2<'a, T> {
        array.slice_mut(s![self.row..self.row + self.rows, self.col..self.col + self.cols])
    }

    /// Position of `inner` relative to this region's top-left corner.
    pub fn relative(&self, inner: &Region) -> Region {
        Region {
            row: inner.row - self.row,
            col: inner.col - self.col,
            rows: inner.rows,
            cols: inner.cols,
        }
    }

    /// The next, lower-resolution region centred at the same origin.
    ///
    /// `ctr = ceil((d+0.5)/2)`, `lodims = ceil((d-0.5)*scale)`,
    /// `loctr = ceil((lodims+0.5)/2)`, start = `ctr - loctr`.
    pub fn shrink<F: PyrFloat>(&self, scale: F) -> Option<Region> {
        let (row_off, rows) = shrink_axis(self.rows, scale)?;
        let (col_off, cols) = shrink_axis(self.cols, scale)?;
        Some(Region {
            row: self.row + row_off,
            col: self.col + col_off,
            rows,
            cols,
        })
    }
}

/// Offset and length of the cropped axis, or `None` below one sample.
fn shrink_axis<F: PyrFloat>(len: usize, scale: F) -> Option<(usize, usize)> {
    let ctr = centre_1based(len);
    let lodims = ((F::usize_as(len) - F::from_f64_c(0.5)) * scale)
        .ceil()
        .to_usize()?;
    if lodims == 0 || lodims >= len {
        return None;
    }
    let loctr = centre_1based(lodims);
    Some((ctr - loctr, lodims))
}

/// 1-based index of the zero-frequency sample, `ceil((n + 0.5) / 2)`.
#[inline]
fn centre_1based(n: usize) -> usize {
    n / 2 + 1
}

/// Compute the chain of nested regions for `levels` frequency levels.
///
/// Element 0 is the full plane; element `k` is the support of the
/// lowpass spectrum after `k` crops. The chain has `levels + 1` entries.
pub fn region_chain<F: PyrFloat>(
    rows: usize,
    cols: usize,
    levels: usize,
    scale: F,
) -> PyramidResult<Vec<Region>> {
    let mut chain = Vec::with_capacity(levels + 1);
    chain.push(Region::full(rows, cols));
    for level in 1..=levels {
        let prev = chain[level - 1];
        let next = prev.shrink(scale).ok_or_else(|| {
            PyramidError::invalid(format!(
                "level {} would crop a {}x{} frequency region below one pixel",
                level, prev.rows, prev.cols
            ))
        })?;
        chain.push(next);
    }
    Ok(chain)
}

/// Largest pyramid height supported by an image of the given size.
///
/// `floor(log_{1/scale}(min(rows, cols))) - 2`, saturating at zero.
pub fn max_pyramid_height<F: PyrFloat>(rows: usize, cols: usize, scale: F) -> usize {
    let min_dim = rows.min(cols);
    if min_dim == 0 || scale <= F::zero() || scale >= F::one() {
        return 0;
    }
    let factor = F::one() / scale;
    let tolerance = F::one() - F::from_f64_c(1e-9);
    let mut extent = F::usize_as(min_dim);
    let mut octaves = 0usize;
    while extent / factor >= tolerance {
        extent = extent / factor;
        octaves += 1;
    }
    octaves.saturating_sub(2)
}

/// Full-resolution radial log-frequency and angle grids.
#[derive(Debug, Clone)]
pub struct FrequencyGrid<F: PyrFloat> {
    log_rad: Array2<F>,
    angle: Array2<F>,
}

impl<F: PyrFloat> FrequencyGrid<F> {
    /// Build the grids for an image of `rows x cols` (both at least 2).
    ///
    /// Coordinates are `(i - rows/2) / (rows/2)` down the rows and
    /// `(j - cols/2) / (cols/2)` across the columns. The centre radius is
    /// replaced by its left neighbour's before taking `log2`.
    pub fn new(rows: usize, cols: usize) -> PyramidResult<Self> {
        if rows < 2 || cols < 2 {
            return Err(PyramidError::invalid(format!(
                "frequency grid needs at least 2x2 samples, got {}x{}",
                rows, cols
            )));
        }

        let (cr, cc) = (rows / 2, cols / 2);
        let half_r = F::usize_as(rows) / F::from_f64_c(2.0);
        let half_c = F::usize_as(cols) / F::from_f64_c(2.0);
        let y: Vec<F> = (0..rows)
            .map(|i| (F::usize_as(i) - F::usize_as(cr)) / half_r)
            .collect();
        let x: Vec<F> = (0..cols)
            .map(|j| (F::usize_as(j) - F::usize_as(cc)) / half_c)
            .collect();

        let angle = Array2::from_shape_fn((rows, cols), |(i, j)| y[i].atan2(x[j]));
        let mut radius = Array2::from_shape_fn((rows, cols), |(i, j)| y[i].hypot(x[j]));
        radius[[cr, cc]] = radius[[cr, cc - 1]];
        let log_rad = radius.mapv(|r| r.log2());

        Ok(Self { log_rad, angle })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.log_rad.dim()
    }

    pub fn log_rad(&self) -> ArrayView2<'_, F> {
        self.log_rad.view()
    }

    pub fn angle(&self) -> ArrayView2<'_, F> {
        self.angle.view()
    }

    /// Radial grid cropped to `region`.
    pub fn log_rad_in(&self, region: &Region) -> ArrayView2<'_, F> {
        region.view(&self.log_rad)
    }

    /// Angular grid cropped to `region`.
    pub fn angle_in(&self, region: &Region) -> ArrayView2<'_, F> {
        region.view(&self.angle)
    }
}

/// Wrap an angle into `[-pi, pi)`.
#[inline]
pub fn wrap_angle<F: PyrFloat>(angle: F) -> F {
    if angle >= -F::PI() && angle < F::PI() {
        return angle;
    }
    let two_pi = F::PI() + F::PI();
    let mut wrapped = (angle + F::PI()) % two_pi;
    if wrapped < F::zero() {
        wrapped += two_pi;
    }
    wrapped - F::PI()
}
