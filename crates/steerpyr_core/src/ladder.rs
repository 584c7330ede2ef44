//! Level-by-level mask generation shared by construction and reconstruction.
//!
//! The ladder owns the full-resolution frequency grids, the chain of nested
//! crop regions and the radial transition tables. Both transform directions
//! ask it for the same `(level, orientation)` masks, so the filters applied
//! on the way in and on the way out are computed by one code path.
//!
//! Level numbering follows the pyramid: level 0 is the highpass residual,
//! levels `1..=L` are oriented, level `L+1` is the lowpass residual.
//! Region `k` is the frequency support after `k` crops; oriented level `l`
//! lives on region `l - 1` and the lowpass residual on region `L`.

use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex;

use crate::error::{PyramidError, PyramidResult};
use crate::float_trait::PyrFloat;
use crate::grid::{max_pyramid_height, region_chain, wrap_angle, FrequencyGrid, Region};
use crate::raised_cosine::RadialTransition;

/// Which side of the transform a band filter is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Image to subbands: carries `(-i)^order`.
    Analysis,
    /// Subbands to image: carries `i^order`.
    Synthesis,
}

/// `2^(2p) (p!)^2 / (K (2p)!)` with `p = K - 1`, as a running product.
pub fn orientation_constant(num_orientations: usize) -> f64 {
    let order = num_orientations.saturating_sub(1);
    let product: f64 = (1..=order)
        .map(|j| (2 * j) as f64 / (2 * j - 1) as f64)
        .product();
    product / num_orientations as f64
}

/// `i^power` or `(-i)^power` as an exact complex unit.
fn unit_power<F: PyrFloat>(power: usize, direction: Direction) -> Complex<F> {
    let (one, zero) = (F::one(), F::zero());
    let quarter_turns = match direction {
        Direction::Synthesis => power % 4,
        Direction::Analysis => (4 - power % 4) % 4,
    };
    match quarter_turns {
        0 => Complex::new(one, zero),
        1 => Complex::new(zero, one),
        2 => Complex::new(-one, zero),
        _ => Complex::new(zero, -one),
    }
}

/// Shared per-level mask source for one image size and parameter set.
#[derive(Debug, Clone)]
pub struct MaskLadder<F: PyrFloat> {
    grid: FrequencyGrid<F>,
    regions: Vec<Region>,
    transition: RadialTransition<F>,
    num_orientations: usize,
    angle_gain: F,
}

impl<F: PyrFloat> MaskLadder<F> {
    /// Validate parameters and lay out the region chain for `num_levels`.
    pub fn new(
        rows: usize,
        cols: usize,
        num_levels: usize,
        num_orientations: usize,
        twidth: F,
        scale: F,
    ) -> PyramidResult<Self> {
        if num_orientations == 0 {
            return Err(PyramidError::invalid("num_orientations must be >= 1"));
        }
        if !(twidth > F::zero()) {
            return Err(PyramidError::invalid(format!(
                "twidth must be > 0, got {:?}",
                twidth
            )));
        }
        if !(scale > F::zero() && scale < F::one()) {
            return Err(PyramidError::invalid(format!(
                "scale must be in (0, 1), got {:?}",
                scale
            )));
        }
        let max_height = max_pyramid_height(rows, cols, scale);
        if num_levels > max_height {
            return Err(PyramidError::invalid(format!(
                "height {} exceeds the maximum {} for a {}x{} image at scale {:?}",
                num_levels, max_height, rows, cols, scale
            )));
        }

        let grid = FrequencyGrid::new(rows, cols)?;
        let regions = region_chain(rows, cols, num_levels, scale)?;
        let angle_gain =
            F::from_f64_c(2.0) * F::from_f64_c(orientation_constant(num_orientations)).sqrt();

        Ok(Self {
            grid,
            regions,
            transition: RadialTransition::new(twidth, scale),
            num_orientations,
            angle_gain,
        })
    }

    pub fn num_levels(&self) -> usize {
        self.regions.len() - 1
    }

    pub fn num_orientations(&self) -> usize {
        self.num_orientations
    }

    pub fn order(&self) -> usize {
        self.num_orientations - 1
    }

    pub fn grid(&self) -> &FrequencyGrid<F> {
        &self.grid
    }

    /// Frequency support after `crops` crops (`0..=num_levels`).
    pub fn region(&self, crops: usize) -> Region {
        self.regions[crops]
    }

    /// Region holding the spectrum of pyramid `level`.
    pub fn level_region(&self, level: usize) -> Region {
        match level {
            0 => self.regions[0],
            l if l <= self.num_levels() => self.regions[l - 1],
            _ => self.regions[self.num_levels()],
        }
    }

    /// Radial highpass for `level`: octave 0 on the full plane for the
    /// residual, octave `level` on region `level - 1` for oriented levels.
    pub fn high_mask(&self, level: usize) -> Array2<F> {
        let region = self.level_region(level);
        self.transition
            .high_mask(self.grid.log_rad_in(&region), level)
    }

    /// Radial lowpass applied after `crops` crops, at octave `crops`.
    pub fn low_mask(&self, crops: usize) -> Array2<F> {
        let region = self.regions[crops];
        self.transition
            .low_mask(self.grid.log_rad_in(&region), crops)
    }

    /// Angular window of `orientation` (1-based) over the region of `level`.
    ///
    /// `2 sqrt(c) cos(t)^p` on the half plane `|t| < pi/2` around the
    /// steering angle `pi (orientation - 1) / K`, zero elsewhere.
    pub fn angle_mask(&self, level: usize, orientation: usize) -> Array2<F> {
        let region = self.level_region(level);
        let steer = F::PI() * F::usize_as(orientation - 1) / F::usize_as(self.num_orientations);
        angular_window(
            self.grid.angle_in(&region),
            steer,
            self.order(),
            self.angle_gain,
        )
    }

    /// Complete oriented filter `high * angle * (-/+ i)^p` for one band.
    pub fn band_filter(
        &self,
        level: usize,
        orientation: usize,
        direction: Direction,
    ) -> Array2<Complex<F>> {
        let high = self.high_mask(level);
        let angle = self.angle_mask(level, orientation);
        let phase = unit_power::<F>(self.order(), direction);
        let mut filter = Array2::from_elem(high.dim(), phase);
        ndarray::Zip::from(&mut filter)
            .and(&high)
            .and(&angle)
            .for_each(|f, &h, &a| *f = *f * (h * a));
        filter
    }
}

/// Half-plane `cos^p` window around `steer` with peak `gain`.
pub fn angular_window<F: PyrFloat>(
    angle: ArrayView2<F>,
    steer: F,
    order: usize,
    gain: F,
) -> Array2<F> {
    let half_pi = F::FRAC_PI_2();
    angle.mapv(|theta| {
        let t = theta - steer;
        if wrap_angle(t).abs() < half_pi {
            gain * t.cos().powi(order as i32)
        } else {
            F::zero()
        }
    })
}
