//! Raised-cosine radial transition tables.
//!
//! A table samples `cos^2` over a quarter period and maps it onto a band of
//! log-frequencies. High-pass and low-pass masks are read from it by
//! piecewise-linear interpolation with flat extrapolation, so the two masks
//! split the spectrum with `high^2 + low^2 = 1`.

use ndarray::{Array2, ArrayView2};

use crate::float_trait::PyrFloat;

/// Number of interior samples of the transition.
const RCOS_TABLE_SIZE: usize = 256;

/// Sampled lookup table with a uniform abscissa grid.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable<F: PyrFloat> {
    origin: F,
    increment: F,
    values: Vec<F>,
}

impl<F: PyrFloat> LookupTable<F> {
    pub fn new(origin: F, increment: F, values: Vec<F>) -> Self {
        debug_assert!(values.len() >= 2);
        Self {
            origin,
            increment,
            values,
        }
    }

    pub fn origin(&self) -> F {
        self.origin
    }

    pub fn increment(&self) -> F {
        self.increment
    }

    pub fn values(&self) -> &[F] {
        &self.values
    }

    /// Abscissa of the `k`-th control point.
    pub fn abscissa(&self, k: usize) -> F {
        self.origin + F::usize_as(k) * self.increment
    }

    /// Same values, abscissae moved by `delta`.
    pub fn shifted(&self, delta: F) -> Self {
        Self {
            origin: self.origin + delta,
            increment: self.increment,
            values: self.values.clone(),
        }
    }

    /// Piecewise-linear interpolation, flat beyond both ends.
    #[inline]
    pub fn interpolate(&self, x: F) -> F {
        let last = self.values.len() - 1;
        let pos = (x - self.origin) / self.increment;
        if !(pos > F::zero()) {
            return self.values[0];
        }
        if pos >= F::usize_as(last) {
            return self.values[last];
        }
        let idx = pos.floor().to_usize().unwrap_or(0).min(last - 1);
        let t = pos - F::usize_as(idx);
        self.values[idx] * (F::one() - t) + self.values[idx + 1] * t
    }

    /// Apply [`Self::interpolate`] to every sample of `grid`.
    pub fn apply(&self, grid: ArrayView2<F>) -> Array2<F> {
        grid.mapv(|x| self.interpolate(x))
    }
}

/// Build the raw raised-cosine table.
///
/// `values.0` is held below `position - width/2`, `values.1` above
/// `position + width/2`, with a `cos^2` transition in between. The end
/// samples are duplicated so extrapolation stays flat.
pub fn raised_cosine<F: PyrFloat>(width: F, position: F, values: (F, F)) -> LookupTable<F> {
    let sz = RCOS_TABLE_SIZE;
    let n = sz + 3;
    let two = F::from_f64_c(2.0);
    let quarter = F::PI() / F::from_f64_c(4.0);

    let raw: Vec<F> = (0..n)
        .map(|k| F::PI() * F::isize_as(k as isize - (sz as isize + 1)) / (two * F::usize_as(sz)))
        .collect();
    let mut y: Vec<F> = raw
        .iter()
        .map(|&x| {
            let c = x.cos();
            values.0 + (values.1 - values.0) * c * c
        })
        .collect();
    y[0] = y[1];
    y[sz + 2] = y[sz + 1];

    let scale = two * width / F::PI();
    let origin = position + scale * (raw[0] + quarter);
    let increment = scale * (raw[1] - raw[0]);
    LookupTable::new(origin, increment, y)
}

/// Matched high-pass / low-pass radial transition tables.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialTransition<F: PyrFloat> {
    high: LookupTable<F>,
    low: LookupTable<F>,
    octave: F,
}

impl<F: PyrFloat> RadialTransition<F> {
    /// Transition of width `twidth` centred at `-twidth/2`, moving
    /// `log2(1/scale)` towards DC per level.
    pub fn new(twidth: F, scale: F) -> Self {
        let two = F::from_f64_c(2.0);
        let base = raised_cosine(twidth, -twidth / two, (F::zero(), F::one()));
        let high_values: Vec<F> = base.values().iter().map(|&v| v.sqrt()).collect();
        let low_values: Vec<F> = high_values
            .iter()
            .map(|&h| (F::one() - h * h).abs().sqrt())
            .collect();

        Self {
            high: LookupTable::new(base.origin(), base.increment(), high_values),
            low: LookupTable::new(base.origin(), base.increment(), low_values),
            octave: (F::one() / scale).log2(),
        }
    }

    pub fn octave(&self) -> F {
        self.octave
    }

    /// High-pass table moved `octaves` levels towards DC.
    pub fn high_table(&self, octaves: usize) -> LookupTable<F> {
        self.high.shifted(-self.shift(octaves))
    }

    /// Low-pass table moved `octaves` levels towards DC.
    pub fn low_table(&self, octaves: usize) -> LookupTable<F> {
        self.low.shifted(-self.shift(octaves))
    }

    pub fn high_mask(&self, log_rad: ArrayView2<F>, octaves: usize) -> Array2<F> {
        self.high_table(octaves).apply(log_rad)
    }

    pub fn low_mask(&self, log_rad: ArrayView2<F>, octaves: usize) -> Array2<F> {
        self.low_table(octaves).apply(log_rad)
    }

    fn shift(&self, octaves: usize) -> F {
        F::usize_as(octaves) * self.octave
    }
}
