use ndarray::{Array2, ArrayView2, ArrayViewMut2, Zip};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::float_trait::PyrFloat;

/// Pre-computed row/column FFT plans for one 2-D shape.
///
/// Every pyramid level has its own region shape, so callers build one set
/// of plans per level and reuse it for all orientations of that level.
pub struct Fft2dPlans<F: PyrFloat> {
    rows: usize,
    cols: usize,
    fft_row: Arc<dyn Fft<F>>,
    fft_col: Arc<dyn Fft<F>>,
    ifft_row: Arc<dyn Fft<F>>,
    ifft_col: Arc<dyn Fft<F>>,
}

impl<F: PyrFloat> Fft2dPlans<F> {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self::with_planner(&mut planner, rows, cols)
    }

    /// Plan through a shared planner so repeated lengths reuse twiddles.
    pub fn with_planner(planner: &mut FftPlanner<F>, rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            fft_row: planner.plan_fft_forward(cols),
            fft_col: planner.plan_fft_forward(rows),
            ifft_row: planner.plan_fft_inverse(cols),
            ifft_col: planner.plan_fft_inverse(rows),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

/// Run one row pass and one column pass of the given plans in place.
fn transform_axes<F: PyrFloat>(
    data: &mut Array2<Complex<F>>,
    row_plan: &Arc<dyn Fft<F>>,
    col_plan: &Arc<dyn Fft<F>>,
) {
    let (rows, cols) = data.dim();

    let mut row_vec = vec![Complex::new(F::zero(), F::zero()); cols];
    for r in 0..rows {
        for c in 0..cols {
            row_vec[c] = data[[r, c]];
        }
        row_plan.process(&mut row_vec);
        for c in 0..cols {
            data[[r, c]] = row_vec[c];
        }
    }

    let mut col_vec = vec![Complex::new(F::zero(), F::zero()); rows];
    for c in 0..cols {
        for r in 0..rows {
            col_vec[r] = data[[r, c]];
        }
        col_plan.process(&mut col_vec);
        for r in 0..rows {
            data[[r, c]] = col_vec[r];
        }
    }
}

/// Compute the 2D FFT of a real image using pre-computed plans.
/// Returns unnormalized FFT in standard layout (DC at `[0, 0]`).
pub fn fft2d<F: PyrFloat>(input: ArrayView2<F>, plans: &Fft2dPlans<F>) -> Array2<Complex<F>> {
    debug_assert_eq!(input.dim(), plans.dim());
    let mut output = input.mapv(|v| Complex::new(v, F::zero()));
    transform_axes(&mut output, &plans.fft_row, &plans.fft_col);
    output
}

/// Compute the 2D FFT of a complex array using pre-computed plans.
pub fn fft2d_complex<F: PyrFloat>(
    input: ArrayView2<Complex<F>>,
    plans: &Fft2dPlans<F>,
) -> Array2<Complex<F>> {
    debug_assert_eq!(input.dim(), plans.dim());
    let mut output = input.to_owned();
    transform_axes(&mut output, &plans.fft_row, &plans.fft_col);
    output
}

/// Compute the 2D inverse FFT, keeping the complex result.
/// Normalizes by 1/(rows*cols).
pub fn ifft2d<F: PyrFloat>(input: ArrayView2<Complex<F>>, plans: &Fft2dPlans<F>) -> Array2<Complex<F>> {
    debug_assert_eq!(input.dim(), plans.dim());
    let (rows, cols) = input.dim();
    let mut output = input.to_owned();
    transform_axes(&mut output, &plans.ifft_row, &plans.ifft_col);

    let norm_factor = F::one() / F::usize_as(rows * cols);
    output.mapv_inplace(|v| v * norm_factor);
    output
}

/// Compute the 2D inverse FFT and keep only the real part.
pub fn ifft2d_real<F: PyrFloat>(input: ArrayView2<Complex<F>>, plans: &Fft2dPlans<F>) -> Array2<F> {
    ifft2d(input, plans).mapv(|v| v.re)
}

/// Move the zero-frequency bin from `[0, 0]` to `[rows / 2, cols / 2]`.
///
/// After shifting, index `ceil((N + 0.5) / 2)` (1-based) holds DC for both
/// even and odd lengths.
pub fn fftshift<T: Clone>(input: ArrayView2<T>) -> Array2<T> {
    let (rows, cols) = input.dim();
    let (sr, sc) = (rows / 2, cols / 2);
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        input[[(r + rows - sr) % rows, (c + cols - sc) % cols]].clone()
    })
}

/// Inverse of [`fftshift`]: move the centred zero-frequency bin back to `[0, 0]`.
pub fn ifftshift<T: Clone>(input: ArrayView2<T>) -> Array2<T> {
    let (rows, cols) = input.dim();
    let (sr, sc) = (rows / 2, cols / 2);
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        input[[(r + sr) % rows, (c + sc) % cols]].clone()
    })
}

/// Forward FFT of a real image with the zero frequency centred.
pub fn centered_spectrum<F: PyrFloat>(
    image: ArrayView2<F>,
    plans: &Fft2dPlans<F>,
) -> Array2<Complex<F>> {
    fftshift(fft2d(image, plans).view())
}

/// Inverse of [`centered_spectrum`], keeping the complex result.
pub fn from_centered_spectrum<F: PyrFloat>(
    spectrum: ArrayView2<Complex<F>>,
    plans: &Fft2dPlans<F>,
) -> Array2<Complex<F>> {
    ifft2d(ifftshift(spectrum).view(), plans)
}

/// Multiply a spectrum in place by a real frequency mask of the same shape.
pub fn apply_mask<F: PyrFloat>(spectrum: ArrayViewMut2<Complex<F>>, mask: ArrayView2<F>) {
    debug_assert_eq!(spectrum.dim(), mask.dim());
    Zip::from(spectrum).and(mask).for_each(|s, &m| *s = *s * m);
}

/// Element-wise product of a spectrum with a complex filter.
pub fn filtered<F: PyrFloat>(
    spectrum: ArrayView2<Complex<F>>,
    filter: ArrayView2<Complex<F>>,
) -> Array2<Complex<F>> {
    debug_assert_eq!(spectrum.dim(), filter.dim());
    Zip::from(spectrum)
        .and(filter)
        .map_collect(|&s, &f| s * f)
}
