//! Steerable Pyramid Core Library
//!
//! Pure Rust implementation of frequency-domain complex steerable pyramids,
//! plus spatial Gaussian and Laplacian pyramids, for multi-scale and
//! multi-orientation image analysis. Everything is generic over `f32`/`f64`.

pub mod config;
pub mod error;
pub mod float_trait;
pub mod grid;
pub mod ladder;
pub mod pyramid;
pub mod raised_cosine;
pub mod real_bands;
pub mod reconstruct;
pub mod spatial;
pub mod steerable;
pub mod steering;
pub mod transforms;

// Re-export commonly used types at the crate root
pub use config::{build_with_config, PyramidConfig};
pub use error::{PyramidError, PyramidResult};
pub use float_trait::PyrFloat;
pub use grid::max_pyramid_height;
pub use pyramid::{ImagePyramid, PyramidType, Subband};
pub use real_bands::{make_real_bands, to_real_bands};
pub use reconstruct::{reconstruct, reconstruct_selected, reconstruct_with, BandSelection};
pub use spatial::{build_gaussian, build_laplacian};
pub use steerable::{build_steerable, build_steerable_with};
pub use steering::SteeringMatrix;
pub use transforms::{fft2d, fftshift, ifft2d, ifftshift};
