use thiserror::Error;

/// Errors produced while building, editing or inverting a pyramid.
///
/// Everything is reported synchronously; nothing in the pipeline retries.
/// Steering-matrix rank deficiency is not an error: it is logged and
/// recorded on the [`crate::steering::SteeringMatrix`] instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PyramidError {
    /// Construction parameters are malformed. Raised before any computation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A level or orientation outside the pyramid's shape was requested.
    #[error("subband index out of range (level {level}, orientation {orientation:?}): {reason}")]
    IndexOutOfRange {
        level: usize,
        orientation: Option<usize>,
        reason: String,
    },

    /// Replacement data does not have the shape of the slot it replaces.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// A pyramid type tag outside the closed set of supported variants.
    #[error("unsupported pyramid type: {0}")]
    UnsupportedPyramidType(String),
}

pub type PyramidResult<T> = Result<T, PyramidError>;

impl PyramidError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub(crate) fn index(level: usize, orientation: Option<usize>, reason: impl Into<String>) -> Self {
        Self::IndexOutOfRange {
            level,
            orientation,
            reason: reason.into(),
        }
    }
}
