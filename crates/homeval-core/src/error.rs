use thiserror::Error;

/// Core error type for matrix operations and model fitting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MlError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Index out of bounds: index {index} on axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Singular matrix: cannot solve system")]
    SingularMatrix,

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Model not fitted: {0}")]
    NotFitted(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Non-finite value produced by {0}")]
    NonFinite(String),
}

pub type MlResult<T> = Result<T, MlError>;
