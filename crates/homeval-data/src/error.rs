use thiserror::Error;

/// Errors raised while building tables or preparing a dataset.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    /// A column required by the configuration is absent.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A column listed for dropping is absent.
    #[error("Column '{0}' listed for dropping does not exist")]
    DropColumnNotFound(String),

    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("Column '{column}' has {got} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Target column '{0}' is not numeric")]
    NonNumericTarget(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dataset has no usable rows")]
    EmptyDataset,
}

pub type DataResult<T> = Result<T, DataError>;
