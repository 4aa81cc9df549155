use homeval_core::MlError;
use homeval_data::DataError;
use homeval_io::IoError;
use homeval_model_selection::SelectionError;
use thiserror::Error;

/// Any failure of an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Model(#[from] MlError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
