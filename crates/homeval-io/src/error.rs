use homeval_data::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error on '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed table: {0}")]
    Table(#[from] DataError),

    #[error("CSV input has no header row")]
    MissingHeader,
}

pub type IoResult<T> = Result<T, IoError>;
