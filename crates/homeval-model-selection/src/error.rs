use homeval_core::MlError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),

    #[error("All {0} search candidates failed")]
    AllCandidatesFailed(usize),

    #[error(transparent)]
    Model(#[from] MlError),
}

pub type SelectionResult<T> = Result<T, SelectionError>;
