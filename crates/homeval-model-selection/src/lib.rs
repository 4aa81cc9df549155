pub mod cross_validation;
pub mod error;
pub mod search;

pub use cross_validation::*;
pub use error::{SelectionError, SelectionResult};
pub use search::*;
