pub mod error;
pub mod matrix;
pub mod traits;

pub use error::{MlError, MlResult};
pub use matrix::Matrix;
pub use traits::{check_xy, Regressor};
