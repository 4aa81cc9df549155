pub mod error;
pub mod frame;
pub mod prepare;

pub use error::{DataError, DataResult};
pub use frame::{Column, Frame};
pub use prepare::*;
