pub mod csv_io;
pub mod error;
pub mod report_io;

pub use csv_io::*;
pub use error::{IoError, IoResult};
pub use report_io::*;
