pub mod model_spec;
pub mod pipeline;

pub use model_spec::*;
pub use pipeline::*;
