pub mod housing;

pub use housing::*;
