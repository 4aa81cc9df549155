pub mod decision_tree;
pub mod gradient_boosting;
pub mod random_forest;

pub use decision_tree::*;
pub use gradient_boosting::*;
pub use random_forest::*;
