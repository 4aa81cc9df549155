use crate::error::MlResult;
use crate::matrix::Matrix;

/// A supervised regressor over a dense design matrix.
///
/// Implementors are constructed unfitted, fitted once, then only read.
/// `Send + Sync` lets cross-validation and search hand models to worker threads.
pub trait Regressor: Send + Sync {
    /// Short human-readable name, e.g. `"Random Forest"`.
    fn name(&self) -> &'static str;

    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()>;

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>>;

    /// Normalized per-column importances, for models that define them.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }

    /// A fresh, unfitted copy carrying the same hyperparameters.
    fn clone_unfitted(&self) -> Box<dyn Regressor>;
}

/// Check that a design matrix and a target agree and are non-empty.
pub fn check_xy(x: &Matrix, y: &[f64]) -> MlResult<()> {
    use crate::error::MlError;

    if x.rows() == 0 {
        return Err(MlError::EmptyInput("design matrix has no rows".into()));
    }
    if x.rows() != y.len() {
        return Err(MlError::DimensionMismatch(format!(
            "design matrix has {} rows but target has {} values",
            x.rows(),
            y.len()
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(MlError::InvalidInput("target contains non-finite values".into()));
    }
    Ok(())
}
