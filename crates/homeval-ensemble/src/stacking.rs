//! Stacked generalization for regression.

use homeval_core::{check_xy, Matrix, MlError, MlResult, Regressor};
use homeval_preprocessing::KFold;

use rayon::prelude::*;
use tracing::debug;

/// Out-of-fold predictions of one base regressor over the whole training set.
fn out_of_fold(base: &dyn Regressor, x: &Matrix, y: &[f64], cv: &KFold) -> MlResult<Vec<f64>> {
    let mut oof = vec![0.0; x.rows()];
    for (k, fold) in cv.split(x.rows())?.iter().enumerate() {
        let x_train = x.select_rows(&fold.train)?;
        let y_train: Vec<f64> = fold.train.iter().map(|&i| y[i]).collect();
        let mut model = base.clone_unfitted();
        model.fit(&x_train, &y_train)?;

        let preds = model.predict(&x.select_rows(&fold.test)?)?;
        for (&i, p) in fold.test.iter().zip(preds) {
            oof[i] = p;
        }
        debug!(base = base.name(), fold = k, "stacking fold fitted");
    }
    Ok(oof)
}

/// Stacking regressor: a meta-regressor fitted on the base regressors'
/// out-of-fold predictions.
///
/// After `fit`, every base regressor is refit on the full training matrix;
/// prediction feeds their outputs, in order, to the meta-regressor.
pub struct StackingRegressor {
    pub estimators: Vec<(String, Box<dyn Regressor>)>,
    pub final_estimator: Box<dyn Regressor>,
    pub cv: KFold,
    fitted: bool,
}

impl StackingRegressor {
    pub fn new(
        estimators: Vec<(String, Box<dyn Regressor>)>,
        final_estimator: Box<dyn Regressor>,
    ) -> Self {
        StackingRegressor {
            estimators,
            final_estimator,
            cv: KFold::new(5),
            fitted: false,
        }
    }

    pub fn with_cv(mut self, cv: KFold) -> Self {
        self.cv = cv;
        self
    }

    pub fn estimator_names(&self) -> Vec<&str> {
        self.estimators.iter().map(|(n, _)| n.as_str()).collect()
    }

    fn base_predictions(&self, x: &Matrix) -> MlResult<Matrix> {
        let columns = self
            .estimators
            .par_iter()
            .map(|(_, model)| model.predict(x))
            .collect::<MlResult<Vec<_>>>()?;
        Matrix::from_columns(&columns)
    }
}

impl Regressor for StackingRegressor {
    fn name(&self) -> &'static str {
        "Stacking"
    }

    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        check_xy(x, y)?;
        if self.estimators.is_empty() {
            return Err(MlError::InvalidParameter(
                "stacking needs at least one base estimator".into(),
            ));
        }

        let cv = self.cv;
        let stage = self
            .estimators
            .par_iter()
            .map(|(name, base)| -> MlResult<(Vec<f64>, Box<dyn Regressor>)> {
                let oof = out_of_fold(base.as_ref(), x, y, &cv)?;
                let mut refit = base.clone_unfitted();
                refit.fit(x, y)?;
                debug!(base = %name, "base estimator refit on full data");
                Ok((oof, refit))
            })
            .collect::<MlResult<Vec<_>>>()?;

        let mut meta_columns = Vec::with_capacity(stage.len());
        for ((_, slot), (oof, fitted)) in self.estimators.iter_mut().zip(stage) {
            meta_columns.push(oof);
            *slot = fitted;
        }
        let meta = Matrix::from_columns(&meta_columns)?;
        self.final_estimator.fit(&meta, y)?;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        if !self.fitted {
            return Err(MlError::NotFitted("StackingRegressor"));
        }
        let meta = self.base_predictions(x)?;
        self.final_estimator.predict(&meta)
    }

    fn clone_unfitted(&self) -> Box<dyn Regressor> {
        let estimators = self
            .estimators
            .iter()
            .map(|(name, model)| (name.clone(), model.clone_unfitted()))
            .collect();
        Box::new(
            StackingRegressor::new(estimators, self.final_estimator.clone_unfitted())
                .with_cv(self.cv),
        )
    }
}
