use homeval_core::{Matrix, MlError, MlResult, Regressor};

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::decision_tree::{check_tree_input, grow_tree, GrownTree, TreeParams};

/// Hyperparameters of [`GradientBoostingRegressor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn without replacement for each stage.
    pub subsample: f64,
    pub seed: u64,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        GradientBoostingParams {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl GradientBoostingParams {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: Some(self.max_depth),
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: None,
        }
    }

    pub fn validate(&self) -> MlResult<()> {
        if self.n_estimators == 0 {
            return Err(MlError::InvalidParameter("n_estimators must be at least 1".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(MlError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(MlError::InvalidParameter(format!(
                "subsample must lie in (0, 1], got {}",
                self.subsample
            )));
        }
        self.tree_params().validate()
    }
}

/// Gradient Boosted Trees for Regression.
///
/// Least-squares boosting: starts from the target mean and sequentially fits
/// shallow trees to the residuals (the negative gradient of squared error).
#[derive(Debug, Clone)]
pub struct GradientBoostingRegressor {
    pub params: GradientBoostingParams,
    trees: Vec<GrownTree>,
    initial_prediction: f64,
    importances: Option<Vec<f64>>,
}

impl GradientBoostingRegressor {
    pub fn new(params: GradientBoostingParams) -> Self {
        GradientBoostingRegressor {
            params,
            trees: Vec::new(),
            initial_prediction: 0.0,
            importances: None,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        GradientBoostingRegressor::new(GradientBoostingParams::default())
    }
}

impl Regressor for GradientBoostingRegressor {
    fn name(&self) -> &'static str {
        "Gradient Boosting"
    }

    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        check_tree_input(x, y)?;
        self.params.validate()?;

        let n = x.rows();
        let tree_params = self.params.tree_params();
        let lr = self.params.learning_rate;
        let n_inbag = ((self.params.subsample * n as f64) as usize).max(1);
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        self.initial_prediction = y.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![self.initial_prediction; n];
        let mut trees = Vec::with_capacity(self.params.n_estimators);
        let mut total = vec![0.0; x.cols()];

        for _stage in 0..self.params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&predictions).map(|(t, p)| t - p).collect();
            let rows: Vec<usize> = if n_inbag < n {
                let mut rows = sample(&mut rng, n, n_inbag).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n).collect()
            };

            let tree = grow_tree(x, &residuals, rows, &tree_params, &mut rng)?;
            for (p, step) in predictions.iter_mut().zip(tree.predict(x)?) {
                *p += lr * step;
            }
            for (t, v) in total.iter_mut().zip(&tree.importances) {
                *t += v;
            }
            trees.push(tree);
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            total.iter_mut().for_each(|t| *t /= sum);
        }
        self.trees = trees;
        self.importances = Some(total);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(MlError::NotFitted("GradientBoostingRegressor"));
        }
        let lr = self.params.learning_rate;
        let mut predictions = vec![self.initial_prediction; x.rows()];
        for tree in &self.trees {
            for (p, step) in predictions.iter_mut().zip(tree.predict(x)?) {
                *p += lr * step;
            }
        }
        Ok(predictions)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.importances.clone()
    }

    fn clone_unfitted(&self) -> Box<dyn Regressor> {
        Box::new(GradientBoostingRegressor::new(self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn quadratic(n: usize) -> (Matrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64 / n as f64 * 4.0 - 2.0]).collect();
        let y = rows.iter().map(|r| r[0] * r[0]).collect();
        (Matrix::from_rows(&rows).unwrap(), y)
    }

    fn mae(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(p, t)| (p - t).abs()).sum::<f64>() / a.len() as f64
    }

    #[test]
    fn test_gradient_boosting() {
        let (x, y) = quadratic(50);
        let mut gb = GradientBoostingRegressor::default();
        gb.fit(&x, &y).unwrap();
        assert_eq!(gb.n_trees(), 100);

        let pred = gb.predict(&x).unwrap();
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let baseline = vec![mean; y.len()];
        assert!(mae(&pred, &y) < 0.2 * mae(&baseline, &y));
    }

    #[test]
    fn test_more_stages_fit_better() {
        let (x, y) = quadratic(50);
        let mut few = GradientBoostingRegressor::new(GradientBoostingParams {
            n_estimators: 5,
            ..GradientBoostingParams::default()
        });
        let mut many = GradientBoostingRegressor::new(GradientBoostingParams {
            n_estimators: 50,
            ..GradientBoostingParams::default()
        });
        few.fit(&x, &y).unwrap();
        many.fit(&x, &y).unwrap();
        assert!(mae(&many.predict(&x).unwrap(), &y) < mae(&few.predict(&x).unwrap(), &y));
    }

    #[test]
    fn test_subsample_is_seeded() {
        let (x, y) = quadratic(40);
        let params = GradientBoostingParams {
            n_estimators: 20,
            subsample: 0.5,
            ..GradientBoostingParams::default()
        };
        let mut a = GradientBoostingRegressor::new(params);
        let mut b = GradientBoostingRegressor::new(params);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());

        let imp = a.feature_importances().unwrap();
        assert_abs_diff_eq!(imp[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        let (x, y) = quadratic(10);
        for params in [
            GradientBoostingParams {
                learning_rate: 0.0,
                ..GradientBoostingParams::default()
            },
            GradientBoostingParams {
                subsample: 1.5,
                ..GradientBoostingParams::default()
            },
            GradientBoostingParams {
                max_depth: 0,
                ..GradientBoostingParams::default()
            },
        ] {
            let mut gb = GradientBoostingRegressor::new(params);
            assert!(matches!(gb.fit(&x, &y), Err(MlError::InvalidParameter(_))));
        }
    }
}
