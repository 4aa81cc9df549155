use homeval_core::{Matrix, MlError, MlResult, Regressor};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::decision_tree::{check_tree_input, grow_tree, GrownTree, TreeParams};

/// Hyperparameters of [`RandomForestRegressor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of features examined per split, in `(0, 1]`.
    pub max_features: f64,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        RandomForestParams {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 1.0,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl RandomForestParams {
    fn tree_params(&self, n_features: usize) -> TreeParams {
        let k = ((n_features as f64 * self.max_features).ceil() as usize).clamp(1, n_features.max(1));
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: (k < n_features).then_some(k),
        }
    }

    pub fn validate(&self) -> MlResult<()> {
        if self.n_estimators == 0 {
            return Err(MlError::InvalidParameter("n_estimators must be at least 1".into()));
        }
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return Err(MlError::InvalidParameter(format!(
                "max_features must lie in (0, 1], got {}",
                self.max_features
            )));
        }
        self.tree_params(1).validate()
    }
}

/// Random Forest Regressor: bagged CART trees averaged together.
///
/// Per-tree seeds come from one generator seeded with `params.seed`, so the
/// forest is identical however rayon schedules the trees.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    pub params: RandomForestParams,
    trees: Vec<GrownTree>,
    importances: Option<Vec<f64>>,
}

impl RandomForestRegressor {
    pub fn new(params: RandomForestParams) -> Self {
        RandomForestRegressor {
            params,
            trees: Vec::new(),
            importances: None,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        RandomForestRegressor::new(RandomForestParams::default())
    }
}

impl Regressor for RandomForestRegressor {
    fn name(&self) -> &'static str {
        "Random Forest"
    }

    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        check_tree_input(x, y)?;
        self.params.validate()?;

        let n = x.rows();
        let tree_params = self.params.tree_params(x.cols());
        let bootstrap = self.params.bootstrap;

        let mut base_rng = StdRng::seed_from_u64(self.params.seed);
        let seeds: Vec<u64> = (0..self.params.n_estimators).map(|_| base_rng.gen()).collect();

        let trees = seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let sample: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                grow_tree(x, y, sample, &tree_params, &mut rng)
            })
            .collect::<MlResult<Vec<_>>>()?;

        let mut total = vec![0.0; x.cols()];
        for tree in &trees {
            for (t, v) in total.iter_mut().zip(&tree.importances) {
                *t += v;
            }
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
            return Err(MlError::NotFitted("RandomForestRegressor"));
        }
        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<MlResult<Vec<_>>>()?;

        let mut sums = vec![0.0; x.rows()];
        for preds in &per_tree {
            for (s, p) in sums.iter_mut().zip(preds) {
                *s += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        Ok(sums.into_iter().map(|s| s / n_trees).collect())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.importances.clone()
    }

    fn clone_unfitted(&self) -> Box<dyn Regressor> {
        Box::new(RandomForestRegressor::new(self.params))
    }
}
