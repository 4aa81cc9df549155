use homeval_core::{check_xy, Matrix, MlError, MlResult, Regressor};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Growth limits shared by every tree-based model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or hit the sample limits.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features examined per split; `None` examines all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

impl TreeParams {
    pub fn validate(&self) -> MlResult<()> {
        if self.max_depth == Some(0) {
            return Err(MlError::InvalidParameter("max_depth must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(MlError::InvalidParameter(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(MlError::InvalidParameter("min_samples_leaf must be at least 1".into()));
        }
        if self.max_features == Some(0) {
            return Err(MlError::InvalidParameter("max_features must be at least 1".into()));
        }
        Ok(())
    }
}

/// A node in the regression tree.
#[derive(Debug, Clone)]
enum TreeNode {
    /// Internal node: rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf { value: f64 },
}

impl TreeNode {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// A grown tree with its normalized impurity-decrease importances.
#[derive(Debug, Clone)]
pub(crate) struct GrownTree {
    root: TreeNode,
    n_features: usize,
    pub(crate) importances: Vec<f64>,
}

impl GrownTree {
    pub(crate) fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        if x.cols() != self.n_features {
            return Err(MlError::ShapeMismatch {
                expected: (x.rows(), self.n_features),
                got: x.shape(),
            });
        }
        Ok((0..x.rows()).map(|i| self.root.predict_row(x.row(i))).collect())
    }
}

struct Candidate {
    score: f64,
    feature: usize,
    threshold: f64,
}

struct TreeBuilder<'a> {
    x: &'a Matrix,
    y: &'a [f64],
    params: &'a TreeParams,
    features: Vec<usize>,
    n_candidates: usize,
    decrease: Vec<f64>,
    rng: &'a mut StdRng,
}

/// Midpoint between two distinct sorted values, kept strictly below `hi`.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo / 2.0 + hi / 2.0;
    if mid >= hi || !mid.is_finite() {
        lo
    } else {
        mid
    }
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let m = indices.len();
        let sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let mean = sum / m as f64;

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        let first = self.y[indices[0]];
        let pure = indices.iter().all(|&i| self.y[i] == first);
        if depth_reached
            || pure
            || m < self.params.min_samples_split
            || m < 2 * self.params.min_samples_leaf
        {
            return TreeNode::Leaf { value: mean };
        }

        let Some(best) = self.best_split(&indices, sum) else {
            return TreeNode::Leaf { value: mean };
        };
        // SSE decrease equals the gain of the split score over the parent's.
        let gain = best.score - sum * sum / m as f64;
        self.decrease[best.feature] += gain.max(0.0);

        let x = self.x;
        let p = x.cols();
        let data = x.data();
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| data[i * p + best.feature] <= best.threshold);

        let left = self.build(left, depth + 1);
        let right = self.build(right, depth + 1);
        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Scan sorted values of each candidate feature. Minimizing the children's
    /// squared error is the same as maximizing `Σl²/nl + Σr²/nr`.
    fn best_split(&mut self, indices: &[usize], sum: f64) -> Option<Candidate> {
        let m = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let x = self.x;
        let p = x.cols();
        let data = x.data();

        if self.n_candidates < p {
            self.features.shuffle(&mut *self.rng);
        }

        let mut best: Option<Candidate> = None;
        let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(m);
        for &f in &self.features[..self.n_candidates] {
            sorted.clear();
            sorted.extend(indices.iter().map(|&i| (data[i * p + f], self.y[i])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
            if sorted[0].0 == sorted[m - 1].0 {
                continue;
            }

            let mut left_sum = 0.0;
            for k in 1..m {
                left_sum += sorted[k - 1].1;
                if k < min_leaf || m - k < min_leaf || sorted[k - 1].0 == sorted[k].0 {
                    continue;
                }
                let right_sum = sum - left_sum;
                let score = left_sum * left_sum / k as f64 + right_sum * right_sum / (m - k) as f64;
                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(Candidate {
                        score,
                        feature: f,
                        threshold: midpoint(sorted[k - 1].0, sorted[k].0),
                    });
                }
            }
        }
        best
    }
}

/// Grow one tree on `indices` (repeats allowed, as in bootstrap samples).
pub(crate) fn grow_tree(
    x: &Matrix,
    y: &[f64],
    indices: Vec<usize>,
    params: &TreeParams,
    rng: &mut StdRng,
) -> MlResult<GrownTree> {
    if indices.is_empty() {
        return Err(MlError::EmptyInput("cannot grow a tree on zero rows".into()));
    }
    let p = x.cols();
    let n_candidates = params.max_features.map_or(p, |k| k.min(p));
    let mut builder = TreeBuilder {
        x,
        y,
        params,
        features: (0..p).collect(),
        n_candidates,
        decrease: vec![0.0; p],
        rng,
    };
    let root = builder.build(indices, 0);

    let total: f64 = builder.decrease.iter().sum();
    let importances = if total > 0.0 {
        builder.decrease.iter().map(|d| d / total).collect()
    } else {
        vec![0.0; p]
    };
    Ok(GrownTree {
        root,
        n_features: p,
        importances,
    })
}

/// Reject inputs a tree cannot order.
pub(crate) fn check_tree_input(x: &Matrix, y: &[f64]) -> MlResult<()> {
    check_xy(x, y)?;
    if !x.all_finite() {
        return Err(MlError::NonFinite("tree models need finite features".into()));
    }
    Ok(())
}

/// Decision Tree Regressor using CART (squared-error criterion).
#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    pub params: TreeParams,
    /// Seeds feature subsampling when `max_features` is set.
    pub seed: u64,
    tree: Option<GrownTree>,
}

impl DecisionTreeRegressor {
    pub fn new(params: TreeParams) -> Self {
        DecisionTreeRegressor {
            params,
            seed: 42,
            tree: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(|t| t.root.depth())
    }

    pub fn n_leaves(&self) -> Option<usize> {
        self.tree.as_ref().map(|t| t.root.n_leaves())
    }
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        DecisionTreeRegressor::new(TreeParams::default())
    }
}

impl Regressor for DecisionTreeRegressor {
    fn name(&self) -> &'static str {
        "Decision Tree"
    }

    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        check_tree_input(x, y)?;
        self.params.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.tree = Some(grow_tree(x, y, (0..x.rows()).collect(), &self.params, &mut rng)?);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        self.tree
            .as_ref()
            .ok_or(MlError::NotFitted("DecisionTreeRegressor"))?
            .predict(x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.tree.as_ref().map(|t| t.importances.clone())
    }

    fn clone_unfitted(&self) -> Box<dyn Regressor> {
        Box::new(DecisionTreeRegressor::new(self.params).with_seed(self.seed))
    }
}
