use homeval_core::Regressor;
use homeval_ensemble::StackingRegressor;
use homeval_linear::{LinearRegression, Ridge};
use homeval_preprocessing::KFold;
use homeval_tree::{
    DecisionTreeRegressor, GradientBoostingParams, GradientBoostingRegressor, RandomForestParams,
    RandomForestRegressor, TreeParams,
};

use serde::{Deserialize, Serialize};

/// Serializable description of an unfitted regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    RandomForest(RandomForestParams),
    GradientBoosting(GradientBoostingParams),
    LinearRegression,
    Ridge { alpha: f64 },
    DecisionTree(TreeParams),
    Stacking(StackingSpec),
}

/// A model spec with the display name used in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedModel {
    pub name: String,
    pub spec: ModelSpec,
}

impl NamedModel {
    pub fn new(name: impl Into<String>, spec: ModelSpec) -> Self {
        NamedModel {
            name: name.into(),
            spec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingSpec {
    pub estimators: Vec<NamedModel>,
    pub final_estimator: Box<ModelSpec>,
    pub cv_folds: usize,
}

impl Default for StackingSpec {
    /// Random forest and gradient boosting under a least-squares meta model.
    fn default() -> Self {
        StackingSpec {
            estimators: vec![
                NamedModel::new("rf", ModelSpec::RandomForest(RandomForestParams::default())),
                NamedModel::new(
                    "gb",
                    ModelSpec::GradientBoosting(GradientBoostingParams::default()),
                ),
            ],
            final_estimator: Box::new(ModelSpec::LinearRegression),
            cv_folds: 5,
        }
    }
}

impl ModelSpec {
    /// Instantiate a fresh, unfitted regressor.
    pub fn build(&self) -> Box<dyn Regressor> {
        match self {
            ModelSpec::RandomForest(params) => Box::new(RandomForestRegressor::new(*params)),
            ModelSpec::GradientBoosting(params) => {
                Box::new(GradientBoostingRegressor::new(*params))
            }
            ModelSpec::LinearRegression => Box::new(LinearRegression::new()),
            ModelSpec::Ridge { alpha } => Box::new(Ridge::new(*alpha)),
            ModelSpec::DecisionTree(params) => Box::new(DecisionTreeRegressor::new(*params)),
            ModelSpec::Stacking(spec) => {
                let estimators = spec
                    .estimators
                    .iter()
                    .map(|m| (m.name.clone(), m.spec.build()))
                    .collect();
                Box::new(
                    StackingRegressor::new(estimators, spec.final_estimator.build())
                        .with_cv(KFold::new(spec.cv_folds)),
                )
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelSpec::RandomForest(_) => "Random Forest",
            ModelSpec::GradientBoosting(_) => "Gradient Boosting",
            ModelSpec::LinearRegression => "Linear Regression",
            ModelSpec::Ridge { .. } => "Ridge",
            ModelSpec::DecisionTree(_) => "Decision Tree",
            ModelSpec::Stacking(_) => "Stacking",
        }
    }
}
