use crate::error::{AnalysisError, AnalysisResult};

use homeval_data::PreparationConfig;
use homeval_model_selection::{ForestSearchSpace, RandomizedSearch};
use homeval_pipeline::{ModelSpec, NamedModel, StackingSpec};
use homeval_preprocessing::KFold;
use homeval_tree::{GradientBoostingParams, RandomForestParams};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of one analysis run.
///
/// Every field has a default, so a JSON override file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub preparation: PreparationConfig,
    /// Fraction of rows held out for testing; the test set has
    /// `ceil(n * test_size)` rows.
    pub test_size: f64,
    pub split_seed: u64,
    /// Folds for both the candidate comparison and the search.
    pub cv_folds: usize,
    pub candidates: Vec<NamedModel>,
    pub search_space: ForestSearchSpace,
    pub n_iter: usize,
    pub search_seed: u64,
    pub stacking: StackingSpec,
    /// Number of importances shown in the report.
    pub top_k: usize,
    /// Size of a dedicated worker pool; `None` uses the global rayon pool.
    pub n_jobs: Option<usize>,
}

/// The three models compared before tuning.
pub fn default_candidates() -> Vec<NamedModel> {
    vec![
        NamedModel::new(
            "Random Forest",
            ModelSpec::RandomForest(RandomForestParams::default()),
        ),
        NamedModel::new(
            "Gradient Boosting",
            ModelSpec::GradientBoosting(GradientBoostingParams::default()),
        ),
        NamedModel::new("Linear Regression", ModelSpec::LinearRegression),
    ]
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            preparation: PreparationConfig::default(),
            test_size: 0.2,
            split_seed: 42,
            cv_folds: 5,
            candidates: default_candidates(),
            search_space: ForestSearchSpace::default(),
            n_iter: 50,
            search_seed: 42,
            stacking: StackingSpec::default(),
            top_k: 20,
            n_jobs: None,
        }
    }
}

impl AnalysisConfig {
    /// Load a config from JSON; missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let config: AnalysisConfig = homeval_io::read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn folds(&self) -> KFold {
        KFold::new(self.cv_folds)
    }

    pub fn search(&self) -> RandomizedSearch {
        RandomizedSearch {
            space: self.search_space,
            n_iter: self.n_iter,
            folds: self.folds(),
            seed: self.search_seed,
            base: RandomForestParams::default(),
        }
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        self.preparation.validate()?;
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "test_size must lie in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.cv_folds < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.n_jobs == Some(0) {
            return Err(AnalysisError::InvalidConfig("n_jobs must be at least 1".into()));
        }
        if self.stacking.estimators.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "stacking needs at least one base estimator".into(),
            ));
        }
        self.search().validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.preparation.target, "SalePrice");
        let names: Vec<&str> = config.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Random Forest", "Gradient Boosting", "Linear Regression"]);
        assert_eq!(config.search().n_iter, 50);
        assert_eq!(config.search().folds, KFold::new(5));
    }

    #[test]
    fn test_partial_json_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "n_iter": 5, "top_k": 3, "preparation": { "target_transform": "identity" } }"#,
        )
        .unwrap();

        let config = AnalysisConfig::from_json_file(&path).unwrap();
        assert_eq!(config.n_iter, 5);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.preparation.target, "SalePrice");
        assert_eq!(
            config.preparation.target_transform,
            homeval_data::TargetTransform::Identity
        );
        assert_eq!(config.cv_folds, 5);
    }

    #[test]
    fn test_invalid_values() {
        let bad_split = AnalysisConfig { test_size: 1.0, ..AnalysisConfig::default() };
        assert!(matches!(bad_split.validate(), Err(AnalysisError::InvalidConfig(_))));

        let no_search = AnalysisConfig { n_iter: 0, ..AnalysisConfig::default() };
        assert!(matches!(no_search.validate(), Err(AnalysisError::Selection(_))));

        let no_workers = AnalysisConfig { n_jobs: Some(0), ..AnalysisConfig::default() };
        assert!(no_workers.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AnalysisConfig::from_json_file("/nonexistent/homeval.json").unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }
}
