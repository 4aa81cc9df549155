use homeval_data::TargetTransform;
use homeval_metrics::{mae, r2_score, rmse};
use homeval_model_selection::{CandidateOutcome, CandidateScore};
use homeval_pipeline::FeatureImportance;
use homeval_tree::RandomForestParams;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Held-out metrics of one fitted model, on the original target scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl TestMetrics {
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        TestMetrics {
            mae: mae(actual, predicted),
            rmse: rmse(actual, predicted),
            r2: r2_score(actual, predicted),
        }
    }
}

/// One actual/predicted pair of the test split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub actual: f64,
    pub predicted: f64,
}

/// Everything an analysis run reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub target_transform: TargetTransform,
    pub candidates: Vec<CandidateScore>,
    pub best_params: RandomForestParams,
    pub best_cv_mae: f64,
    pub best_cv_std: f64,
    pub failed_candidates: usize,
    /// Highest importances of the tuned model, at most `top_k` of them.
    pub top_importances: Vec<FeatureImportance>,
    pub tuned_test: TestMetrics,
    pub stacking_test: TestMetrics,
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.candidates {
            match &row.outcome {
                CandidateOutcome::Scored(s) => {
                    writeln!(f, "{} MAE: {:.4} (+/- {:.4})", row.name, s.mean, s.std)?
                }
                CandidateOutcome::Failed { reason } => writeln!(f, "{} failed: {reason}", row.name)?,
            }
        }

        let p = &self.best_params;
        writeln!(
            f,
            "Best Parameters: {{n_estimators: {}, max_depth: {}, min_samples_split: {}, min_samples_leaf: {}}}",
            p.n_estimators,
            p.max_depth.map_or_else(|| "None".to_string(), |d| d.to_string()),
            p.min_samples_split,
            p.min_samples_leaf
        )?;
        writeln!(f, "Best Mean Absolute Error: {:.4}", self.best_cv_mae)?;
        if self.failed_candidates > 0 {
            writeln!(f, "Failed search candidates: {}", self.failed_candidates)?;
        }

        writeln!(f, "Top {} Feature Importances:", self.top_importances.len())?;
        let width = self
            .top_importances
            .iter()
            .map(|fi| fi.feature.len())
            .max()
            .unwrap_or(0);
        for (rank, fi) in self.top_importances.iter().enumerate() {
            writeln!(
                f,
                "{:>3}. {:<width$}  {:.6}",
                rank + 1,
                fi.feature,
                fi.importance
            )?;
        }

        writeln!(f, "Tuned Model Test MAE: {:.4}", self.tuned_test.mae)?;
        write!(f, "Stacking Model MAE: {:.4}", self.stacking_test.mae)
    }
}
