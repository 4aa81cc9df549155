use homeval_core::{MlError, MlResult};
use homeval_data::Frame;
use homeval_metrics::{mae, mean_std};
use homeval_pipeline::{NamedModel, Pipeline};
use homeval_preprocessing::KFold;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Per-fold MAE plus its mean and population standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvScores {
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

impl CvScores {
    pub fn from_folds(fold_scores: Vec<f64>) -> Self {
        let (mean, std) = mean_std(&fold_scores);
        CvScores {
            fold_scores,
            mean,
            std,
        }
    }
}

/// Result of evaluating one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Scored(CvScores),
    Failed { reason: String },
}

impl CandidateOutcome {
    pub fn scores(&self) -> Option<&CvScores> {
        match self {
            CandidateOutcome::Scored(scores) => Some(scores),
            CandidateOutcome::Failed { .. } => None,
        }
    }

    pub fn mean(&self) -> Option<f64> {
        self.scores().map(|s| s.mean)
    }
}

impl From<MlResult<CvScores>> for CandidateOutcome {
    fn from(result: MlResult<CvScores>) -> Self {
        match result {
            Ok(scores) => CandidateOutcome::Scored(scores),
            Err(e) => CandidateOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// A named row of a model comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub outcome: CandidateOutcome,
}

/// K-fold MAE of `pipeline`, on the original target scale.
///
/// Every fold refits the whole pipeline on its training rows, so no statistic
/// from a held-out fold leaks into preprocessing. Folds run in parallel and
/// scores come back in fold order.
pub fn cross_val_score(
    pipeline: &Pipeline,
    features: &Frame,
    target: &[f64],
    folds: &KFold,
) -> MlResult<CvScores> {
    if features.n_rows() != target.len() {
        return Err(MlError::DimensionMismatch(format!(
            "{} feature rows but {} targets",
            features.n_rows(),
            target.len()
        )));
    }

    let splits = folds.split(target.len())?;
    let fold_scores = splits
        .par_iter()
        .enumerate()
        .map(|(k, fold)| -> MlResult<f64> {
            let y_train: Vec<f64> = fold.train.iter().map(|&i| target[i]).collect();
            let y_test: Vec<f64> = fold.test.iter().map(|&i| target[i]).collect();
            let fitted = pipeline.fit(&features.take_rows(&fold.train), &y_train)?;
            let predictions = fitted.predict(&features.take_rows(&fold.test))?;

            let score = mae(&y_test, &predictions);
            if !score.is_finite() {
                return Err(MlError::NonFinite(format!("fold {k} score")));
            }
            debug!(model = pipeline.model.label(), fold = k, mae = score, "fold scored");
            Ok(score)
        })
        .collect::<MlResult<Vec<f64>>>()?;

    Ok(CvScores::from_folds(fold_scores))
}

/// Cross-validate each candidate in turn. A failing candidate is kept as a
/// `Failed` row and does not stop the others.
pub fn compare_models(
    template: &Pipeline,
    candidates: &[NamedModel],
    features: &Frame,
    target: &[f64],
    folds: &KFold,
) -> Vec<CandidateScore> {
    candidates
        .iter()
        .map(|candidate| {
            let pipeline = template.with_model(candidate.spec.clone());
            let outcome = CandidateOutcome::from(cross_val_score(&pipeline, features, target, folds));
            match &outcome {
                CandidateOutcome::Scored(s) => {
                    info!(model = %candidate.name, mean = s.mean, std = s.std, "candidate scored")
                }
                CandidateOutcome::Failed { reason } => {
                    warn!(model = %candidate.name, %reason, "candidate failed")
                }
            }
            CandidateScore {
                name: candidate.name.clone(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use homeval_data::{Column, FeaturePartition, TargetTransform};
    use homeval_pipeline::ModelSpec;

    fn table(n: usize) -> (Frame, Vec<f64>) {
        let a: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64)).collect();
        let b: Vec<Option<f64>> = (0..n).map(|i| Some(((i * 7) % 11) as f64)).collect();
        let target = (0..n).map(|i| 5.0 + 2.0 * i as f64 + ((i * 7) % 11) as f64).collect();
        let frame = Frame::new(
            vec!["a".into(), "b".into()],
            vec![Column::Numeric(a), Column::Numeric(b)],
        )
        .unwrap();
        (frame, target)
    }

    fn template(frame: &Frame) -> Pipeline {
        Pipeline::new(
            &FeaturePartition::from_frame(frame),
            ModelSpec::LinearRegression,
            TargetTransform::Identity,
        )
    }

    #[test]
    fn test_exact_model_scores_zero() {
        let (frame, target) = table(30);
        let scores = cross_val_score(&template(&frame), &frame, &target, &KFold::new(5)).unwrap();
        assert_eq!(scores.fold_scores.len(), 5);
        assert_abs_diff_eq!(scores.mean, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(scores.std, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_scores_are_reproducible() {
        let (frame, target) = table(40);
        let pipe = template(&frame).with_model(ModelSpec::RandomForest(
            homeval_tree::RandomForestParams {
                n_estimators: 10,
                ..Default::default()
            },
        ));
        let first = cross_val_score(&pipe, &frame, &target, &KFold::new(4)).unwrap();
        let second = cross_val_score(&pipe, &frame, &target, &KFold::new(4)).unwrap();
        assert_eq!(first, second);
        assert!(first.mean > 0.0);
    }

    #[test]
    fn test_compare_keeps_order_and_failures() {
        let (frame, target) = table(30);
        let candidates = vec![
            NamedModel::new("ols", ModelSpec::LinearRegression),
            NamedModel::new("bad ridge", ModelSpec::Ridge { alpha: -1.0 }),
            NamedModel::new("ridge", ModelSpec::Ridge { alpha: 0.1 }),
        ];
        let rows = compare_models(&template(&frame), &candidates, &frame, &target, &KFold::new(3));
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ols", "bad ridge", "ridge"]);
        assert!(rows[0].outcome.scores().is_some());
        assert!(matches!(rows[1].outcome, CandidateOutcome::Failed { .. }));
        assert!(rows[2].outcome.mean().unwrap() >= 0.0);
    }

    #[test]
    fn test_too_few_rows() {
        let (frame, target) = table(3);
        assert!(cross_val_score(&template(&frame), &frame, &target, &KFold::new(5)).is_err());
    }
}
