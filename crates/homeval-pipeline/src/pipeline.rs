use crate::model_spec::ModelSpec;

use homeval_core::{MlError, MlResult, Regressor};
use homeval_data::{FeaturePartition, Frame, TargetTransform};
use homeval_preprocessing::{FittedPreprocessor, Preprocessor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One entry of a feature-importance ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Unfitted chain: preprocessing, target transform, regressor.
///
/// `fit` takes `&self` and returns a separate [`FittedPipeline`], so one
/// recipe can be fitted on many folds concurrently.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub preprocessor: Preprocessor,
    pub model: ModelSpec,
    pub target_transform: TargetTransform,
}

impl Pipeline {
    pub fn new(
        partition: &FeaturePartition,
        model: ModelSpec,
        target_transform: TargetTransform,
    ) -> Self {
        Pipeline {
            preprocessor: Preprocessor::new(partition),
            model,
            target_transform,
        }
    }

    pub fn with_model(&self, model: ModelSpec) -> Self {
        Pipeline {
            preprocessor: self.preprocessor.clone(),
            model,
            target_transform: self.target_transform,
        }
    }

    /// Fit preprocessing then the regressor. `target` is on the original scale.
    pub fn fit(&self, features: &Frame, target: &[f64]) -> MlResult<FittedPipeline> {
        if features.n_rows() != target.len() {
            return Err(MlError::DimensionMismatch(format!(
                "{} feature rows but {} targets",
                features.n_rows(),
                target.len()
            )));
        }
        let preprocessor = self.preprocessor.fit(features)?;
        let x = preprocessor.transform(features)?;
        let y = self.target_transform.forward_all(target);
        if y.iter().any(|v| !v.is_finite()) {
            return Err(MlError::NonFinite(format!(
                "target is outside the domain of {:?}",
                self.target_transform
            )));
        }

        let mut model = self.model.build();
        model.fit(&x, &y)?;
        debug!(
            model = model.name(),
            rows = x.rows(),
            features = x.cols(),
            "pipeline fitted"
        );

        Ok(FittedPipeline {
            preprocessor,
            model,
            target_transform: self.target_transform,
        })
    }
}

/// A fitted pipeline. Read-only after construction.
pub struct FittedPipeline {
    preprocessor: FittedPreprocessor,
    model: Box<dyn Regressor>,
    target_transform: TargetTransform,
}

impl FittedPipeline {
    /// Predict on the original target scale.
    pub fn predict(&self, features: &Frame) -> MlResult<Vec<f64>> {
        let x = self.preprocessor.transform(features)?;
        let raw = self.model.predict(&x)?;
        let predictions = self.target_transform.inverse_all(&raw);
        if predictions.iter().any(|v| !v.is_finite()) {
            return Err(MlError::NonFinite(format!(
                "{} produced non-finite predictions",
                self.model.name()
            )));
        }
        Ok(predictions)
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    /// Importances paired with output feature names, highest first.
    /// Ties keep output column order.
    pub fn ranked_importances(&self) -> Option<Vec<FeatureImportance>> {
        let importances = self.model.feature_importances()?;
        let mut ranked: Vec<FeatureImportance> = self
            .feature_names()
            .into_iter()
            .zip(importances)
            .map(|(feature, importance)| FeatureImportance {
                feature,
                importance,
            })
            .collect();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Some(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use homeval_data::Column;
    use homeval_tree::TreeParams;

    fn table(n: usize) -> (Frame, Vec<f64>) {
        let size: Vec<Option<f64>> = (0..n).map(|i| Some(50.0 + i as f64)).collect();
        let zone: Vec<Option<String>> = (0..n)
            .map(|i| Some(if i % 2 == 0 { "A" } else { "B" }.to_string()))
            .collect();
        let target = (0..n).map(|i| 1000.0 + 10.0 * i as f64).collect();
        let frame = Frame::new(
            vec!["Size".into(), "Zone".into()],
            vec![Column::Numeric(size), Column::Categorical(zone)],
        )
        .unwrap();
        (frame, target)
    }

    fn pipeline(model: ModelSpec, transform: TargetTransform) -> (Pipeline, Frame, Vec<f64>) {
        let (frame, target) = table(40);
        let partition = FeaturePartition::from_frame(&frame);
        (Pipeline::new(&partition, model, transform), frame, target)
    }

    #[test]
    fn test_log_target_predictions_on_original_scale() {
        let (pipe, frame, target) = pipeline(ModelSpec::LinearRegression, TargetTransform::Log1p);
        let fitted = pipe.fit(&frame, &target).unwrap();
        let pred = fitted.predict(&frame).unwrap();
        // log1p of a linear target is nearly linear over this range.
        for (p, t) in pred.iter().zip(&target) {
            assert!((p - t).abs() / t < 0.05, "{p} vs {t}");
        }
    }

    #[test]
    fn test_identity_linear_is_exact() {
        let (pipe, frame, target) =
            pipeline(ModelSpec::LinearRegression, TargetTransform::Identity);
        let fitted = pipe.fit(&frame, &target).unwrap();
        for (p, t) in fitted.predict(&frame).unwrap().iter().zip(&target) {
            assert_abs_diff_eq!(p, t, epsilon = 1e-6);
        }
        assert_eq!(fitted.model_name(), "Linear Regression");
        assert!(fitted.ranked_importances().is_none());
    }

    #[test]
    fn test_ranked_importances() {
        let (pipe, frame, target) = pipeline(
            ModelSpec::DecisionTree(TreeParams::default()),
            TargetTransform::Identity,
        );
        let fitted = pipe.fit(&frame, &target).unwrap();
        let ranked = fitted.ranked_importances().unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].feature, "Size");
        assert!(ranked.windows(2).all(|w| w[0].importance >= w[1].importance));
        let total: f64 = ranked.iter().map(|r| r.importance).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_row_mismatch() {
        let (pipe, frame, target) =
            pipeline(ModelSpec::LinearRegression, TargetTransform::Identity);
        assert!(matches!(
            pipe.fit(&frame, &target[..10]),
            Err(MlError::DimensionMismatch(_))
        ));
    }
}
