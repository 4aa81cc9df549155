//! Dataset preparation: column dropping, target extraction, outlier
//! filtering and the numeric/categorical partition.

use crate::error::{DataError, DataResult};
use crate::frame::{Column, Frame};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How the target is transformed before fitting.
///
/// Predictions are always mapped back with [`TargetTransform::inverse`], so
/// every reported metric lives on the original scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTransform {
    Identity,
    /// `ln(1 + y)` forward, `exp(x) - 1` back.
    #[default]
    Log1p,
}

impl TargetTransform {
    pub fn forward(self, y: f64) -> f64 {
        match self {
            TargetTransform::Identity => y,
            TargetTransform::Log1p => y.ln_1p(),
        }
    }

    pub fn inverse(self, x: f64) -> f64 {
        match self {
            TargetTransform::Identity => x,
            TargetTransform::Log1p => x.exp_m1(),
        }
    }

    pub fn forward_all(self, ys: &[f64]) -> Vec<f64> {
        ys.iter().map(|&y| self.forward(y)).collect()
    }

    pub fn inverse_all(self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.inverse(x)).collect()
    }

    /// Check that every value lies in the transform's domain.
    pub fn validate(self, ys: &[f64]) -> DataResult<()> {
        if let TargetTransform::Log1p = self {
            if let Some(bad) = ys.iter().find(|&&y| y <= -1.0) {
                return Err(DataError::InvalidTarget(format!(
                    "log1p transform needs values > -1, found {bad}"
                )));
            }
        }
        Ok(())
    }
}

/// Knobs of the preparation stage. Defaults fit the house-prices table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparationConfig {
    pub target: String,
    /// Sparse columns and the row identifier.
    pub drop_columns: Vec<String>,
    /// Keep only rows whose target lies in `outlier_percentiles`.
    pub clip_target_outliers: bool,
    /// Inclusive `(low, high)` percentile band, each in `[0, 100]`.
    pub outlier_percentiles: (f64, f64),
    pub target_transform: TargetTransform,
}

impl Default for PreparationConfig {
    fn default() -> Self {
        PreparationConfig {
            target: "SalePrice".to_string(),
            drop_columns: ["Alley", "PoolQC", "Fence", "MiscFeature", "Id"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            clip_target_outliers: false,
            outlier_percentiles: (1.0, 99.0),
            target_transform: TargetTransform::Log1p,
        }
    }
}

impl PreparationConfig {
    pub fn validate(&self) -> DataResult<()> {
        let (lo, hi) = self.outlier_percentiles;
        if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) || lo >= hi {
            return Err(DataError::InvalidConfig(format!(
                "outlier percentiles must satisfy 0 <= low < high <= 100, got ({lo}, {hi})"
            )));
        }
        if self.drop_columns.iter().any(|c| c == &self.target) {
            return Err(DataError::InvalidConfig(format!(
                "target '{}' is also listed for dropping",
                self.target
            )));
        }
        Ok(())
    }
}

/// Feature names split by storage type, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeaturePartition {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeaturePartition {
    pub fn from_frame(frame: &Frame) -> Self {
        let mut partition = FeaturePartition::default();
        for (name, column) in frame.iter() {
            match column {
                Column::Numeric(_) => partition.numeric.push(name.to_string()),
                Column::Categorical(_) => partition.categorical.push(name.to_string()),
            }
        }
        partition
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Output of [`prepare`]: row-aligned features and target.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    pub features: Frame,
    /// Original-scale target, free of missing values.
    pub target: Vec<f64>,
    pub partition: FeaturePartition,
    pub target_transform: TargetTransform,
}

impl PreparedData {
    pub fn n_rows(&self) -> usize {
        self.target.len()
    }
}

/// Percentile of an ascending slice with linear interpolation between
/// order statistics. `q` is in `[0, 100]`.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = q / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Turn a raw table into row-aligned features and target.
pub fn prepare(frame: &Frame, config: &PreparationConfig) -> DataResult<PreparedData> {
    config.validate()?;

    let target_column = frame.require(&config.target)?;
    let raw_target = target_column
        .as_numeric()
        .ok_or_else(|| DataError::NonNumericTarget(config.target.clone()))?;

    let features = frame.drop_columns(&config.drop_columns)?;
    let features = features.drop_columns(&[config.target.as_str()])?;
    info!(
        dropped = config.drop_columns.len(),
        remaining = features.n_cols(),
        "dropped configured columns"
    );

    let mut keep: Vec<usize> = Vec::with_capacity(raw_target.len());
    let mut target: Vec<f64> = Vec::with_capacity(raw_target.len());
    for (i, value) in raw_target.iter().enumerate() {
        if let Some(v) = value {
            keep.push(i);
            target.push(*v);
        }
    }
    let missing = raw_target.len() - keep.len();
    if missing > 0 {
        warn!(rows = missing, column = %config.target, "dropping rows with missing target");
    }
    if target.is_empty() {
        return Err(DataError::EmptyDataset);
    }

    if config.clip_target_outliers {
        let mut sorted = target.clone();
        sorted.sort_by(f64::total_cmp);
        let (lo_q, hi_q) = config.outlier_percentiles;
        let lo = percentile(&sorted, lo_q);
        let hi = percentile(&sorted, hi_q);

        let before = keep.len();
        let (kept_rows, kept_target): (Vec<usize>, Vec<f64>) = keep
            .into_iter()
            .zip(target)
            .filter(|&(_, y)| y >= lo && y <= hi)
            .unzip();
        keep = kept_rows;
        target = kept_target;
        info!(
            low = lo,
            high = hi,
            removed = before - keep.len(),
            "filtered target outliers"
        );
    }

    config.target_transform.validate(&target)?;

    let features = if keep.len() == frame.n_rows() {
        features
    } else {
        features.take_rows(&keep)
    };
    let partition = FeaturePartition::from_frame(&features);
    debug!(
        numeric = partition.numeric.len(),
        categorical = partition.categorical.len(),
        "partitioned feature columns"
    );

    Ok(PreparedData {
        features,
        target,
        partition,
        target_transform: config.target_transform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config_for(target: &str, drop: &[&str]) -> PreparationConfig {
        PreparationConfig {
            target: target.to_string(),
            drop_columns: drop.iter().map(|s| s.to_string()).collect(),
            ..PreparationConfig::default()
        }
    }

    fn table() -> Frame {
        Frame::new(
            vec![
                "Id".into(),
                "Area".into(),
                "Zone".into(),
                "Alley".into(),
                "Price".into(),
            ],
            vec![
                Column::Numeric((1..=6).map(|i| Some(i as f64)).collect()),
                Column::Numeric(vec![
                    Some(50.0),
                    None,
                    Some(70.0),
                    Some(80.0),
                    Some(90.0),
                    Some(100.0),
                ]),
                Column::Categorical(
                    ["A", "B", "A", "C", "B", "A"]
                        .iter()
                        .map(|s| Some(s.to_string()))
                        .collect(),
                ),
                Column::Categorical(vec![None; 6]),
                Column::Numeric(vec![
                    Some(100.0),
                    Some(200.0),
                    None,
                    Some(400.0),
                    Some(500.0),
                    Some(10_000.0),
                ]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_drops_and_aligns() {
        let prepared = prepare(&table(), &config_for("Price", &["Id", "Alley"])).unwrap();
        assert_eq!(prepared.n_rows(), 5);
        assert_eq!(prepared.features.n_rows(), 5);
        assert_eq!(
            prepared.features.names(),
            &["Area".to_string(), "Zone".to_string()]
        );
        assert_eq!(prepared.target, vec![100.0, 200.0, 400.0, 500.0, 10_000.0]);
        // Row with missing target (index 2) is gone from the features too.
        assert_eq!(
            prepared.features.column("Area").unwrap().as_numeric().unwrap(),
            &[Some(50.0), None, Some(80.0), Some(90.0), Some(100.0)]
        );
        assert_eq!(prepared.partition.numeric, vec!["Area".to_string()]);
        assert_eq!(prepared.partition.categorical, vec!["Zone".to_string()]);
    }

    #[test]
    fn test_prepare_missing_columns() {
        let err = prepare(&table(), &config_for("SalePrice", &["Id"])).unwrap_err();
        assert_eq!(err, DataError::ColumnNotFound("SalePrice".into()));

        let err = prepare(&table(), &config_for("Price", &["Id", "PoolQC"])).unwrap_err();
        assert_eq!(err, DataError::DropColumnNotFound("PoolQC".into()));
    }

    #[test]
    fn test_prepare_rejects_categorical_target() {
        let err = prepare(&table(), &config_for("Zone", &[])).unwrap_err();
        assert_eq!(err, DataError::NonNumericTarget("Zone".into()));
    }

    #[test]
    fn test_outlier_filter_keeps_band() {
        let mut config = config_for("Price", &["Id", "Alley"]);
        config.clip_target_outliers = true;
        config.outlier_percentiles = (10.0, 90.0);
        let prepared = prepare(&table(), &config).unwrap();
        // Band over [100, 200, 400, 500, 10000] is [140, 6200].
        assert_eq!(prepared.target, vec![200.0, 400.0, 500.0]);
        assert_eq!(prepared.features.n_rows(), 3);
        // Surviving feature rows are the ones that carried the kept targets.
        let area = prepared.features.column("Area").unwrap().as_numeric().unwrap();
        assert_eq!(area, &[None, Some(80.0), Some(90.0)]);
        let zone = prepared.features.column("Zone").unwrap().as_categorical().unwrap();
        let zone: Vec<&str> = zone.iter().map(|z| z.as_deref().unwrap()).collect();
        assert_eq!(zone, vec!["B", "C", "B"]);
    }

    #[test]
    fn test_log1p_domain_checked() {
        let frame = Frame::new(
            vec!["x".into(), "y".into()],
            vec![
                Column::Numeric(vec![Some(1.0), Some(2.0)]),
                Column::Numeric(vec![Some(-1.0), Some(3.0)]),
            ],
        )
        .unwrap();
        let err = prepare(&frame, &config_for("y", &[])).unwrap_err();
        assert!(matches!(err, DataError::InvalidTarget(_)));

        let mut config = config_for("y", &[]);
        config.target_transform = TargetTransform::Identity;
        assert!(prepare(&frame, &config).is_ok());
    }

    #[test]
    fn test_transform_round_trip() {
        for &y in &[0.0, 1.5, 34_900.0, 755_000.0] {
            let t = TargetTransform::Log1p;
            assert_abs_diff_eq!(t.inverse(t.forward(y)), y, epsilon = 1e-6 * y.max(1.0));
        }
        assert_eq!(TargetTransform::Identity.forward(3.25), 3.25);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(percentile(&sorted, 0.0), 1.0);
        assert_abs_diff_eq!(percentile(&sorted, 50.0), 2.5);
        assert_abs_diff_eq!(percentile(&sorted, 100.0), 4.0);
    }

    #[test]
    fn test_invalid_band_is_config_error() {
        let mut config = PreparationConfig::default();
        config.outlier_percentiles = (99.0, 1.0);
        assert!(matches!(config.validate(), Err(DataError::InvalidConfig(_))));
    }
}
