//! Per-type preprocessing of a [`Frame`] into a dense design matrix.
//!
//! Numeric columns go through mean imputation then standard scaling;
//! categorical columns through most-frequent imputation then one-hot
//! encoding. The output holds the numeric block first.

use crate::encoder::OneHotEncoder;
use crate::imputer::{MeanImputer, MostFrequentImputer};
use crate::scaler::StandardScaler;

use homeval_core::{Matrix, MlError, MlResult};
use homeval_data::{Column, FeaturePartition, Frame};
use tracing::debug;

/// Unfitted preprocessing recipe: which columns take which path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessor {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

/// Preprocessing with learned statistics. Only read after `fit`.
#[derive(Debug, Clone)]
pub struct FittedPreprocessor {
    numeric: Vec<String>,
    categorical: Vec<String>,
    mean_imputers: Vec<MeanImputer>,
    scaler: StandardScaler,
    mode_imputers: Vec<MostFrequentImputer>,
    encoder: OneHotEncoder,
}

fn numeric_column<'a>(frame: &'a Frame, name: &str) -> MlResult<&'a [Option<f64>]> {
    match frame.column(name) {
        Some(Column::Numeric(values)) => Ok(values.as_slice()),
        Some(Column::Categorical(_)) => Err(MlError::InvalidInput(format!(
            "column '{name}' was numeric at fit time but is categorical"
        ))),
        None => Err(MlError::InvalidInput(format!("missing column '{name}'"))),
    }
}

fn categorical_column<'a>(frame: &'a Frame, name: &str) -> MlResult<&'a [Option<String>]> {
    match frame.column(name) {
        Some(Column::Categorical(values)) => Ok(values.as_slice()),
        Some(Column::Numeric(_)) => Err(MlError::InvalidInput(format!(
            "column '{name}' was categorical at fit time but is numeric"
        ))),
        None => Err(MlError::InvalidInput(format!("missing column '{name}'"))),
    }
}

impl Preprocessor {
    pub fn new(partition: &FeaturePartition) -> Self {
        Preprocessor {
            numeric: partition.numeric.clone(),
            categorical: partition.categorical.clone(),
        }
    }

    pub fn fit(&self, frame: &Frame) -> MlResult<FittedPreprocessor> {
        if frame.n_rows() == 0 {
            return Err(MlError::EmptyInput("cannot fit preprocessing on zero rows".into()));
        }

        let mut mean_imputers = Vec::with_capacity(self.numeric.len());
        let mut imputed = Vec::with_capacity(self.numeric.len());
        for name in &self.numeric {
            let mut imputer = MeanImputer::new();
            imputed.push(imputer.fit_transform(numeric_column(frame, name)?)?);
            mean_imputers.push(imputer);
        }
        let mut scaler = StandardScaler::new();
        if !imputed.is_empty() {
            scaler.fit(&Matrix::from_columns(&imputed)?)?;
        } else {
            scaler.fit(&Matrix::zeros(frame.n_rows(), 0))?;
        }

        let mut mode_imputers = Vec::with_capacity(self.categorical.len());
        let mut filled = Vec::with_capacity(self.categorical.len());
        for name in &self.categorical {
            let mut imputer = MostFrequentImputer::new();
            filled.push(imputer.fit_transform(categorical_column(frame, name)?)?);
            mode_imputers.push(imputer);
        }
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&filled);

        debug!(
            numeric = self.numeric.len(),
            indicators = encoder.n_outputs(),
            "fitted preprocessing"
        );

        Ok(FittedPreprocessor {
            numeric: self.numeric.clone(),
            categorical: self.categorical.clone(),
            mean_imputers,
            scaler,
            mode_imputers,
            encoder,
        })
    }
}

impl FittedPreprocessor {
    /// Apply the learned statistics. Unseen categories encode as zeros.
    pub fn transform(&self, frame: &Frame) -> MlResult<Matrix> {
        let rows = frame.n_rows();

        let mut imputed = Vec::with_capacity(self.numeric.len());
        for (name, imputer) in self.numeric.iter().zip(&self.mean_imputers) {
            imputed.push(imputer.transform(numeric_column(frame, name)?)?);
        }
        let raw = if imputed.is_empty() {
            Matrix::zeros(rows, 0)
        } else {
            Matrix::from_columns(&imputed)?
        };
        let numeric_block = self.scaler.transform(&raw)?;

        let mut filled = Vec::with_capacity(self.categorical.len());
        for (name, imputer) in self.categorical.iter().zip(&self.mode_imputers) {
            filled.push(imputer.transform(categorical_column(frame, name)?)?);
        }
        let indicator_block = if filled.is_empty() {
            Matrix::zeros(rows, 0)
        } else {
            self.encoder.transform(&filled)?
        };

        Matrix::hstack(&[&numeric_block, &indicator_block])
    }

    pub fn n_features_out(&self) -> usize {
        self.numeric.len() + self.encoder.n_outputs()
    }

    /// Numeric names followed by `"{column}_{category}"` indicator names.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric.clone();
        names.extend(self.encoder.feature_names(&self.categorical));
        names
    }
}
