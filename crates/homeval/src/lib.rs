//! # homeval
//!
//! Single-run regression analysis of residential sale prices: prepare a
//! table, compare candidate models by cross-validation, tune a random forest
//! by randomized search, fit a stacking ensemble, and report.
//!
//! ## Crates
//!
//! - **core**: dense `Matrix` and the `Regressor` trait
//! - **linalg**: LU solver with diagonal jitter fallback
//! - **data**: typed table, target policy and preparation
//! - **io**: CSV input, CSV and JSON output
//! - **datasets**: synthetic housing table with a known signal
//! - **preprocessing**: imputers, scaler, one-hot encoder, splits and folds
//! - **linear**: ordinary least squares and ridge
//! - **tree**: decision tree, random forest, gradient boosting
//! - **metrics**: MAE, MSE, RMSE, R²
//! - **ensemble**: stacking regressor
//! - **pipeline**: preprocessing + regressor chains and model specs
//! - **model_selection**: cross-validation and randomized search

pub mod analysis;
pub mod config;
pub mod error;
pub mod report;

pub use analysis::{run, AnalysisOutcome};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult};
pub use report::{AnalysisReport, PredictionRow, TestMetrics};

/// Dense matrix and the regressor trait.
pub use homeval_core as core;

/// Linear solvers.
pub use homeval_linalg as linalg;

/// Table model and data preparation.
pub use homeval_data as data;

/// CSV and JSON I/O.
pub use homeval_io as io;

/// Synthetic datasets.
pub use homeval_datasets as datasets;

/// Preprocessing transforms.
pub use homeval_preprocessing as preprocessing;

/// Linear models.
pub use homeval_linear as linear;

/// Tree-based models.
pub use homeval_tree as tree;

/// Evaluation metrics.
pub use homeval_metrics as metrics;

/// Ensembles.
pub use homeval_ensemble as ensemble;

/// Pipelines.
pub use homeval_pipeline as pipeline;

/// Cross-validation and hyperparameter search.
pub use homeval_model_selection as model_selection;
