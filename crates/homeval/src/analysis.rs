//! The analysis run: preparation, comparison, search, stacking, report.
//!
//! Each stage consumes the previous stage's value and returns a new one; no
//! stage keeps state between runs.

use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::report::{AnalysisReport, PredictionRow, TestMetrics};

use homeval_data::{prepare, Frame, PreparedData};
use homeval_model_selection::{compare_models, CandidateScore, SearchResult};
use homeval_pipeline::{FeatureImportance, ModelSpec, Pipeline};
use homeval_preprocessing::train_test_split;

use tracing::info;

/// Row-aligned train and test partitions of the prepared table.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train_features: Frame,
    pub train_target: Vec<f64>,
    pub test_features: Frame,
    pub test_target: Vec<f64>,
}

impl TrainTestSplit {
    pub fn new(data: &PreparedData, test_size: f64, seed: u64) -> AnalysisResult<Self> {
        let indices = train_test_split(data.n_rows(), test_size, seed)?;
        let pick = |rows: &[usize]| rows.iter().map(|&i| data.target[i]).collect::<Vec<f64>>();
        Ok(TrainTestSplit {
            train_features: data.features.take_rows(&indices.train),
            train_target: pick(&indices.train),
            test_features: data.features.take_rows(&indices.test),
            test_target: pick(&indices.test),
        })
    }
}

/// Held-out evaluation of the stacking ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct StackingOutcome {
    pub base_models: Vec<String>,
    pub metrics: TestMetrics,
}

/// Report plus the data behind the two plots of the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    /// Tuned model on the test split.
    pub predictions: Vec<PredictionRow>,
    /// Full ranked importance list of the tuned model.
    pub importances: Vec<FeatureImportance>,
}

/// Run the whole analysis on a raw table.
///
/// With `config.n_jobs` set, every parallel stage runs on a dedicated pool of
/// that size; otherwise the global rayon pool is used.
pub fn run(frame: &Frame, config: &AnalysisConfig) -> AnalysisResult<AnalysisOutcome> {
    config.validate()?;
    match config.n_jobs {
        Some(n_jobs) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n_jobs).build()?;
            info!(n_jobs, "using dedicated worker pool");
            pool.install(|| run_stages(frame, config))
        }
        None => run_stages(frame, config),
    }
}

fn run_stages(frame: &Frame, config: &AnalysisConfig) -> AnalysisResult<AnalysisOutcome> {
    let data = prepare(frame, &config.preparation)?;
    info!(
        rows = data.n_rows(),
        numeric = data.partition.numeric.len(),
        categorical = data.partition.categorical.len(),
        "data prepared"
    );

    let split = TrainTestSplit::new(&data, config.test_size, config.split_seed)?;
    info!(
        train = split.train_target.len(),
        test = split.test_target.len(),
        "train/test split"
    );

    let template = Pipeline::new(
        &data.partition,
        ModelSpec::LinearRegression,
        data.target_transform,
    );

    let candidates = compare_candidates(&template, &split, config);
    let search = tune_forest(&template, &split, config)?;
    let (predictions, tuned_test) = evaluate_tuned(&search, &split)?;
    let importances = search.best_pipeline.ranked_importances().unwrap_or_default();
    let stacking = fit_stacking(&template, &split, config)?;

    let report = AnalysisReport {
        n_train: split.train_target.len(),
        n_test: split.test_target.len(),
        n_features: search.best_pipeline.feature_names().len(),
        target_transform: data.target_transform,
        candidates,
        best_params: search.best_params,
        best_cv_mae: search.best_scores.mean,
        best_cv_std: search.best_scores.std,
        failed_candidates: search.n_failed(),
        top_importances: importances.iter().take(config.top_k).cloned().collect(),
        tuned_test,
        stacking_test: stacking.metrics,
    };

    Ok(AnalysisOutcome {
        report,
        predictions,
        importances,
    })
}

fn compare_candidates(
    template: &Pipeline,
    split: &TrainTestSplit,
    config: &AnalysisConfig,
) -> Vec<CandidateScore> {
    info!(candidates = config.candidates.len(), "comparing candidate models");
    compare_models(
        template,
        &config.candidates,
        &split.train_features,
        &split.train_target,
        &config.folds(),
    )
}

fn tune_forest(
    template: &Pipeline,
    split: &TrainTestSplit,
    config: &AnalysisConfig,
) -> AnalysisResult<SearchResult> {
    let search = config
        .search()
        .fit(template, &split.train_features, &split.train_target)?;
    info!(
        best_mae = search.best_score(),
        failed = search.n_failed(),
        "forest tuned"
    );
    Ok(search)
}

fn evaluate_tuned(
    search: &SearchResult,
    split: &TrainTestSplit,
) -> AnalysisResult<(Vec<PredictionRow>, TestMetrics)> {
    let predicted = search.best_pipeline.predict(&split.test_features)?;
    let metrics = TestMetrics::compute(&split.test_target, &predicted);
    info!(mae = metrics.mae, r2 = metrics.r2, "tuned model evaluated on test split");
    let rows = split
        .test_target
        .iter()
        .zip(&predicted)
        .map(|(&actual, &predicted)| PredictionRow { actual, predicted })
        .collect();
    Ok((rows, metrics))
}

fn fit_stacking(
    template: &Pipeline,
    split: &TrainTestSplit,
    config: &AnalysisConfig,
) -> AnalysisResult<StackingOutcome> {
    let pipeline = template.with_model(ModelSpec::Stacking(config.stacking.clone()));
    let fitted = pipeline.fit(&split.train_features, &split.train_target)?;
    let predicted = fitted.predict(&split.test_features)?;
    let metrics = TestMetrics::compute(&split.test_target, &predicted);
    info!(mae = metrics.mae, "stacking model evaluated on test split");
    Ok(StackingOutcome {
        base_models: config.stacking.estimators.iter().map(|m| m.name.clone()).collect(),
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use homeval_data::Column;

    #[test]
    fn test_split_keeps_rows_aligned() {
        let ids: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();
        let frame = Frame::new(
            vec!["Row".into(), "SalePrice".into()],
            vec![
                Column::Numeric(ids.clone()),
                Column::Numeric(ids.iter().map(|v| v.map(|x| 100.0 + x)).collect()),
            ],
        )
        .unwrap();
        let config = homeval_data::PreparationConfig {
            drop_columns: Vec::new(),
            ..Default::default()
        };
        let data = prepare(&frame, &config).unwrap();
        let split = TrainTestSplit::new(&data, 0.2, 42).unwrap();

        assert_eq!(split.test_target.len(), 2);
        assert_eq!(split.train_target.len(), 8);
        let rows = split.train_features.column("Row").unwrap().as_numeric().unwrap();
        for (row, y) in rows.iter().zip(&split.train_target) {
            assert_eq!(row.unwrap() + 100.0, *y);
        }
    }
}
