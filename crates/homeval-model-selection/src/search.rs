//! Randomized hyperparameter search over the random-forest family.

use crate::cross_validation::{cross_val_score, CandidateOutcome, CvScores};
use crate::error::{SelectionError, SelectionResult};

use homeval_data::Frame;
use homeval_pipeline::{FittedPipeline, ModelSpec, Pipeline};
use homeval_preprocessing::KFold;
use homeval_tree::RandomForestParams;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Uniform integer distribution over `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntDistribution {
    pub low: usize,
    pub high: usize,
}

impl IntDistribution {
    pub fn new(low: usize, high: usize) -> Self {
        IntDistribution { low, high }
    }

    fn validate(&self, name: &str) -> SelectionResult<()> {
        if self.low >= self.high {
            return Err(SelectionError::InvalidConfig(format!(
                "{name}: empty range [{}, {})",
                self.low, self.high
            )));
        }
        Ok(())
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        rng.gen_range(self.low..self.high)
    }
}

/// Search space of the forest hyperparameters that get tuned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestSearchSpace {
    pub n_estimators: IntDistribution,
    pub max_depth: IntDistribution,
    pub min_samples_split: IntDistribution,
    pub min_samples_leaf: IntDistribution,
}

impl Default for ForestSearchSpace {
    fn default() -> Self {
        ForestSearchSpace {
            n_estimators: IntDistribution::new(100, 500),
            max_depth: IntDistribution::new(3, 20),
            min_samples_split: IntDistribution::new(2, 20),
            min_samples_leaf: IntDistribution::new(1, 20),
        }
    }
}

impl ForestSearchSpace {
    pub fn validate(&self) -> SelectionResult<()> {
        self.n_estimators.validate("n_estimators")?;
        self.max_depth.validate("max_depth")?;
        self.min_samples_split.validate("min_samples_split")?;
        self.min_samples_leaf.validate("min_samples_leaf")
    }

    /// One draw, in field order, on top of `base`.
    pub fn sample<R: Rng>(&self, rng: &mut R, base: &RandomForestParams) -> RandomForestParams {
        RandomForestParams {
            n_estimators: self.n_estimators.sample(rng),
            max_depth: Some(self.max_depth.sample(rng)),
            min_samples_split: self.min_samples_split.sample(rng),
            min_samples_leaf: self.min_samples_leaf.sample(rng),
            ..*base
        }
    }
}

/// One evaluated draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub index: usize,
    pub params: RandomForestParams,
    pub outcome: CandidateOutcome,
}

/// Outcome of [`RandomizedSearch::fit`].
pub struct SearchResult {
    pub best_params: RandomForestParams,
    pub best_scores: CvScores,
    pub best_index: usize,
    pub candidates: Vec<SearchCandidate>,
    /// Best configuration refit on all the rows given to the search.
    pub best_pipeline: FittedPipeline,
}

impl SearchResult {
    pub fn best_score(&self) -> f64 {
        self.best_scores.mean
    }

    pub fn n_failed(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.outcome.scores().is_none())
            .count()
    }
}

/// Randomized search: `n_iter` draws from `space`, each scored by k-fold MAE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomizedSearch {
    pub space: ForestSearchSpace,
    pub n_iter: usize,
    pub folds: KFold,
    pub seed: u64,
    /// Settings not covered by `space`; its seed fixes every candidate's forest.
    pub base: RandomForestParams,
}

impl Default for RandomizedSearch {
    fn default() -> Self {
        RandomizedSearch {
            space: ForestSearchSpace::default(),
            n_iter: 50,
            folds: KFold::new(5),
            seed: 42,
            base: RandomForestParams::default(),
        }
    }
}

impl RandomizedSearch {
    pub fn validate(&self) -> SelectionResult<()> {
        if self.n_iter == 0 {
            return Err(SelectionError::InvalidConfig("n_iter must be at least 1".into()));
        }
        if self.folds.n_splits < 2 {
            return Err(SelectionError::InvalidConfig(format!(
                "need at least 2 folds, got {}",
                self.folds.n_splits
            )));
        }
        self.space.validate()
    }

    /// All draws, taken up front from one seeded generator.
    pub fn draws(&self) -> SelectionResult<Vec<RandomForestParams>> {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok((0..self.n_iter)
            .map(|_| self.space.sample(&mut rng, &self.base))
            .collect())
    }

    pub fn fit(
        &self,
        template: &Pipeline,
        features: &Frame,
        target: &[f64],
    ) -> SelectionResult<SearchResult> {
        let draws = self.draws()?;
        info!(n_iter = self.n_iter, folds = self.folds.n_splits, "randomized search started");

        let candidates: Vec<SearchCandidate> = draws
            .into_par_iter()
            .enumerate()
            .map(|(index, params)| {
                let pipeline = template.with_model(ModelSpec::RandomForest(params));
                let outcome =
                    CandidateOutcome::from(cross_val_score(&pipeline, features, target, &self.folds));
                match &outcome {
                    CandidateOutcome::Scored(s) => debug!(index, mean = s.mean, "candidate scored"),
                    CandidateOutcome::Failed { reason } => {
                        warn!(index, %reason, "candidate failed")
                    }
                }
                SearchCandidate {
                    index,
                    params,
                    outcome,
                }
            })
            .collect();

        // Strict `<` keeps the earliest draw on ties.
        let mut best: Option<(usize, &CvScores)> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            if let CandidateOutcome::Scored(scores) = &candidate.outcome {
                if best.map_or(true, |(_, b)| scores.mean < b.mean) {
                    best = Some((i, scores));
                }
            }
        }
        let (best_index, best_scores) = match best {
            Some((i, scores)) => (i, scores.clone()),
            None => return Err(SelectionError::AllCandidatesFailed(candidates.len())),
        };
        let best_params = candidates[best_index].params;
        info!(
            best_index,
            best_mae = best_scores.mean,
            n_estimators = best_params.n_estimators,
            "randomized search finished"
        );

        let best_pipeline = template
            .with_model(ModelSpec::RandomForest(best_params))
            .fit(features, target)?;

        Ok(SearchResult {
            best_params,
            best_scores,
            best_index,
            candidates,
            best_pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homeval_data::{Column, FeaturePartition, TargetTransform};

    fn table(n: usize) -> (Frame, Vec<f64>) {
        let x: Vec<Option<f64>> = (0..n).map(|i| Some((i % 17) as f64)).collect();
        let g: Vec<Option<String>> = (0..n).map(|i| Some(format!("g{}", i % 3))).collect();
        let target = (0..n)
            .map(|i| 10.0 + 3.0 * (i % 17) as f64 + 5.0 * (i % 3) as f64)
            .collect();
        let frame = Frame::new(
            vec!["x".into(), "g".into()],
            vec![Column::Numeric(x), Column::Categorical(g)],
        )
        .unwrap();
        (frame, target)
    }

    fn small_search(n_iter: usize) -> RandomizedSearch {
        RandomizedSearch {
            space: ForestSearchSpace {
                n_estimators: IntDistribution::new(5, 15),
                ..ForestSearchSpace::default()
            },
            n_iter,
            folds: KFold::new(3),
            ..RandomizedSearch::default()
        }
    }

    fn template(frame: &Frame) -> Pipeline {
        Pipeline::new(
            &FeaturePartition::from_frame(frame),
            ModelSpec::LinearRegression,
            TargetTransform::Log1p,
        )
    }

    #[test]
    fn test_draws_are_seeded_and_in_range() {
        let search = RandomizedSearch::default();
        let draws = search.draws().unwrap();
        assert_eq!(draws.len(), 50);
        assert_eq!(draws, search.draws().unwrap());
        for p in &draws {
            assert!((100..500).contains(&p.n_estimators));
            assert!((3..20).contains(&p.max_depth.unwrap()));
            assert!((2..20).contains(&p.min_samples_split));
            assert!((1..20).contains(&p.min_samples_leaf));
            assert_eq!(p.seed, 42);
        }
        let other = RandomizedSearch { seed: 7, ..RandomizedSearch::default() };
        assert_ne!(draws, other.draws().unwrap());
    }

    #[test]
    fn test_best_not_worse_than_first_draw() {
        let (frame, target) = table(60);
        let result = small_search(4).fit(&template(&frame), &frame, &target).unwrap();
        assert_eq!(result.candidates.len(), 4);
        assert_eq!(result.n_failed(), 0);
        let first = result.candidates[0].outcome.mean().unwrap();
        assert!(result.best_score() <= first);
        for c in &result.candidates {
            assert!(result.best_score() <= c.outcome.mean().unwrap());
        }
        assert_eq!(result.best_params, result.candidates[result.best_index].params);

        let pred = result.best_pipeline.predict(&frame).unwrap();
        assert_eq!(pred.len(), 60);
    }

    #[test]
    fn test_all_candidates_failed() {
        let (frame, target) = table(60);
        // Forests fail validation with max_features outside (0, 1].
        let search = RandomizedSearch {
            base: RandomForestParams {
                max_features: 0.0,
                ..RandomForestParams::default()
            },
            ..small_search(3)
        };
        let err = search.fit(&template(&frame), &frame, &target).err().unwrap();
        assert_eq!(err, SelectionError::AllCandidatesFailed(3));
    }

    #[test]
    fn test_invalid_configuration() {
        let zero = RandomizedSearch { n_iter: 0, ..RandomizedSearch::default() };
        assert!(matches!(zero.draws(), Err(SelectionError::InvalidConfig(_))));

        let empty = RandomizedSearch {
            space: ForestSearchSpace {
                max_depth: IntDistribution::new(5, 5),
                ..ForestSearchSpace::default()
            },
            ..RandomizedSearch::default()
        };
        assert!(matches!(empty.draws(), Err(SelectionError::InvalidConfig(_))));
    }
}
