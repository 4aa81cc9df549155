use homeval_core::{MlError, MlResult};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded generator and cut off `ceil(n * test_ratio)`
/// rows for testing.
pub fn train_test_split(n: usize, test_ratio: f64, seed: u64) -> MlResult<TrainTestIndices> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(MlError::InvalidParameter(format!(
            "test ratio must lie in (0, 1), got {test_ratio}"
        )));
    }
    let test_size = (n as f64 * test_ratio).ceil() as usize;
    if test_size == 0 || test_size >= n {
        return Err(MlError::InvalidInput(format!(
            "cannot split {n} rows with test ratio {test_ratio}"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train_size = n - test_size;
    let test = indices.split_off(train_size);
    Ok(TrainTestIndices {
        train: indices,
        test,
    })
}

/// One cross-validation fold: fit on `train`, score on `test`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold splitter over row indices.
///
/// Without a shuffle seed the folds are contiguous blocks in row order; the
/// first `n % n_splits` folds hold one extra row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle_seed: Option<u64>,
}

impl Default for KFold {
    fn default() -> Self {
        KFold::new(5)
    }
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        KFold {
            n_splits,
            shuffle_seed: None,
        }
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn split(&self, n: usize) -> MlResult<Vec<FoldSplit>> {
        if self.n_splits < 2 {
            return Err(MlError::InvalidParameter(format!(
                "k-fold needs at least 2 splits, got {}",
                self.n_splits
            )));
        }
        if n < self.n_splits {
            return Err(MlError::InvalidInput(format!(
                "cannot make {} folds from {n} rows",
                self.n_splits
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        if let Some(seed) = self.shuffle_seed {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }

        let base = n / self.n_splits;
        let extra = n % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for k in 0..self.n_splits {
            let size = base + usize::from(k < extra);
            let end = start + size;
            let test = order[start..end].to_vec();
            let train = order[..start]
                .iter()
                .chain(&order[end..])
                .copied()
                .collect();
            folds.push(FoldSplit { train, test });
            start = end;
        }
        Ok(folds)
    }
}
