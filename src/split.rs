//! Train/test splitting.

use crate::config::strategy_key;
use crate::dataset::{require_column, take_rows};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use rand::SeedableRng as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

/// Split strategy descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Uniform random row partition, reproducible through `seed`
    SimpleRandom { test_fraction: f64, seed: u64 },
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self::SimpleRandom {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
        }
    }
}

impl SplitPolicy {
    /// # Errors
    ///
    /// `UnknownStrategy` for an unrecognised name.
    pub fn from_name(name: &str, test_fraction: f64, seed: u64) -> Result<Self> {
        match strategy_key(name).as_str() {
            "simple" | "simplerandom" | "random" | "traintest" | "simpletraintestsplit" => {
                Ok(Self::SimpleRandom {
                    test_fraction,
                    seed,
                })
            }
            _ => Err(PipelineError::UnknownStrategy(name.to_owned())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SimpleRandom { .. } => "simple_random",
        }
    }
}

/// Row-disjoint partition of one dataset into features and target.
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: Series,
    pub y_test: Series,
    /// Source row positions of the training fragment, in fragment order
    pub train_rows: Vec<usize>,
    /// Source row positions of the test fragment, in fragment order
    pub test_rows: Vec<usize>,
}

impl SplitResult {
    pub fn total_rows(&self) -> usize {
        self.train_rows.len() + self.test_rows.len()
    }
}

/// Split according to a policy.
///
/// # Errors
///
/// See [`train_test_split`].
pub fn split(df: &DataFrame, target_column: &str, policy: &SplitPolicy) -> Result<SplitResult> {
    match policy {
        SplitPolicy::SimpleRandom {
            test_fraction,
            seed,
        } => train_test_split(df, target_column, *test_fraction, *seed),
    }
}

/// Shuffle-split: the first `ceil(test_fraction * n)` rows of a seeded
/// permutation form the test set, the rest the training set.
///
/// # Errors
///
/// - `ColumnNotFound` if `target_column` is absent
/// - `InvalidParameter` if `test_fraction` is outside `(0, 1)` or leaves
///   either partition empty
pub fn train_test_split(
    df: &DataFrame,
    target_column: &str,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitResult> {
    require_column(df, target_column)?;

    if test_fraction.is_nan() || test_fraction <= 0.0 || test_fraction >= 1.0 {
        return Err(PipelineError::InvalidParameter(format!(
            "test fraction must lie strictly between 0 and 1, got {test_fraction}"
        )));
    }

    let total = df.height();
    let test_count = (test_fraction * total as f64).ceil() as usize;
    if test_count == 0 || test_count >= total {
        return Err(PipelineError::InvalidParameter(format!(
            "test fraction {test_fraction} over {total} rows leaves an empty partition"
        )));
    }

    let mut permutation: Vec<usize> = (0..total).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);
    let train_rows = permutation.split_off(test_count);
    let test_rows = permutation;

    tracing::debug!(
        "Split {total} rows into {} train / {} test (seed {seed})",
        train_rows.len(),
        test_rows.len()
    );

    let train = take_rows(df, &train_rows)?;
    let test = take_rows(df, &test_rows)?;

    Ok(SplitResult {
        x_train: train.drop(target_column)?,
        x_test: test.drop(target_column)?,
        y_train: require_column(&train, target_column)?.clone(),
        y_test: require_column(&test, target_column)?.clone(),
        train_rows,
        test_rows,
    })
}
