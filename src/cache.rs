//! All-pairs score cache.
//!
//! Scores for every unordered pair `{i, j}` of a [`SequenceSet`] are computed
//! once and stored in a packed upper-triangular vector. Pairs are enumerated
//! in canonical ascending `(i, j)` order, which is also the storage order.
//!
//! A build either yields a complete cache or an error; partial results are
//! never returned. Pairs are independent, so the build can fan out over the
//! rayon thread pool.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::align::{GlobalScorer, PairScorer, Score, ScoreError};
use crate::model::{PairKey, SequenceSet};

/// Errors that abort a cache build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Failed to score pair {pair}: {source}")]
    PairFailed {
        pair: PairKey,
        #[source]
        source: ScoreError,
    },

    #[error("Score cache build cancelled")]
    Cancelled,
}

/// Result type for cache builds.
pub type BuildResult<T> = Result<T, BuildError>;

/// Shared flag used to stop a running build between pair computations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shared counter of pairs scored so far.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicUsize>);

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    fn tick(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// Options for [`build_with`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Score pairs on the rayon pool instead of the calling thread
    pub parallel: bool,
    /// Checked before each pair
    pub cancel: Option<CancelToken>,
    /// Incremented after each pair
    pub progress: Option<Progress>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            cancel: None,
            progress: None,
        }
    }
}

/// Complete score table for one sequence set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoreCache {
    sequence_count: usize,
    scores: Vec<Score>,
}

impl ScoreCache {
    /// Number of sequences the cache was built for.
    pub fn sequence_count(&self) -> usize {
        self.sequence_count
    }

    /// Number of stored pairs, always `n(n-1)/2`.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true if no pairs are stored (fewer than two sequences).
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Looks up the score of `{a, b}` in either order.
    ///
    /// Self-pairs and indices beyond the set have no score.
    pub fn get(&self, a: usize, b: usize) -> Option<Score> {
        let key = PairKey::new(a, b)?;
        if key.j >= self.sequence_count {
            return None;
        }
        self.scores.get(slot(self.sequence_count, key)).copied()
    }

    /// Iterates over `(pair, score)` in canonical ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (PairKey, Score)> + '_ {
        canonical_pairs(self.sequence_count).zip(self.scores.iter().copied())
    }
}

/// Position of `key` in the packed upper triangle of an `n`-sequence cache.
fn slot(n: usize, key: PairKey) -> usize {
    // Rows 0..i hold (n-1) + (n-2) + ... + (n-i) entries.
    key.i * (2 * n - key.i - 1) / 2 + (key.j - key.i - 1)
}

/// All unordered pairs `0 <= i < j < n` in lexicographic order.
pub fn canonical_pairs(n: usize) -> impl Iterator<Item = PairKey> {
    (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| PairKey { i, j }))
}

/// Builds the cache with the default scorer and options.
pub fn build(set: &SequenceSet) -> BuildResult<ScoreCache> {
    build_with(set, &GlobalScorer, &BuildOptions::default())
}

/// Builds the cache with a custom scorer and options.
///
/// On error the first failing pair in canonical order is reported.
pub fn build_with<S: PairScorer>(
    set: &SequenceSet,
    scorer: &S,
    options: &BuildOptions,
) -> BuildResult<ScoreCache> {
    let n = set.len();
    let pairs: Vec<PairKey> = canonical_pairs(n).collect();
    info!(
        "Scoring {} pairs over {} sequences ({})",
        pairs.len(),
        n,
        if options.parallel { "parallel" } else { "sequential" }
    );

    let score_pair = |key: &PairKey| -> BuildResult<Score> {
        if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(BuildError::Cancelled);
        }
        let score = scorer
            .score(&set[key.i], &set[key.j])
            .map_err(|source| BuildError::PairFailed { pair: *key, source })?;
        if let Some(progress) = &options.progress {
            progress.tick();
        }
        Ok(score)
    };

    let results: Vec<BuildResult<Score>> = if options.parallel {
        pairs.par_iter().map(score_pair).collect()
    } else {
        let mut out = Vec::with_capacity(pairs.len());
        for key in &pairs {
            let result = score_pair(key);
            let failed = result.is_err();
            out.push(result);
            if failed {
                break;
            }
        }
        out
    };

    // Every slot is filled before the cache exists; a pair failure wins over
    // a cancellation seen by another worker.
    let mut scores = Vec::with_capacity(results.len());
    let mut cancelled = false;
    for result in results {
        match result {
            Ok(score) => scores.push(score),
            Err(BuildError::Cancelled) => cancelled = true,
            Err(e) => return Err(e),
        }
    }
    if cancelled {
        return Err(BuildError::Cancelled);
    }

    debug!("Score cache complete: {} entries", scores.len());
    Ok(ScoreCache {
        sequence_count: n,
        scores,
    })
}
