//! Session context: the current sequence set and its score cache.
//!
//! The set and cache are created together and replaced together. A failed or
//! cancelled reload leaves the previous pair untouched.

use log::{info, warn};

use crate::align::{GlobalScorer, PairScorer};
use crate::cache::{build_with, BuildOptions, BuildResult, ScoreCache};
use crate::model::SequenceSet;
use crate::view::{self, GraphView, MatrixView, NamePolicy, ViewResult};

/// Owns one sequence set and the complete cache built from it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    sequences: SequenceSet,
    cache: ScoreCache,
}

impl Session {
    /// Builds the cache for `sequences` with default options.
    pub fn load(sequences: SequenceSet) -> BuildResult<Self> {
        Self::load_with(sequences, &GlobalScorer, &BuildOptions::default())
    }

    /// Builds the cache for `sequences` with a custom scorer and options.
    pub fn load_with<S: PairScorer>(
        sequences: SequenceSet,
        scorer: &S,
        options: &BuildOptions,
    ) -> BuildResult<Self> {
        let cache = build_with(&sequences, scorer, options)?;
        info!(
            "Session ready: {} sequences, {} cached pairs",
            sequences.len(),
            cache.len()
        );
        Ok(Self { sequences, cache })
    }

    /// Replaces this session with one built from `sequences`.
    ///
    /// On error `self` is unchanged.
    pub fn reload(&mut self, sequences: SequenceSet) -> BuildResult<()> {
        self.reload_with(sequences, &GlobalScorer, &BuildOptions::default())
    }

    /// [`Session::reload`] with a custom scorer and options.
    pub fn reload_with<S: PairScorer>(
        &mut self,
        sequences: SequenceSet,
        scorer: &S,
        options: &BuildOptions,
    ) -> BuildResult<()> {
        match Self::load_with(sequences, scorer, options) {
            Ok(next) => {
                *self = next;
                Ok(())
            }
            Err(e) => {
                warn!("Reload rejected, keeping previous session: {}", e);
                Err(e)
            }
        }
    }

    /// The loaded sequences.
    pub fn sequences(&self) -> &SequenceSet {
        &self.sequences
    }

    /// The score cache for [`Session::sequences`].
    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    /// Graph view for a selection of sequence indices.
    pub fn graph(&self, selection: &[usize], policy: NamePolicy) -> ViewResult<GraphView> {
        view::graph(&self.cache, &self.sequences, selection, policy)
    }

    /// Matrix view for a selection of sequence indices.
    pub fn matrix(&self, selection: &[usize], policy: NamePolicy) -> ViewResult<MatrixView> {
        view::matrix(&self.cache, &self.sequences, selection, policy)
    }
}
