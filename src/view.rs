//! Graph and matrix views over a selected subset of sequences.
//!
//! Views are read-only projections of a finished [`ScoreCache`]: they look
//! scores up, never recompute them, and never modify the cache. Deriving the
//! same view twice gives identical results.
//!
//! Nodes are keyed by sequence index. Names are only display labels, so two
//! sequences sharing a name stay two nodes; see [`NamePolicy`].

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::align::Score;
use crate::cache::ScoreCache;
use crate::model::SequenceSet;

/// Errors that can occur while deriving a view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("No sequences selected")]
    EmptySelection,

    #[error("Sequence index {index} out of range (set has {len} sequences)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Duplicate sequence name '{name}' (sequences {indices:?})")]
    DuplicateName { name: String, indices: Vec<usize> },

    #[error("Score cache covers {cache_len} sequences but the set has {set_len}")]
    StaleCache { cache_len: usize, set_len: usize },
}

/// Result type for view operations.
pub type ViewResult<T> = Result<T, ViewError>;

/// How selected sequences that share a display name are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// Append `#index` to every label whose name is shared
    #[default]
    Disambiguate,
    /// Fail with [`ViewError::DuplicateName`]
    Reject,
}

impl std::fmt::Display for NamePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamePolicy::Disambiguate => write!(f, "disambiguate"),
            NamePolicy::Reject => write!(f, "reject"),
        }
    }
}

/// A graph node: one selected sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Index into the sequence set
    pub index: usize,
    /// Display label
    pub label: String,
}

/// A weighted edge between two selected sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub weight: Score,
}

/// Nodes and weighted edges for a graph-layout collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GraphView {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphView {
    /// Label of the node for a sequence index.
    ///
    /// Scans the nodes; use [`GraphView::labels_by_index`] for per-edge lookups.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.index == index)
            .map(|n| n.label.as_str())
    }

    /// Node labels keyed by sequence index.
    pub fn labels_by_index(&self) -> HashMap<usize, &str> {
        self.nodes
            .iter()
            .map(|n| (n.index, n.label.as_str()))
            .collect()
    }

    /// Smallest and largest edge weight, if there are edges.
    pub fn weight_range(&self) -> Option<(Score, Score)> {
        let min = self.edges.iter().map(|e| e.weight).min()?;
        let max = self.edges.iter().map(|e| e.weight).max()?;
        Some((min, max))
    }
}

/// Dense `k x k` score table in selection order, zero on the diagonal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MatrixView {
    pub indices: Vec<usize>,
    pub labels: Vec<String>,
    pub cells: Vec<Vec<Score>>,
}

impl MatrixView {
    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.indices.len()
    }

    /// Largest off-diagonal score.
    pub fn max_score(&self) -> Score {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// Validates a selection against the set and cache.
///
/// Repeated indices keep their first position.
pub fn resolve_selection(
    cache: &ScoreCache,
    set: &SequenceSet,
    selection: &[usize],
) -> ViewResult<Vec<usize>> {
    if cache.sequence_count() != set.len() {
        return Err(ViewError::StaleCache {
            cache_len: cache.sequence_count(),
            set_len: set.len(),
        });
    }
    if selection.is_empty() || set.is_empty() {
        return Err(ViewError::EmptySelection);
    }
    if let Some(&index) = selection.iter().find(|&&i| i >= set.len()) {
        return Err(ViewError::IndexOutOfRange {
            index,
            len: set.len(),
        });
    }

    let mut seen = HashSet::with_capacity(selection.len());
    Ok(selection
        .iter()
        .copied()
        .filter(|&i| seen.insert(i))
        .collect())
}

/// Display labels for resolved indices under the given policy.
///
/// Labels are unique within the selection. A shared name gets `#index`
/// appended, repeated until the label clashes with no selected name and no
/// label already handed out.
fn labels(set: &SequenceSet, indices: &[usize], policy: NamePolicy) -> ViewResult<Vec<String>> {
    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for &i in indices {
        by_name.entry(set[i].name.as_str()).or_default().push(i);
    }

    // Names used once keep their label, so they are reserved up front.
    let mut taken: HashSet<String> = by_name
        .iter()
        .filter(|(_, shared)| shared.len() == 1)
        .map(|(name, _)| name.to_string())
        .collect();

    let mut out = Vec::with_capacity(indices.len());
    for &i in indices {
        let name = set[i].name.as_str();
        let shared = &by_name[name];
        if shared.len() == 1 {
            out.push(name.to_string());
            continue;
        }
        match policy {
            NamePolicy::Disambiguate => {
                let mut label = format!("{}#{}", name, i);
                while taken.contains(&label) {
                    label = format!("{}#{}", label, i);
                }
                taken.insert(label.clone());
                out.push(label);
            }
            NamePolicy::Reject => {
                return Err(ViewError::DuplicateName {
                    name: name.to_string(),
                    indices: shared.clone(),
                })
            }
        }
    }
    Ok(out)
}

/// Looks up a pair that [`resolve_selection`] has already validated.
fn lookup(cache: &ScoreCache, a: usize, b: usize) -> Score {
    cache.get(a, b).unwrap_or_default()
}

/// Builds the graph for a selection: one node per index, one edge per pair.
pub fn graph(
    cache: &ScoreCache,
    set: &SequenceSet,
    selection: &[usize],
    policy: NamePolicy,
) -> ViewResult<GraphView> {
    let indices = resolve_selection(cache, set, selection)?;
    let labels = labels(set, &indices, policy)?;

    let nodes = indices
        .iter()
        .zip(labels)
        .map(|(&index, label)| Node { index, label })
        .collect();

    let mut edges = Vec::with_capacity(indices.len() * indices.len().saturating_sub(1) / 2);
    for (a, &source) in indices.iter().enumerate() {
        for &target in &indices[a + 1..] {
            edges.push(Edge {
                source,
                target,
                weight: lookup(cache, source, target),
            });
        }
    }

    debug!("Graph view: {} nodes, {} edges", indices.len(), edges.len());
    Ok(GraphView { nodes, edges })
}

/// Builds the score matrix for a selection, rows and columns in selection order.
pub fn matrix(
    cache: &ScoreCache,
    set: &SequenceSet,
    selection: &[usize],
    policy: NamePolicy,
) -> ViewResult<MatrixView> {
    let indices = resolve_selection(cache, set, selection)?;
    let labels = labels(set, &indices, policy)?;

    let cells = indices
        .iter()
        .map(|&row| {
            indices
                .iter()
                .map(|&col| if row == col { 0 } else { lookup(cache, row, col) })
                .collect()
        })
        .collect();

    debug!("Matrix view: {0}x{0}", indices.len());
    Ok(MatrixView {
        indices,
        labels,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::build;
    use proptest::prelude::*;

    fn scenario_c() -> (SequenceSet, ScoreCache) {
        let set = SequenceSet::from_records([("s0", "AC"), ("s1", "AC"), ("s2", "GT")]);
        let cache = build(&set).unwrap();
        (set, cache)
    }

    #[test]
    fn test_scenario_c_graph() {
        let (set, cache) = scenario_c();
        let g = graph(&cache, &set, &[0, 1], NamePolicy::Reject).unwrap();
        assert_eq!(g.nodes.len(), 2);
        assert_eq!(
            g.edges,
            vec![Edge {
                source: 0,
                target: 1,
                weight: 2
            }]
        );
        assert_eq!(g.label(1), Some("s1"));
    }

    #[test]
    fn test_scenario_c_matrix() {
        let (set, cache) = scenario_c();
        let m = matrix(&cache, &set, &[0, 1, 2], NamePolicy::Reject).unwrap();
        assert_eq!(m.cells, vec![vec![0, 2, 0], vec![2, 0, 0], vec![0, 0, 0]]);
        assert_eq!(m.labels, vec!["s0", "s1", "s2"]);
        assert_eq!(m.max_score(), 2);
    }

    #[test]
    fn test_scenario_d_out_of_range() {
        let (set, cache) = scenario_c();
        let before = cache.clone();
        let err = graph(&cache, &set, &[0, 3], NamePolicy::default()).unwrap_err();
        assert_eq!(err, ViewError::IndexOutOfRange { index: 3, len: 3 });
        let err = matrix(&cache, &set, &[7], NamePolicy::default()).unwrap_err();
        assert_eq!(err, ViewError::IndexOutOfRange { index: 7, len: 3 });
        assert_eq!(cache, before);
    }

    #[test]
    fn test_scenario_e_empty_set() {
        let set = SequenceSet::default();
        let cache = build(&set).unwrap();
        for selection in [&[][..], &[0][..], &[0, 1][..]] {
            assert_eq!(
                graph(&cache, &set, selection, NamePolicy::default()),
                Err(ViewError::EmptySelection)
            );
            assert_eq!(
                matrix(&cache, &set, selection, NamePolicy::default()),
                Err(ViewError::EmptySelection)
            );
        }
    }

    #[test]
    fn test_empty_selection() {
        let (set, cache) = scenario_c();
        assert_eq!(
            graph(&cache, &set, &[], NamePolicy::default()),
            Err(ViewError::EmptySelection)
        );
    }

    #[test]
    fn test_singleton_selection() {
        let (set, cache) = scenario_c();
        let g = graph(&cache, &set, &[2], NamePolicy::default()).unwrap();
        assert_eq!(g.nodes.len(), 1);
        assert!(g.edges.is_empty());
        assert_eq!(g.weight_range(), None);

        let m = matrix(&cache, &set, &[2], NamePolicy::default()).unwrap();
        assert_eq!(m.cells, vec![vec![0]]);
    }

    #[test]
    fn test_matrix_follows_selection_order() {
        let (set, cache) = scenario_c();
        let m = matrix(&cache, &set, &[2, 0, 1], NamePolicy::default()).unwrap();
        assert_eq!(m.indices, vec![2, 0, 1]);
        assert_eq!(m.cells, vec![vec![0, 0, 0], vec![0, 0, 2], vec![0, 2, 0]]);
    }

    #[test]
    fn test_repeated_index_collapses() {
        let (set, cache) = scenario_c();
        let m = matrix(&cache, &set, &[1, 0, 1], NamePolicy::default()).unwrap();
        assert_eq!(m.indices, vec![1, 0]);
        assert_eq!(m.cells, vec![vec![0, 2], vec![2, 0]]);
    }

    #[test]
    fn test_duplicate_names_disambiguated() {
        let set = SequenceSet::from_records([("x", "AC"), ("y", "AC"), ("x", "GT")]);
        let cache = build(&set).unwrap();
        let g = graph(&cache, &set, &[0, 1, 2], NamePolicy::Disambiguate).unwrap();
        let labels: Vec<&str> = g.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["x#0", "y", "x#2"]);
        assert_eq!(g.edges.len(), 3);

        // Only one 'x' selected: no suffix needed
        let g = graph(&cache, &set, &[1, 2], NamePolicy::Disambiguate).unwrap();
        assert_eq!(g.label(2), Some("x"));
    }

    #[test]
    fn test_disambiguated_labels_avoid_real_names() {
        let set = SequenceSet::from_records([("x", "AC"), ("x", "AC"), ("x#0", "GT")]);
        let cache = build(&set).unwrap();
        let g = graph(&cache, &set, &[0, 1, 2], NamePolicy::Disambiguate).unwrap();
        let labels: Vec<&str> = g.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["x#0#0", "x#1", "x#0"]);

        let unique: HashSet<&str> = labels.iter().copied().collect();
        assert_eq!(unique.len(), 3);

        let m = matrix(&cache, &set, &[2, 1, 0], NamePolicy::Disambiguate).unwrap();
        assert_eq!(m.labels, vec!["x#0", "x#1", "x#0#0"]);
    }

    #[test]
    fn test_labels_by_index() {
        let (set, cache) = scenario_c();
        let g = graph(&cache, &set, &[2, 0], NamePolicy::default()).unwrap();
        let labels = g.labels_by_index();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[&2], "s2");
        assert_eq!(labels.get(&1), None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let set = SequenceSet::from_records([("x", "AC"), ("y", "AC"), ("x", "GT")]);
        let cache = build(&set).unwrap();
        let err = matrix(&cache, &set, &[2, 1, 0], NamePolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            ViewError::DuplicateName {
                name: "x".to_string(),
                indices: vec![2, 0]
            }
        );
    }

    #[test]
    fn test_stale_cache_rejected() {
        let (set, _) = scenario_c();
        let other = build(&SequenceSet::from_records([("a", "A"), ("b", "A")])).unwrap();
        assert_eq!(
            graph(&other, &set, &[0], NamePolicy::default()),
            Err(ViewError::StaleCache {
                cache_len: 2,
                set_len: 3
            })
        );
    }

    proptest! {
        #[test]
        fn prop_views_are_idempotent(selection in proptest::collection::vec(0usize..5, 1..8)) {
            let set = SequenceSet::from_records([
                ("a", "ACGTAC"), ("b", "AGT"), ("c", "GGGA"), ("d", ""), ("e", "TTACG"),
            ]);
            let cache = build(&set).unwrap();
            let before = cache.clone();

            let g1 = graph(&cache, &set, &selection, NamePolicy::default()).unwrap();
            let m1 = matrix(&cache, &set, &selection, NamePolicy::default()).unwrap();
            for _ in 0..3 {
                prop_assert_eq!(&graph(&cache, &set, &selection, NamePolicy::default()).unwrap(), &g1);
                prop_assert_eq!(&matrix(&cache, &set, &selection, NamePolicy::default()).unwrap(), &m1);
            }
            prop_assert_eq!(&cache, &before);

            for (a, row) in m1.cells.iter().enumerate() {
                for (b, &cell) in row.iter().enumerate() {
                    prop_assert_eq!(cell, m1.cells[b][a]);
                }
            }
        }

        #[test]
        fn prop_disambiguated_labels_are_unique(
            names in proptest::collection::vec(
                prop::sample::select(vec!["x", "x#0", "x#1", "x#0#0", "y"]),
                1..8,
            )
        ) {
            let set = SequenceSet::from_records(names.iter().map(|&n| (n, "AC")));
            let cache = build(&set).unwrap();
            let selection: Vec<usize> = (0..set.len()).collect();
            let g = graph(&cache, &set, &selection, NamePolicy::Disambiguate).unwrap();
            let unique: HashSet<&str> = g.nodes.iter().map(|n| n.label.as_str()).collect();
            prop_assert_eq!(unique.len(), set.len());
        }
    }
}
