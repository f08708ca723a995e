//! Pairwise global alignment scoring.
//!
//! The scoring scheme is match = 1, mismatch = 0, gap = 0. Every alignment
//! column contributes 0 or 1, so the optimal global score is the length of
//! the longest common subsequence of the two residue strings.
//!
//! ```text
//! T[i][j] = max(T[i-1][j-1] + (a[i-1] == b[j-1]), T[i-1][j], T[i][j-1])
//! ```
//!
//! Only the final cell is needed, so the table is kept as one rolling row
//! over the shorter sequence.

use thiserror::Error;

use crate::model::Sequence;

/// Similarity score for one pair of sequences.
pub type Score = u32;

/// Errors raised when a sequence cannot be scored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("Invalid sequence '{name}': unreadable symbol 0x{byte:02X} at position {position}")]
    InvalidSequence {
        name: String,
        position: usize,
        byte: u8,
    },
}

/// Result type for scoring operations.
pub type ScoreResult<T> = Result<T, ScoreError>;

/// Scores one pair of sequences.
///
/// Implementations must be pure and symmetric; the cache builder calls
/// them from several worker threads at once.
pub trait PairScorer: Sync {
    fn score(&self, a: &Sequence, b: &Sequence) -> ScoreResult<Score>;
}

/// Global alignment with free gaps and unit matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalScorer;

impl PairScorer for GlobalScorer {
    fn score(&self, a: &Sequence, b: &Sequence) -> ScoreResult<Score> {
        validate(a)?;
        validate(b)?;
        Ok(lcs_score(a.as_bytes(), b.as_bytes()))
    }
}

/// Checks that a residue stream holds only printable ASCII symbols.
///
/// The alphabet itself is not restricted; `N`, `X`, `-` or lowercase
/// residues are all compared as-is.
pub fn validate(seq: &Sequence) -> ScoreResult<()> {
    match seq
        .as_bytes()
        .iter()
        .position(|b| !b.is_ascii_graphic())
    {
        Some(position) => Err(ScoreError::InvalidSequence {
            name: seq.name.clone(),
            position,
            byte: seq.as_bytes()[position],
        }),
        None => Ok(()),
    }
}

/// Optimal global alignment score of `a` against `b`.
///
/// Runs in O(|a|·|b|) time and O(min(|a|, |b|)) memory.
pub fn lcs_score(a: &[u8], b: &[u8]) -> Score {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }

    // row[j] holds T[i][j] for the current i; `diag` carries T[i-1][j-1].
    let mut row: Vec<Score> = vec![0; short.len() + 1];
    for &x in long {
        let mut diag = 0;
        for (j, &y) in short.iter().enumerate() {
            let up = row[j + 1];
            let matched = diag + Score::from(x == y);
            row[j + 1] = matched.max(up).max(row[j]);
            diag = up;
        }
    }
    row[short.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Plain full-table recurrence, kept as a reference for the rolling row.
    fn table_score(a: &[u8], b: &[u8]) -> Score {
        let mut t = vec![vec![0 as Score; b.len() + 1]; a.len() + 1];
        for i in 1..=a.len() {
            for j in 1..=b.len() {
                let m = t[i - 1][j - 1] + Score::from(a[i - 1] == b[j - 1]);
                t[i][j] = m.max(t[i - 1][j]).max(t[i][j - 1]);
            }
        }
        t[a.len()][b.len()]
    }

    #[test]
    fn test_identical_sequences() {
        assert_eq!(lcs_score(b"AAAA", b"AAAA"), 4);
    }

    #[test]
    fn test_disjoint_alphabets() {
        assert_eq!(lcs_score(b"AAAA", b"TTTT"), 0);
    }

    #[test]
    fn test_empty_side() {
        assert_eq!(lcs_score(b"", b"ACGT"), 0);
        assert_eq!(lcs_score(b"ACGT", b""), 0);
        assert_eq!(lcs_score(b"", b""), 0);
    }

    #[test]
    fn test_gapped_match() {
        // ACGT vs AGT: A-G-T aligns with a free gap over C
        assert_eq!(lcs_score(b"ACGT", b"AGT"), 3);
        assert_eq!(lcs_score(b"AGGTAB", b"GXTXAYB"), 4);
    }

    #[test]
    fn test_case_is_not_normalized() {
        assert_eq!(lcs_score(b"acgt", b"ACGT"), 0);
    }

    #[test]
    fn test_scorer_rejects_control_bytes() {
        let good = Sequence::new("good", "ACGT");
        let bad = Sequence::new("bad", vec![b'A', 0x07, b'C']);
        let err = GlobalScorer.score(&good, &bad).unwrap_err();
        assert_eq!(
            err,
            ScoreError::InvalidSequence {
                name: "bad".to_string(),
                position: 1,
                byte: 0x07
            }
        );
    }

    #[test]
    fn test_scorer_accepts_unusual_symbols() {
        let a = Sequence::new("a", "AC-N*x");
        let b = Sequence::new("b", "A-N*");
        assert_eq!(GlobalScorer.score(&a, &b), Ok(4));
    }

    proptest! {
        #[test]
        fn prop_symmetric(a in "[ACGT]{0,40}", b in "[ACGT]{0,40}") {
            prop_assert_eq!(lcs_score(a.as_bytes(), b.as_bytes()), lcs_score(b.as_bytes(), a.as_bytes()));
        }

        #[test]
        fn prop_self_score_is_length(a in "[ACGTN-]{0,60}") {
            prop_assert_eq!(lcs_score(a.as_bytes(), a.as_bytes()) as usize, a.len());
        }

        #[test]
        fn prop_prefix_extension_never_decreases(a in "[ACGT]{0,30}", b in "[ACGT]{0,30}", x in "[ACGT]{0,10}") {
            let extended = format!("{}{}", b, x);
            prop_assert!(lcs_score(a.as_bytes(), b.as_bytes()) <= lcs_score(a.as_bytes(), extended.as_bytes()));
        }

        #[test]
        fn prop_matches_full_table(a in "[ACG]{0,25}", b in "[ACG]{0,25}") {
            prop_assert_eq!(lcs_score(a.as_bytes(), b.as_bytes()), table_score(a.as_bytes(), b.as_bytes()));
        }
    }
}
