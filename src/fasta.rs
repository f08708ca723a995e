//! FASTA file loader.
//!
//! This module reads FASTA files into a [`SequenceSet`].
//! It supports both single-line and multi-line sequences.
//!
//! ## FASTA Format
//!
//! ```text
//! >sequence_name optional description
//! ACGTACGTACGT...
//! >another_sequence
//! TGCATGCATGCA...
//! ```
//!
//! Residue lines are kept as raw bytes: symbols are not validated here, an
//! unreadable residue is reported when the score cache is built.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::model::{Sequence, SequenceSet};

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty FASTA file")]
    EmptyFile,

    #[error("Invalid FASTA format: {0}")]
    InvalidFormat(String),

    #[error("Sequence without header at line {0}")]
    SequenceWithoutHeader(usize),
}

/// Result type for FASTA operations.
pub type FastaResult<T> = Result<T, FastaError>;

/// Parses a FASTA file and returns a SequenceSet.
///
/// # Examples
///
/// ```no_run
/// use seqgraph::fasta::parse_fasta_file;
///
/// let set = parse_fasta_file("sequences.fasta").unwrap();
/// println!("Loaded {} sequences", set.len());
/// ```
pub fn parse_fasta_file<P: AsRef<Path>>(path: P) -> FastaResult<SequenceSet> {
    let file = File::open(path)?;
    parse_fasta(BufReader::new(file))
}

/// Parses FASTA content from a reader.
///
/// A header followed by no residue lines yields an empty sequence.
pub fn parse_fasta<R: BufRead>(reader: R) -> FastaResult<SequenceSet> {
    let mut sequences = Vec::new();
    let mut current: Option<Sequence> = None;

    for (line_index, line_result) in reader.split(b'\n').enumerate() {
        let line_number = line_index + 1;
        let line = line_result?;
        let line = trim(&line);

        // Skip empty lines
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix(b">") {
            if let Some(seq) = current.take() {
                sequences.push(seq);
            }

            // Name is everything before the first whitespace
            let header = String::from_utf8_lossy(header);
            let name = header.split_whitespace().next().unwrap_or("");
            if name.is_empty() {
                return Err(FastaError::InvalidFormat(format!(
                    "Empty sequence identifier at line {}",
                    line_number
                )));
            }

            current = Some(Sequence::new(name, Vec::<u8>::new()));
        } else {
            match current.as_mut() {
                Some(seq) => seq
                    .residues
                    .extend(line.iter().filter(|b| !b.is_ascii_whitespace())),
                None => return Err(FastaError::SequenceWithoutHeader(line_number)),
            }
        }
    }

    // Don't forget the last sequence
    if let Some(seq) = current {
        sequences.push(seq);
    }

    if sequences.is_empty() {
        return Err(FastaError::EmptyFile);
    }

    Ok(SequenceSet::new(sequences))
}

/// Strips leading and trailing ASCII whitespace (including `\r`).
fn trim(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}

/// Parses FASTA content from a string.
///
/// Useful for testing or processing in-memory data.
pub fn parse_fasta_str(content: &str) -> FastaResult<SequenceSet> {
    parse_fasta(content.as_bytes())
}
