//! # SeqGraph - Pairwise Sequence Similarity Graphs
//!
//! Computes global-alignment similarity scores between every pair of a set of
//! sequences once, then derives graph and matrix views for any subset of them.
//!
//! ## Architecture
//!
//! The engine separates "compute once" from "select and view many times":
//! - `model`: Sequences, the loaded sequence set, and application state
//! - `align`: Pairwise global alignment score (free gaps, unit matches)
//! - `cache`: All-pairs score cache, built in parallel with rayon
//! - `view`: Graph and matrix views over a selection, read-only on the cache
//! - `session`: The current set and cache, replaced together on reload
//! - `fasta`: FASTA file loading
//! - `export`: JSON/TSV output for layout and plotting tools
//! - `event`, `ui`, `controller`: Terminal front end with ratatui

pub mod align;
pub mod cache;
pub mod controller;
pub mod event;
pub mod export;
pub mod fasta;
pub mod model;
pub mod session;
pub mod ui;
pub mod view;
