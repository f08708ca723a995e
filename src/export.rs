//! Export of graph and matrix views for layout and plotting tools.
//!
//! Two formats are supported:
//! - JSON: the serde representation of [`GraphView`] / [`MatrixView`]
//! - TSV: an edge list (`source target weight`, by label) or a labelled
//!   square matrix

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::model::ActiveView;
use crate::view::{GraphView, MatrixView};

/// Output format for exported views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Tsv,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "JSON"),
            ExportFormat::Tsv => write!(f, "TSV"),
        }
    }
}

/// Errors that can occur while exporting a view.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write output: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to serialize view: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Picks a format from the file extension, if it names one.
pub fn detect_format_from_extension<P: AsRef<Path>>(path: P) -> Option<ExportFormat> {
    let ext = path.as_ref().extension().and_then(OsStr::to_str)?;
    match ext.to_lowercase().as_str() {
        "json" => Some(ExportFormat::Json),
        "tsv" | "tab" | "txt" => Some(ExportFormat::Tsv),
        _ => None,
    }
}

/// Writes a graph view.
pub fn write_graph<W: Write>(
    mut out: W,
    graph: &GraphView,
    format: ExportFormat,
) -> ExportResult<()> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, graph)?;
            writeln!(out)?;
        }
        ExportFormat::Tsv => {
            let labels = graph.labels_by_index();
            writeln!(out, "source\ttarget\tweight")?;
            for edge in &graph.edges {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    labels.get(&edge.source).copied().unwrap_or_default(),
                    labels.get(&edge.target).copied().unwrap_or_default(),
                    edge.weight
                )?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Writes a matrix view.
pub fn write_matrix<W: Write>(
    mut out: W,
    matrix: &MatrixView,
    format: ExportFormat,
) -> ExportResult<()> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, matrix)?;
            writeln!(out)?;
        }
        ExportFormat::Tsv => {
            for label in &matrix.labels {
                write!(out, "\t{}", label)?;
            }
            writeln!(out)?;
            for (label, row) in matrix.labels.iter().zip(&matrix.cells) {
                write!(out, "{}", label)?;
                for cell in row {
                    write!(out, "\t{}", cell)?;
                }
                writeln!(out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Writes whichever view is active.
pub fn write_view<W: Write>(out: W, view: &ActiveView, format: ExportFormat) -> ExportResult<()> {
    match view {
        ActiveView::Graph(graph) => write_graph(out, graph, format),
        ActiveView::Matrix(matrix) => write_matrix(out, matrix, format),
    }
}

/// Writes a view to a file; the format defaults to the file extension, then JSON.
pub fn export_to_path<P: AsRef<Path>>(
    path: P,
    view: &ActiveView,
    format: Option<ExportFormat>,
) -> ExportResult<ExportFormat> {
    let format = format
        .or_else(|| detect_format_from_extension(&path))
        .unwrap_or(ExportFormat::Json);
    let file = File::create(&path)?;
    write_view(BufWriter::new(file), view, format)?;
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SequenceSet;
    use crate::session::Session;
    use crate::view::NamePolicy;

    fn session() -> Session {
        Session::load(SequenceSet::from_records([
            ("s0", "AC"),
            ("s1", "AC"),
            ("s2", "GT"),
        ]))
        .unwrap()
    }

    #[test]
    fn test_detect_from_extension() {
        assert_eq!(detect_format_from_extension("out.json"), Some(ExportFormat::Json));
        assert_eq!(detect_format_from_extension("out.JSON"), Some(ExportFormat::Json));
        assert_eq!(detect_format_from_extension("out.tsv"), Some(ExportFormat::Tsv));
        assert_eq!(detect_format_from_extension("out.png"), None);
        assert_eq!(detect_format_from_extension("out"), None);
    }

    #[test]
    fn test_graph_tsv() {
        let graph = session().graph(&[0, 1, 2], NamePolicy::default()).unwrap();
        let mut buf = Vec::new();
        write_graph(&mut buf, &graph, ExportFormat::Tsv).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "source\ttarget\tweight\ns0\ts1\t2\ns0\ts2\t0\ns1\ts2\t0\n"
        );
    }

    #[test]
    fn test_graph_tsv_keeps_shared_names_apart() {
        let set = SequenceSet::from_records([("x", "AC"), ("x", "AC"), ("x#0", "GT")]);
        let graph = Session::load(set)
            .unwrap()
            .graph(&[0, 1, 2], NamePolicy::Disambiguate)
            .unwrap();
        let mut buf = Vec::new();
        write_graph(&mut buf, &graph, ExportFormat::Tsv).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "source\ttarget\tweight\nx#0#0\tx#1\t2\nx#0#0\tx#0\t0\nx#1\tx#0\t0\n"
        );
    }

    #[test]
    fn test_matrix_tsv() {
        let matrix = session().matrix(&[1, 2], NamePolicy::default()).unwrap();
        let mut buf = Vec::new();
        write_matrix(&mut buf, &matrix, ExportFormat::Tsv).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "\ts1\ts2\ns1\t0\t0\ns2\t0\t0\n");
    }

    #[test]
    fn test_graph_json() {
        let graph = session().graph(&[0, 1], NamePolicy::default()).unwrap();
        let mut buf = Vec::new();
        write_graph(&mut buf, &graph, ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["nodes"][1]["label"], "s1");
        assert_eq!(value["edges"][0]["weight"], 2);
        assert_eq!(value["edges"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_export_to_path_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.tsv");
        let matrix = session().matrix(&[0, 1], NamePolicy::default()).unwrap();
        let format = export_to_path(&path, &ActiveView::Matrix(matrix), None).unwrap();
        assert_eq!(format, ExportFormat::Tsv);
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("\ts0\ts1\n"));
    }
}
