//! SeqGraph - Pairwise Sequence Similarity Graphs
//!
//! Scores every pair of sequences in a FASTA file once, then shows graph and
//! matrix views for any selection of them.
//!
//! ## Usage
//!
//! ```bash
//! seqgraph <sequences.fasta>                       # interactive viewer
//! seqgraph <sequences.fasta> -o graph.json         # export the full graph
//! seqgraph <sequences.fasta> -o - --view matrix -s 0,2,5 --format tsv
//! ```
//!
//! ## Viewer keys
//!
//! - `j/k`: Move in the sequence list
//! - `Space`: Toggle a sequence, `a`/`c`: select all / clear
//! - `Enter`: Graph, `m`: Matrix
//! - `:e <path>`: Load another file, `:w <path>`: Export, `:q`: Quit

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use seqgraph::align::GlobalScorer;
use seqgraph::cache::BuildOptions;
use seqgraph::controller::{run_app_with_loading, AppConfig};
use seqgraph::export::{detect_format_from_extension, write_view, ExportFormat};
use seqgraph::fasta::parse_fasta_file;
use seqgraph::model::{ActiveView, SequenceSet};
use seqgraph::session::Session;
use seqgraph::view::NamePolicy;

/// Prefix that forces a `--select` token to be read as a name.
const NAME_PREFIX: &str = "name=";

/// Resolves `--select` tokens against the set.
///
/// A token that parses as a number is a 0-based index; anything else is a
/// name. `name=<token>` always reads as a name, so numeric names stay
/// reachable. A name shared by several sequences is rejected.
fn parse_selection(select: Option<&str>, sequences: &SequenceSet) -> Result<Vec<usize>> {
    let Some(select) = select else {
        return Ok((0..sequences.len()).collect());
    };

    select
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            if let Some(name) = token.strip_prefix(NAME_PREFIX) {
                return resolve_name(name, sequences);
            }
            match token.parse::<usize>() {
                Ok(index) => Ok(index),
                Err(_) => resolve_name(token, sequences),
            }
        })
        .collect()
}

fn resolve_name(name: &str, sequences: &SequenceSet) -> Result<usize> {
    match sequences.positions(name).as_slice() {
        [] => anyhow::bail!("Unknown sequence name: {}", name),
        [index] => Ok(*index),
        indices => anyhow::bail!(
            "Sequence name '{}' is shared by sequences {:?}; select by index instead",
            name,
            indices
        ),
    }
}

/// Runs CLI mode: load, score all pairs, derive one view and write it.
fn run_cli_mode(args: &Args, output: &str) -> Result<()> {
    let Some(file_path) = &args.file else {
        anyhow::bail!("An input file is required with -o/--output");
    };

    let sequences = parse_fasta_file(file_path)
        .with_context(|| format!("Failed to load {}", file_path.display()))?;
    if let Some(warning) = sequences.warning() {
        eprintln!("{}", warning);
    }

    let selection = parse_selection(args.select.as_deref(), &sequences)?;
    let options = BuildOptions {
        parallel: !args.sequential,
        ..Default::default()
    };
    let session = Session::load_with(sequences, &GlobalScorer, &options)?;

    let policy: NamePolicy = args.names.into();
    let view = match args.view {
        ViewArg::Graph => ActiveView::Graph(session.graph(&selection, policy)?),
        ViewArg::Matrix => ActiveView::Matrix(session.matrix(&selection, policy)?),
    };

    let format = Option::<ExportFormat>::from(args.format)
        .or_else(|| detect_format_from_extension(output))
        .unwrap_or(ExportFormat::Json);

    // Write output
    if output == "-" {
        write_view(io::stdout().lock(), &view, format)?;
    } else {
        let file = File::create(output).with_context(|| format!("Failed to create {}", output))?;
        write_view(BufWriter::new(file), &view, format)?;
        eprintln!(
            "Wrote {} {} for {} sequences to {}",
            format,
            match args.view {
                ViewArg::Graph => "graph",
                ViewArg::Matrix => "matrix",
            },
            selection.len(),
            output
        );
    }

    Ok(())
}

/// Initialises logging; in viewer mode the log goes to a temp file.
///
/// Returns the log file path when one was created.
fn setup_logging(verbose: u8, quiet: bool, tui: bool) -> Result<Option<PathBuf>> {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    if !tui {
        builder.init();
        return Ok(None);
    }

    // The terminal belongs to the viewer: log to a file, or not at all
    if verbose == 0 {
        return Ok(None);
    }
    let path = std::env::temp_dir().join(format!("seqgraph-{:08x}.log", rand::random::<u32>()));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    builder
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(Some(path))
}

/// View to export in CLI mode
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    /// Nodes and weighted edges
    Graph,
    /// Square score matrix in selection order
    Matrix,
}

/// Output format for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// JSON document
    Json,
    /// Tab-separated edge list or matrix
    Tsv,
    /// From the output extension, JSON otherwise
    Auto,
}

impl From<FormatArg> for Option<ExportFormat> {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Some(ExportFormat::Json),
            FormatArg::Tsv => Some(ExportFormat::Tsv),
            FormatArg::Auto => None,
        }
    }
}

/// Handling of selected sequences that share a name
#[derive(Debug, Clone, Copy, ValueEnum)]
enum NamesArg {
    /// Append #index to shared names
    Disambiguate,
    /// Refuse to build the view
    Reject,
}

impl From<NamesArg> for NamePolicy {
    fn from(arg: NamesArg) -> Self {
        match arg {
            NamesArg::Disambiguate => NamePolicy::Disambiguate,
            NamesArg::Reject => NamePolicy::Reject,
        }
    }
}

/// SeqGraph - pairwise similarity graphs for sequence sets
///
/// When run without -o/--output, opens an interactive viewer.
/// With -o/--output, runs in CLI mode and writes one view to file (or stdout with "-").
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// FASTA file to load
    file: Option<PathBuf>,

    /// Output file (enables CLI mode). Use "-" for stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// View to export in CLI mode
    #[arg(long = "view", value_enum, default_value = "graph")]
    view: ViewArg,

    /// Output format in CLI mode
    #[arg(short = 'f', long = "format", value_enum, default_value = "auto")]
    format: FormatArg,

    /// Sequences to include: comma-separated 0-based indices or names (default: all).
    /// Numbers are read as indices; use name=<name> to select a numeric name.
    #[arg(short = 's', long = "select")]
    select: Option<String>,

    /// Handling of selected sequences sharing a name
    #[arg(long = "names", value_enum, default_value = "disambiguate")]
    names: NamesArg,

    /// Number of worker threads for scoring (default: all cores)
    #[arg(short = 'j', long = "threads")]
    threads: Option<usize>,

    /// Score pairs on a single thread
    #[arg(long = "sequential")]
    sequential: bool,

    /// Use Unicode checkboxes and separators in the viewer
    #[arg(long = "fancy")]
    fancy: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let tui = args.output.is_none();
    let log_file = setup_logging(args.verbose, args.quiet, tui)?;

    if let Some(threads) = args.threads {
        if threads == 0 {
            anyhow::bail!("Thread count must be at least 1");
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set thread count")?;
        info!("Using {} scoring threads", threads);
    }

    // CLI mode: output to file/stdout
    if let Some(output) = &args.output {
        run_cli_mode(&args, output)?;
    } else {
        let config = AppConfig {
            parallel: !args.sequential,
            name_policy: args.names.into(),
            fancy: args.fancy,
        };
        run_app_with_loading(args.file.clone(), config)?;

        if let Some(path) = log_file {
            eprintln!("Log written to {}", path.display());
        }
    }

    Ok(())
}
