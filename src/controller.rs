//! Application controller.
//!
//! This module orchestrates the main application loop:
//! - Terminal initialization and cleanup
//! - Event polling and handling
//! - Background loads: the file is read and the score cache built on a worker
//!   thread, and the finished session is swapped in whole
//! - View export requested from the command line

use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use thiserror::Error;

use crate::align::GlobalScorer;
use crate::cache::{BuildError, BuildOptions, CancelToken, Progress};
use crate::event::{apply_action, handle_event, poll_event, Action};
use crate::export::export_to_path;
use crate::fasta::{parse_fasta_file, FastaError};
use crate::model::{AppState, LoadProgress};
use crate::session::Session;
use crate::ui::{calculate_visible_rows, glyphs, render};
use crate::view::NamePolicy;

/// Front-end settings taken from the command line.
#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
    /// Build the cache on the rayon pool
    pub parallel: bool,
    /// Initial duplicate-name handling
    pub name_policy: NamePolicy,
    /// Use Unicode glyphs
    pub fancy: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            name_policy: NamePolicy::default(),
            fancy: false,
        }
    }
}

/// Why a background load produced no session.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Read(#[from] FastaError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Messages from the load worker.
enum LoadEvent {
    /// The file was read; scoring starts.
    Parsed { sequences: usize, pairs: usize },
    /// The load is over.
    Finished(Result<Session, LoadError>),
}

/// A file read and score cache build running on a worker thread.
pub struct Loader {
    source: String,
    total: Option<usize>,
    progress: Progress,
    cancel: CancelToken,
    receiver: Receiver<LoadEvent>,
}

impl Loader {
    /// Starts reading `path` and building its session in the background.
    ///
    /// Reading and build errors both arrive through [`Loader::poll`].
    pub fn start(path: &Path, parallel: bool) -> Self {
        let source = path.display().to_string();
        let progress = Progress::new();
        let cancel = CancelToken::new();
        let options = BuildOptions {
            parallel,
            cancel: Some(cancel.clone()),
            progress: Some(progress.clone()),
        };

        let (sender, receiver) = mpsc::channel();
        let path = path.to_path_buf();
        thread::spawn(move || {
            // Send errors mean the app already quit
            let result = match parse_fasta_file(&path) {
                Ok(sequences) => {
                    let _ = sender.send(LoadEvent::Parsed {
                        sequences: sequences.len(),
                        pairs: sequences.pair_count(),
                    });
                    if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                        Err(LoadError::Build(BuildError::Cancelled))
                    } else {
                        Session::load_with(sequences, &GlobalScorer, &options)
                            .map_err(LoadError::from)
                    }
                }
                Err(e) => Err(LoadError::from(e)),
            };
            let _ = sender.send(LoadEvent::Finished(result));
        });

        Self {
            source,
            total: None,
            progress,
            cancel,
            receiver,
        }
    }

    /// Current progress for display.
    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            source: self.source.clone(),
            done: self.progress.done(),
            total: self.total,
        }
    }

    /// Asks the worker to stop before its next pair.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns the finished load, if any.
    pub fn poll(&mut self) -> Option<Result<Session, LoadError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(result) = self.handle(event) {
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                // Worker died without reporting; treat as cancelled
                Err(TryRecvError::Disconnected) => {
                    return Some(Err(LoadError::Build(BuildError::Cancelled)))
                }
            }
        }
    }

    /// Blocks until the load finishes.
    pub fn wait(mut self) -> Result<Session, LoadError> {
        while let Ok(event) = self.receiver.recv() {
            if let Some(result) = self.handle(event) {
                return result;
            }
        }
        Err(LoadError::Build(BuildError::Cancelled))
    }

    fn handle(&mut self, event: LoadEvent) -> Option<Result<Session, LoadError>> {
        match event {
            LoadEvent::Parsed { sequences, pairs } => {
                info!("Loading {}: {} sequences, {} pairs", self.source, sequences, pairs);
                self.total = Some(pairs);
                None
            }
            LoadEvent::Finished(result) => Some(result),
        }
    }
}

/// Starts, cancels and completes loads requested through the state.
pub fn service_loads(state: &mut AppState, loader: &mut Option<Loader>, parallel: bool) {
    if let Some(path) = state.pending_load.take() {
        if let Some(previous) = loader.take() {
            previous.cancel();
        }
        let started = Loader::start(Path::new(&path), parallel);
        state.loading = Some(started.progress());
        *loader = Some(started);
    }

    if state.cancel_requested {
        state.cancel_requested = false;
        if let Some(running) = loader.as_ref() {
            running.cancel();
        }
    }

    let Some(running) = loader.as_mut() else {
        return;
    };
    let finished = running.poll();
    state.loading = Some(running.progress());

    if let Some(result) = finished {
        let source = running.source.clone();
        *loader = None;
        state.loading = None;
        match result {
            Ok(session) => state.replace_session(session, source),
            Err(LoadError::Build(BuildError::Cancelled)) => {
                info!("Load of {} cancelled", source);
                state.status_message =
                    Some(format!("Load of {} cancelled; keeping current sequences", source));
            }
            Err(LoadError::Read(e)) => {
                warn!("Failed to load {}: {}", source, e);
                state.status_message = Some(format!("Error loading {}: {}", source, e));
            }
            Err(e) => {
                warn!("Load of {} failed: {}", source, e);
                state.status_message = Some(format!("Error: {}", e));
            }
        }
    }
}

/// Writes the current view to the path queued by `:w`.
pub fn service_export(state: &mut AppState) {
    let Some(path) = state.pending_export.take() else {
        return;
    };
    let Some(view) = state.view.as_ref() else {
        return;
    };
    state.status_message = Some(match export_to_path(&path, view, None) {
        Ok(format) => {
            info!("Exported view to {} ({})", path, format);
            format!("Wrote {} to {}", format, path)
        }
        Err(e) => format!("Error writing {}: {}", path, e),
    });
}

/// The main application controller.
pub struct App {
    /// Terminal backend
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Application state
    state: AppState,
    /// Background load, if one is running
    loader: Option<Loader>,
    /// Front-end settings
    config: AppConfig,
    /// Event poll timeout
    tick_rate: Duration,
}

impl App {
    /// Creates a new application with the given state.
    pub fn new(state: AppState, config: AppConfig) -> Result<Self> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            state,
            loader: None,
            config,
            tick_rate: Duration::from_millis(50),
        })
    }

    /// Runs the main application loop.
    pub fn run(&mut self) -> Result<()> {
        let glyphs = glyphs::select(self.config.fancy);
        self.update_viewport_size()?;

        loop {
            service_loads(&mut self.state, &mut self.loader, self.config.parallel);
            service_export(&mut self.state);

            self.terminal.draw(|frame| {
                render(frame, &self.state, &glyphs);
            })?;

            if let Some(event) = poll_event(self.tick_rate) {
                let action = handle_event(event, &self.state.mode, self.state.show_help);

                // Handle resize specially to update viewport
                if let Action::Resize(_, _) = action {
                    self.update_viewport_size()?;
                }

                if !apply_action(&mut self.state, action) {
                    break;
                }
            }
        }

        if let Some(running) = self.loader.take() {
            running.cancel();
        }
        Ok(())
    }

    /// Updates the visible list size based on terminal dimensions.
    fn update_viewport_size(&mut self) -> Result<()> {
        let size = self.terminal.size()?;
        self.state
            .update_viewport_size(calculate_visible_rows(size.height));
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        // Restore terminal
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Runs the viewer, loading `file` in the background if given.
pub fn run_app_with_loading(file: Option<PathBuf>, config: AppConfig) -> Result<()> {
    let mut state = AppState::new(Session::default(), None);
    state.name_policy = config.name_policy;
    match file {
        Some(path) => state.pending_load = Some(path.display().to_string()),
        None => {
            state.status_message =
                Some("No file loaded. Use :e <path> to open a FASTA file, :h for help.".to_string())
        }
    }

    let mut app = App::new(state, config)?;
    app.run()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::model::SequenceSet;

    fn fasta_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_app_state_creation() {
        let set = SequenceSet::from_records([("seq1", "ACGT"), ("seq2", "TGCA")]);
        let state = AppState::new(Session::load(set).unwrap(), Some("test".to_string()));

        assert_eq!(state.sequence_count(), 2);
        assert!(!state.should_quit);
    }

    /// Services loads until the running one finishes.
    fn finish_load(state: &mut AppState, loader: &mut Option<Loader>, parallel: bool) {
        for _ in 0..500 {
            if loader.is_none() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
            service_loads(state, loader, parallel);
        }
        assert!(loader.is_none());
    }

    #[test]
    fn test_loader_builds_session() {
        let file = fasta_file(">a\nAAAA\n>b\nAAAA\n>c\nTTTT\n");
        let loader = Loader::start(file.path(), true);
        let session = loader.wait().unwrap();
        assert_eq!(session.cache().len(), 3);
        assert_eq!(session.cache().get(0, 1), Some(4));
        assert_eq!(session.cache().get(1, 2), Some(0));
    }

    #[test]
    fn test_loader_reports_total_once_parsed() {
        let file = fasta_file(">a\nAC\n>b\nAC\n>c\nGT\n");
        let mut loader = Loader::start(file.path(), false);
        let mut finished = None;
        for _ in 0..500 {
            finished = loader.poll();
            if finished.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(finished.unwrap().is_ok());
        assert_eq!(loader.progress().total, Some(3));
        assert_eq!(loader.progress().done, 3);
    }

    #[test]
    fn test_loader_reports_read_errors() {
        let loader = Loader::start(Path::new("/nonexistent/x.fasta"), false);
        assert!(matches!(loader.wait(), Err(LoadError::Read(FastaError::IoError(_)))));
    }

    #[test]
    fn test_service_loads_swaps_session() {
        let file = fasta_file(">x\nAC\n>y\nAC\n");
        let set = SequenceSet::from_records([("old", "A")]);
        let mut state = AppState::new(Session::load(set).unwrap(), None);
        state.select_all();
        state.pending_load = Some(file.path().display().to_string());

        let mut loader = None;
        service_loads(&mut state, &mut loader, false);
        assert!(loader.is_some() || state.sequence_count() == 2);

        finish_load(&mut state, &mut loader, false);
        assert!(state.loading.is_none());
        assert_eq!(state.sequence_count(), 2);
        assert!(state.selection().is_empty());
        assert_eq!(state.session.cache().get(0, 1), Some(2));
    }

    #[test]
    fn test_failed_load_keeps_session() {
        let file = fasta_file(">ok\nACGT\n>bad\nAC\u{e9}GT\n");
        let set = SequenceSet::from_records([("old", "A"), ("older", "A")]);
        let mut state = AppState::new(Session::load(set).unwrap(), None);

        state.pending_load = Some(file.path().display().to_string());
        let mut loader = None;
        service_loads(&mut state, &mut loader, true);
        finish_load(&mut state, &mut loader, true);

        assert_eq!(state.sequence_count(), 2);
        assert_eq!(state.session.sequences()[0].name, "old");
        assert!(state.status_message.as_deref().unwrap().starts_with("Error"));
    }

    #[test]
    fn test_missing_file_reported_in_status() {
        let mut state = AppState::new(Session::default(), None);
        state.pending_load = Some("/nonexistent/x.fasta".to_string());
        let mut loader = None;
        service_loads(&mut state, &mut loader, true);
        finish_load(&mut state, &mut loader, true);
        assert!(state.loading.is_none());
        assert!(state.status_message.as_deref().unwrap().starts_with("Error loading"));
    }

    #[test]
    fn test_service_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let set = SequenceSet::from_records([("a", "AC"), ("b", "AC")]);
        let mut state = AppState::new(Session::load(set).unwrap(), None);
        state.select_all();
        state.generate_view(crate::model::ViewKind::Graph);
        state.pending_export = Some(path.display().to_string());

        service_export(&mut state);
        assert!(state.pending_export.is_none());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"weight\": 2"));
    }
}
