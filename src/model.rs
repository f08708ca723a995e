//! Data model for the similarity engine and its viewer.
//!
//! This module contains all data structures for representing:
//! - Sequences and the loaded sequence set
//! - Unordered pair keys into the score cache
//! - Application state for the terminal front end
//!
//! Sequences are immutable once loaded; a reload replaces the whole set.

use std::collections::{BTreeMap, BTreeSet};

use crate::session::Session;
use crate::view::{GraphView, MatrixView, NamePolicy, ViewError};

/// Represents a single sequence with its display name and residues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// Display name (from FASTA header, up to the first whitespace)
    pub name: String,
    /// Residue symbols, compared by exact byte equality
    pub residues: Vec<u8>,
}

impl Sequence {
    /// Creates a new sequence.
    pub fn new(name: impl Into<String>, residues: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            residues: residues.into(),
        }
    }

    /// Returns the number of residues.
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    /// Returns true if the sequence has no residues.
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Returns the raw residue bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.residues
    }

    /// Returns the residues as text, replacing undecodable bytes.
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.residues)
    }
}

/// Ordered collection of sequences from one load, indexed by load order.
#[derive(Debug, Clone, Default)]
pub struct SequenceSet {
    sequences: Vec<Sequence>,
    warning: Option<String>,
}

impl SequenceSet {
    /// Creates a new set from sequences in load order.
    pub fn new(sequences: Vec<Sequence>) -> Self {
        let warning = Self::check_names(&sequences);
        Self { sequences, warning }
    }

    /// Builds a set from `(name, residues)` records as produced by a loader.
    pub fn from_records<I, N, R>(records: I) -> Self
    where
        I: IntoIterator<Item = (N, R)>,
        N: Into<String>,
        R: Into<Vec<u8>>,
    {
        Self::new(
            records
                .into_iter()
                .map(|(name, residues)| Sequence::new(name, residues))
                .collect(),
        )
    }

    /// Reports names shared by more than one sequence.
    fn check_names(sequences: &[Sequence]) -> Option<String> {
        let mut seen = BTreeMap::<&str, usize>::new();
        for seq in sequences {
            *seen.entry(seq.name.as_str()).or_default() += 1;
        }
        let duplicated: Vec<&str> = seen
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(name, _)| name)
            .collect();

        if duplicated.is_empty() {
            None
        } else {
            Some(format!(
                "Warning: duplicate sequence names: {}",
                duplicated.join(", ")
            ))
        }
    }

    /// Returns the number of sequences.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Returns true if the set holds no sequences.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Gets a sequence by index.
    pub fn get(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    /// Iterates over sequences in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.sequences.iter()
    }

    /// Returns the number of unordered pairs, `n(n-1)/2`.
    pub fn pair_count(&self) -> usize {
        let n = self.sequences.len();
        n * n.saturating_sub(1) / 2
    }

    /// Returns the maximum name length (for display purposes).
    pub fn max_name_length(&self) -> usize {
        self.sequences.iter().map(|s| s.name.len()).max().unwrap_or(0)
    }

    /// Data-quality warning (duplicate names), shown to the user after loading.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Indices of every sequence with the given name, in load order.
    pub fn positions(&self, name: &str) -> Vec<usize> {
        self.sequences
            .iter()
            .enumerate()
            .filter(|(_, seq)| seq.name == name)
            .map(|(i, _)| i)
            .collect()
    }

    /// Finds the first sequence with the given name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.sequences.iter().position(|s| s.name == name)
    }
}

impl std::ops::Index<usize> for SequenceSet {
    type Output = Sequence;

    fn index(&self, index: usize) -> &Sequence {
        &self.sequences[index]
    }
}

impl<'a> IntoIterator for &'a SequenceSet {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Unordered pair of distinct sequence indices, stored as `i < j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    pub i: usize,
    pub j: usize,
}

impl PairKey {
    /// Creates a key for `{a, b}`; self-pairs have no key.
    pub fn new(a: usize, b: usize) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { i: a, j: b }),
            std::cmp::Ordering::Greater => Some(Self { i: b, j: a }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// Which derived view the right-hand panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    #[default]
    Graph,
    Matrix,
}

/// The view currently on screen, derived from the session cache.
#[derive(Debug, Clone)]
pub enum ActiveView {
    Graph(GraphView),
    Matrix(MatrixView),
}

impl ActiveView {
    /// Lines the view panel needs: a summary and one line per edge for a
    /// graph; a header, a separator and one line per row for a matrix.
    pub fn line_count(&self) -> usize {
        match self {
            ActiveView::Graph(graph) => graph.edges.len() + 1,
            ActiveView::Matrix(matrix) => matrix.size() + 2,
        }
    }
}

/// Application mode for handling different input states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Command input mode (after pressing ':')
    Command(String),
}

/// Progress of a reload running on a worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProgress {
    /// File being loaded
    pub source: String,
    /// Pairs scored so far
    pub done: usize,
    /// Total pairs to score, known once the file has been read
    pub total: Option<usize>,
}

/// The complete application state.
#[derive(Debug)]
pub struct AppState {
    /// Current sequence set and score cache
    pub session: Session,
    /// Where the current set was loaded from
    pub source: Option<String>,
    /// Checked sequence indices
    pub checked: BTreeSet<usize>,
    /// Highlighted row in the sequence list
    pub cursor: usize,
    /// First visible row in the sequence list
    pub first_row: usize,
    /// Number of visible rows in the sequence list
    pub visible_rows: usize,
    /// First visible line of the view panel
    pub view_scroll: usize,
    /// Panel kind requested by the user
    pub view_kind: ViewKind,
    /// Last derived view, if any
    pub view: Option<ActiveView>,
    /// How duplicate display names are handled
    pub name_policy: NamePolicy,
    /// Current application mode
    pub mode: AppMode,
    /// Whether the help overlay is shown
    pub show_help: bool,
    /// Reload in progress, if any
    pub loading: Option<LoadProgress>,
    /// Path queued by `:e`, picked up by the controller
    pub pending_load: Option<String>,
    /// Path queued by `:w`, picked up by the controller
    pub pending_export: Option<String>,
    /// Set when the user asks to cancel the running reload
    pub cancel_requested: bool,
    /// Whether the application should quit
    pub should_quit: bool,
    /// Status message to display
    pub status_message: Option<String>,
}

impl AppState {
    /// Creates a new application state around a session.
    pub fn new(session: Session, source: Option<String>) -> Self {
        let status_message = session.sequences().warning().map(str::to_string);
        Self {
            session,
            source,
            checked: BTreeSet::new(),
            cursor: 0,
            first_row: 0,
            visible_rows: 0,
            view_scroll: 0,
            view_kind: ViewKind::default(),
            view: None,
            name_policy: NamePolicy::default(),
            mode: AppMode::Normal,
            show_help: false,
            loading: None,
            pending_load: None,
            pending_export: None,
            cancel_requested: false,
            should_quit: false,
            status_message,
        }
    }

    /// Number of sequences in the current set.
    pub fn sequence_count(&self) -> usize {
        self.session.sequences().len()
    }

    /// Swaps in a freshly loaded session; checkboxes and views are reset.
    pub fn replace_session(&mut self, session: Session, source: String) {
        self.status_message = Some(match session.sequences().warning() {
            Some(warning) => warning.to_string(),
            None => format!(
                "Loaded {} sequences ({} pairs) from {}",
                session.sequences().len(),
                session.cache().len(),
                source
            ),
        });
        self.session = session;
        self.source = Some(source);
        self.clear_selection();
        self.cursor = 0;
        self.first_row = 0;
        self.view = None;
        self.view_scroll = 0;
    }

    /// Updates the number of visible list rows.
    pub fn update_viewport_size(&mut self, rows: usize) {
        self.visible_rows = rows;
        self.ensure_cursor_visible();
    }

    /// Moves the cursor up by one row.
    pub fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.ensure_cursor_visible();
        }
    }

    /// Moves the cursor down by one row.
    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.sequence_count() {
            self.cursor += 1;
            self.ensure_cursor_visible();
        }
    }

    /// Keeps the cursor row inside the visible window.
    fn ensure_cursor_visible(&mut self) {
        if self.cursor < self.first_row {
            self.first_row = self.cursor;
        } else if self.visible_rows > 0 && self.cursor >= self.first_row + self.visible_rows {
            self.first_row = self.cursor + 1 - self.visible_rows;
        }
    }

    /// Scrolls the view panel.
    pub fn scroll_view(&mut self, down: bool) {
        if down {
            let last = self
                .view
                .as_ref()
                .map_or(0, |view| view.line_count().saturating_sub(1));
            self.view_scroll = (self.view_scroll + 1).min(last);
        } else {
            self.view_scroll = self.view_scroll.saturating_sub(1);
        }
    }

    /// Toggles the checkbox under the cursor.
    pub fn toggle_current(&mut self) {
        if self.cursor >= self.sequence_count() {
            return;
        }
        if !self.checked.remove(&self.cursor) {
            self.checked.insert(self.cursor);
        }
    }

    /// Checks every sequence.
    pub fn select_all(&mut self) {
        self.checked = (0..self.sequence_count()).collect();
    }

    /// Unchecks every sequence.
    pub fn clear_selection(&mut self) {
        self.checked.clear();
    }

    /// Checked indices in load order.
    pub fn selection(&self) -> Vec<usize> {
        self.checked.iter().copied().collect()
    }

    /// Derives the requested view from the cache for the current checkboxes.
    pub fn generate_view(&mut self, kind: ViewKind) {
        self.view_kind = kind;
        if self.session.sequences().is_empty() {
            self.status_message =
                Some("Please load sequences from a FASTA file (:e <path>).".to_string());
            return;
        }

        let selection = self.selection();
        let result = match kind {
            ViewKind::Graph => self
                .session
                .graph(&selection, self.name_policy)
                .map(ActiveView::Graph),
            ViewKind::Matrix => self
                .session
                .matrix(&selection, self.name_policy)
                .map(ActiveView::Matrix),
        };

        match result {
            Ok(view) => {
                self.status_message = Some(match &view {
                    ActiveView::Graph(g) => {
                        format!("Graph: {} nodes, {} edges", g.nodes.len(), g.edges.len())
                    }
                    ActiveView::Matrix(m) => format!("Matrix: {0}x{0}", m.size()),
                });
                self.view = Some(view);
                self.view_scroll = 0;
            }
            Err(ViewError::EmptySelection) => {
                self.status_message =
                    Some("Please select at least one sequence to generate the view.".to_string());
            }
            Err(e) => {
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Flips the duplicate-name policy.
    pub fn toggle_name_policy(&mut self) {
        self.name_policy = match self.name_policy {
            NamePolicy::Disambiguate => NamePolicy::Reject,
            NamePolicy::Reject => NamePolicy::Disambiguate,
        };
        self.status_message = Some(format!("Duplicate names: {}", self.name_policy));
    }

    /// Enters command mode.
    pub fn enter_command_mode(&mut self) {
        self.mode = AppMode::Command(String::new());
    }

    /// Handles a character input in command mode.
    pub fn command_input(&mut self, c: char) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.push(c);
        }
    }

    /// Handles backspace in command mode.
    pub fn command_backspace(&mut self) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.pop();
            if cmd.is_empty() {
                self.mode = AppMode::Normal;
            }
        }
    }

    /// Executes the current command.
    pub fn execute_command(&mut self) {
        if let AppMode::Command(cmd) = std::mem::take(&mut self.mode) {
            let cmd = cmd.trim();
            let (verb, arg) = match cmd.split_once(char::is_whitespace) {
                Some((verb, arg)) => (verb, arg.trim()),
                None => (cmd, ""),
            };
            match verb {
                "q" | "quit" => self.should_quit = true,
                "h" | "help" => self.show_help = true,
                "e" | "edit" | "open" if !arg.is_empty() => {
                    if self.loading.is_some() {
                        self.status_message =
                            Some("A load is already running (Esc cancels it)".to_string());
                    } else {
                        self.pending_load = Some(arg.to_string());
                    }
                }
                "w" | "write" if !arg.is_empty() => {
                    if self.view.is_some() {
                        self.pending_export = Some(arg.to_string());
                    } else {
                        self.status_message =
                            Some("Nothing to export: generate a graph or matrix first".to_string());
                    }
                }
                "e" | "edit" | "open" | "w" | "write" => {
                    self.status_message = Some(format!("Usage: :{} <path>", verb));
                }
                "graph" => self.generate_view(ViewKind::Graph),
                "matrix" => self.generate_view(ViewKind::Matrix),
                "names" => self.toggle_name_policy(),
                _ => {
                    if let Ok(row) = cmd.parse::<usize>() {
                        if row > 0 && row <= self.sequence_count() {
                            self.cursor = row - 1; // 1-indexed for user
                            self.ensure_cursor_visible();
                        } else {
                            self.status_message = Some(format!("Invalid sequence number: {}", row));
                        }
                    } else {
                        self.status_message = Some(format!("Unknown command: {}", cmd));
                    }
                }
            }
        }
        self.mode = AppMode::Normal;
    }

    /// Cancels command mode and returns to normal mode.
    pub fn cancel_command(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Hides the help overlay.
    pub fn dismiss_help(&mut self) {
        self.show_help = false;
    }

    /// Asks the controller to stop the running reload.
    pub fn request_cancel(&mut self) {
        if self.loading.is_some() {
            self.cancel_requested = true;
            self.status_message = Some("Cancelling load...".to_string());
        }
    }
}
