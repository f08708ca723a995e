//! TUI rendering module.
//!
//! This module handles all visual rendering using ratatui:
//! - Sequence list with checkboxes on the left
//! - Graph (edge list) or score matrix panel on the right
//! - Status bar with selection, load progress and messages
//! - Help overlay

pub mod glyphs;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::model::{ActiveView, AppMode, AppState, LoadProgress, ViewKind};
use crate::view::{GraphView, MatrixView};
use glyphs::Glyphs;

/// Width reserved for the sequence list (including border and padding).
const LIST_PANEL_WIDTH: u16 = 32;
/// Minimum width for the view panel.
const MIN_VIEW_PANEL_WIDTH: u16 = 20;
/// Height of the status bar.
const STATUS_BAR_HEIGHT: u16 = 1;
/// Widest matrix column label.
const MATRIX_LABEL_WIDTH: usize = 10;

const HELP_TEXT: &[&str] = &[
    "Select sequences with the checkboxes, then derive a view from the pairwise scores computed at load time. Views never recompute or alter the scores.",
    "",
    "j/k, Up/Down      move in the sequence list",
    "Space or x        toggle the sequence under the cursor",
    "a / c             select all / clear selection",
    "Enter or g        similarity graph (edge list with weights)",
    "m                 score matrix (heatmap data)",
    "J/K, PgDn/PgUp    scroll the view panel",
    "d                 toggle duplicate-name handling (disambiguate or reject)",
    "Esc               cancel a running load, keeping the current sequences",
    ":e <path>         load a FASTA file",
    ":w <path>         export the current view (.json or .tsv)",
    ":<n>              go to sequence n",
    ":q                quit",
    "",
    "Press any key to close this help.",
];

/// Renders the complete UI.
pub fn render(frame: &mut Frame, state: &AppState, glyphs: &Glyphs) {
    let area = frame.area();

    // Main layout: content area + status bar
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(STATUS_BAR_HEIGHT),
        ])
        .split(area);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(LIST_PANEL_WIDTH),
            Constraint::Min(MIN_VIEW_PANEL_WIDTH),
        ])
        .split(main_layout[0]);

    render_sequence_list(frame, state, glyphs, content_layout[0]);
    render_view_panel(frame, state, glyphs, content_layout[1]);
    render_status_bar(frame, state, main_layout[1]);

    if state.show_help {
        render_help(frame, area);
    }
}

/// Shortens `text` to `max` characters, marking the cut.
pub fn truncate(text: &str, max: usize, ellipsis: &str) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(ellipsis.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ellipsis);
    out
}

/// Renders the checkbox list of sequences.
fn render_sequence_list(frame: &mut Frame, state: &AppState, glyphs: &Glyphs, area: Rect) {
    let sequences = state.session.sequences();
    let visible_rows = area.height.saturating_sub(2) as usize;
    let start_row = state.first_row;
    let end_row = (start_row + visible_rows).min(sequences.len());

    // cursor + space + checkbox + space
    let prefix_width = glyphs.cursor.chars().count() + glyphs.checked.chars().count() + 2;
    let max_name_len = (area.width.saturating_sub(2) as usize).saturating_sub(prefix_width);

    let mut lines: Vec<Line> = Vec::new();
    for row_idx in start_row..end_row {
        let seq = &sequences[row_idx];
        let is_current = row_idx == state.cursor;
        let is_checked = state.checked.contains(&row_idx);

        let marker = if is_current {
            glyphs.cursor.to_string()
        } else {
            " ".repeat(glyphs.cursor.chars().count())
        };
        let checkbox = if is_checked { glyphs.checked } else { glyphs.unchecked };
        let name = truncate(&seq.name, max_name_len, glyphs.ellipsis);

        let style = if is_current {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else if is_checked {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        };

        lines.push(Line::from(Span::styled(
            format!("{} {} {}", marker, checkbox, name),
            style,
        )));
    }

    if sequences.is_empty() {
        lines.push(Line::from(Span::styled(
            "No sequences loaded (:e <path>)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let title = format!(
        "Sequences [{}/{}]",
        state.checked.len(),
        sequences.len()
    );
    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Renders the graph or matrix panel.
///
/// Only the lines inside the panel are built, starting at `view_scroll`.
fn render_view_panel(frame: &mut Frame, state: &AppState, glyphs: &Glyphs, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let first = state.view_scroll;

    let (title, lines) = match &state.view {
        Some(ActiveView::Graph(graph)) => (
            format!(
                "Similarity graph [{} nodes, {} edges]",
                graph.nodes.len(),
                graph.edges.len()
            ),
            graph_lines(graph, glyphs, first, height),
        ),
        Some(ActiveView::Matrix(matrix)) => (
            format!("Score matrix [{0}x{0}]", matrix.size()),
            matrix_lines(matrix, glyphs, first, height),
        ),
        None => {
            let hint = match state.view_kind {
                ViewKind::Graph => "Select sequences and press Enter for the graph, m for the matrix",
                ViewKind::Matrix => "Select sequences and press m for the matrix, Enter for the graph",
            };
            (
                "View".to_string(),
                vec![Line::from(Span::styled(
                    hint,
                    Style::default().fg(Color::DarkGray),
                ))],
            )
        }
    };

    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Edge list lines `first..first + height`, strongest edges in bold.
///
/// Line 0 is the summary; line `n` shows edge `n - 1`.
pub fn graph_lines(
    graph: &GraphView,
    glyphs: &Glyphs,
    first: usize,
    height: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(height);
    if height == 0 {
        return lines;
    }

    let range = graph.weight_range();
    if first == 0 {
        let summary = match range {
            Some((min, max)) => format!("weights {}..{}", min, max),
            None => "no edges".to_string(),
        };
        lines.push(Line::from(Span::styled(
            format!("nodes: {}  {}", graph.nodes.len(), summary),
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }

    let start = first.saturating_sub(1).min(graph.edges.len());
    let end = (first + height - 1).min(graph.edges.len());
    let visible = &graph.edges[start..end];

    let labels = graph.labels_by_index();
    let width = graph
        .nodes
        .iter()
        .map(|n| n.label.chars().count())
        .max()
        .unwrap_or(0)
        .min(MATRIX_LABEL_WIDTH * 2);
    let max_weight = range.map(|(_, max)| max);

    for edge in visible {
        let source = truncate(
            labels.get(&edge.source).copied().unwrap_or_default(),
            width,
            glyphs.ellipsis,
        );
        let target = truncate(
            labels.get(&edge.target).copied().unwrap_or_default(),
            width,
            glyphs.ellipsis,
        );
        let style = if Some(edge.weight) == max_weight && edge.weight > 0 {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{:<w$} {} {:<w$} ", source, glyphs.edge, target, w = width)),
            Span::styled(edge.weight.to_string(), style),
        ]));
    }

    lines
}

/// Matrix lines `first..first + height`.
///
/// Line 0 is the header of labels, line 1 a separator, then one line per
/// selected sequence.
pub fn matrix_lines(
    matrix: &MatrixView,
    glyphs: &Glyphs,
    first: usize,
    height: usize,
) -> Vec<Line<'static>> {
    let labels: Vec<String> = matrix
        .labels
        .iter()
        .map(|l| truncate(l, MATRIX_LABEL_WIDTH, glyphs.ellipsis))
        .collect();
    let row_label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let cell_width = labels
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(matrix.max_score().to_string().len()))
        .max()
        .unwrap_or(1);

    let end = first.saturating_add(height);
    let mut lines = Vec::with_capacity(height);

    if first == 0 && height > 0 {
        let mut header = format!("{:w$}", "", w = row_label_width);
        for label in &labels {
            header.push_str(&format!(" {:>w$}", label, w = cell_width));
        }
        lines.push(Line::from(Span::styled(
            header,
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }
    if first <= 1 && end > 1 {
        lines.push(Line::from(
            glyphs
                .h_separator
                .repeat(row_label_width + labels.len() * (cell_width + 1)),
        ));
    }

    let start_row = first.saturating_sub(2).min(matrix.size());
    let end_row = end.saturating_sub(2).min(matrix.size());
    for row_idx in start_row..end_row {
        let mut spans = vec![Span::styled(
            format!("{:<w$}", labels[row_idx], w = row_label_width),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for (col_idx, &cell) in matrix.cells[row_idx].iter().enumerate() {
            let style = if col_idx == row_idx {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            spans.push(Span::styled(format!(" {:>w$}", cell, w = cell_width), style));
        }
        lines.push(Line::from(spans));
    }

    lines
}

/// Renders the status bar at the bottom.
fn render_status_bar(frame: &mut Frame, state: &AppState, area: Rect) {
    let (mode_str, command_str) = match &state.mode {
        AppMode::Normal => ("NORMAL", String::new()),
        AppMode::Command(cmd) => ("COMMAND", format!(":{}", cmd)),
    };

    let message = match &state.loading {
        Some(LoadProgress {
            source,
            total: None,
            ..
        }) => format!("Reading {} (Esc cancels)", source),
        Some(LoadProgress {
            source,
            done,
            total: Some(total),
        }) => format!("Loading {}: {}/{} pairs (Esc cancels)", source, done, total),
        None => state.status_message.clone().unwrap_or_default(),
    };

    let position_info = format!(
        "Seq {}/{} | Selected {} | Names: {} ",
        (state.cursor + 1).min(state.sequence_count()),
        state.sequence_count(),
        state.checked.len(),
        state.name_policy
    );

    let left_content = if command_str.is_empty() {
        format!(" {} | {} ", mode_str, message)
    } else {
        format!(" {} | {} ", mode_str, command_str)
    };

    let left_len = left_content.chars().count();
    let status_line = Line::from(vec![
        Span::styled(
            left_content,
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::styled(
            " ".repeat((area.width as usize).saturating_sub(left_len + position_info.len())),
            Style::default().bg(Color::Cyan),
        ),
        Span::styled(
            position_info,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    frame.render_widget(Paragraph::new(status_line), area);
}

/// Renders the help overlay centred on `area`.
fn render_help(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(area, 80, 20);
    let text_width = popup.width.saturating_sub(2).max(1) as usize;

    let lines: Vec<Line> = help_lines(text_width)
        .into_iter()
        .map(Line::from)
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .style(Style::default().fg(Color::White).bg(Color::Black));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Help text wrapped to `width` columns.
pub fn help_lines(width: usize) -> Vec<String> {
    HELP_TEXT
        .iter()
        .flat_map(|line| {
            if line.is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, width)
                    .into_iter()
                    .map(|cow| cow.into_owned())
                    .collect()
            }
        })
        .collect()
}

/// A rectangle of at most `width` x `height` centred in `area`.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Calculates the number of visible rows in the sequence list.
pub fn calculate_visible_rows(terminal_height: u16) -> usize {
    // Account for borders and status bar
    terminal_height.saturating_sub(STATUS_BAR_HEIGHT + 2) as usize
}
