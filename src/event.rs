//! Keyboard event handling.
//!
//! This module manages keyboard input with Vim-style navigation:
//! - `j`/`k`: move down/up in the sequence list
//! - `Space` or `x`: toggle the sequence under the cursor
//! - `a`: select all, `c`: clear selection
//! - `Enter` or `g`: generate the similarity graph
//! - `m`: generate the score matrix
//! - `J`/`K`, `PageDown`/`PageUp`: scroll the view panel
//! - `d`: toggle duplicate-name handling
//! - `Esc`: cancel a running load
//! - `:`: enter command mode
//!   - `:q` or `:quit`: quit the application
//!   - `:h` or `:help`: show help
//!   - `:e <path>`: load another FASTA file
//!   - `:w <path>`: export the current view
//!   - `:<number>`: go to sequence

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use crate::model::{AppMode, AppState, ViewKind};

/// Actions that can be triggered by keyboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action (key not recognized)
    None,
    /// Quit the application
    Quit,
    /// Move cursor up
    MoveUp,
    /// Move cursor down
    MoveDown,
    /// Toggle the checkbox under the cursor
    ToggleSelection,
    /// Check every sequence
    SelectAll,
    /// Uncheck every sequence
    ClearSelection,
    /// Derive the graph view
    GenerateGraph,
    /// Derive the matrix view
    GenerateMatrix,
    /// Scroll the view panel up
    ScrollViewUp,
    /// Scroll the view panel down
    ScrollViewDown,
    /// Switch between disambiguating and rejecting duplicate names
    ToggleNamePolicy,
    /// Cancel the running load
    CancelLoad,
    /// Show the help overlay
    ShowHelp,
    /// Dismiss the help overlay
    DismissHelp,
    /// Enter command mode
    EnterCommandMode,
    /// Add character to command buffer
    CommandChar(char),
    /// Execute current command
    ExecuteCommand,
    /// Cancel command mode
    CancelCommand,
    /// Backspace in command mode
    CommandBackspace,
    /// Resize event (terminal resized)
    Resize(u16, u16),
}

/// Polls for keyboard events with a timeout.
///
/// Returns `None` if no event occurred within the timeout.
pub fn poll_event(timeout: Duration) -> Option<Event> {
    if event::poll(timeout).ok()? {
        event::read().ok()
    } else {
        None
    }
}

/// Converts a crossterm event to an Action based on current app mode.
pub fn handle_event(event: Event, mode: &AppMode, show_help: bool) -> Action {
    match event {
        Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
            handle_key_event(key_event, mode, show_help)
        }
        Event::Resize(width, height) => Action::Resize(width, height),
        _ => Action::None,
    }
}

/// Handles a key event based on the current application mode.
fn handle_key_event(key: KeyEvent, mode: &AppMode, show_help: bool) -> Action {
    // If help is shown, any key dismisses it
    if show_help {
        return Action::DismissHelp;
    }

    match mode {
        AppMode::Normal => handle_normal_mode(key),
        AppMode::Command(_) => handle_command_mode(key),
    }
}

/// Handles key events in normal mode.
fn handle_normal_mode(key: KeyEvent) -> Action {
    // Handle Ctrl+C for emergency quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,

        // Checkboxes
        KeyCode::Char(' ') | KeyCode::Char('x') => Action::ToggleSelection,
        KeyCode::Char('a') => Action::SelectAll,
        KeyCode::Char('c') => Action::ClearSelection,

        // Views
        KeyCode::Enter | KeyCode::Char('g') => Action::GenerateGraph,
        KeyCode::Char('m') => Action::GenerateMatrix,
        KeyCode::Char('J') | KeyCode::PageDown => Action::ScrollViewDown,
        KeyCode::Char('K') | KeyCode::PageUp => Action::ScrollViewUp,
        KeyCode::Char('d') => Action::ToggleNamePolicy,

        KeyCode::Esc => Action::CancelLoad,
        KeyCode::Char('?') => Action::ShowHelp,

        // Command mode
        KeyCode::Char(':') => Action::EnterCommandMode,

        _ => Action::None,
    }
}

/// Handles key events in command mode.
fn handle_command_mode(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::ExecuteCommand,
        KeyCode::Esc => Action::CancelCommand,
        KeyCode::Backspace => Action::CommandBackspace,
        KeyCode::Char(c) => Action::CommandChar(c),
        _ => Action::None,
    }
}

/// Applies an action to the application state.
///
/// Returns `true` if the application should continue, `false` if it should quit.
pub fn apply_action(state: &mut AppState, action: Action) -> bool {
    match action {
        Action::None => {}
        Action::Quit => {
            state.should_quit = true;
        }
        Action::MoveUp => {
            state.move_up();
        }
        Action::MoveDown => {
            state.move_down();
        }
        Action::ToggleSelection => {
            state.toggle_current();
        }
        Action::SelectAll => {
            state.select_all();
        }
        Action::ClearSelection => {
            state.clear_selection();
        }
        Action::GenerateGraph => {
            state.generate_view(ViewKind::Graph);
        }
        Action::GenerateMatrix => {
            state.generate_view(ViewKind::Matrix);
        }
        Action::ScrollViewUp => {
            state.scroll_view(false);
        }
        Action::ScrollViewDown => {
            state.scroll_view(true);
        }
        Action::ToggleNamePolicy => {
            state.toggle_name_policy();
        }
        Action::CancelLoad => {
            state.request_cancel();
        }
        Action::ShowHelp => {
            state.show_help = true;
        }
        Action::DismissHelp => {
            state.dismiss_help();
        }
        Action::EnterCommandMode => {
            state.enter_command_mode();
        }
        Action::CommandChar(c) => {
            state.command_input(c);
        }
        Action::ExecuteCommand => {
            state.execute_command();
        }
        Action::CancelCommand => {
            state.cancel_command();
        }
        Action::CommandBackspace => {
            state.command_backspace();
        }
        Action::Resize(_, _) => {
            // Resize is handled in the main loop with actual terminal dimensions
        }
    }

    !state.should_quit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActiveView, SequenceSet};
    use crate::session::Session;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_normal_mode_navigation() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('j')), &mode, false), Action::MoveDown);
        assert_eq!(handle_key_event(key(KeyCode::Char('k')), &mode, false), Action::MoveUp);
        assert_eq!(handle_key_event(key(KeyCode::Down), &mode, false), Action::MoveDown);
        assert_eq!(handle_key_event(key(KeyCode::Up), &mode, false), Action::MoveUp);
    }

    #[test]
    fn test_selection_keys() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char(' ')), &mode, false), Action::ToggleSelection);
        assert_eq!(handle_key_event(key(KeyCode::Char('x')), &mode, false), Action::ToggleSelection);
        assert_eq!(handle_key_event(key(KeyCode::Char('a')), &mode, false), Action::SelectAll);
        assert_eq!(handle_key_event(key(KeyCode::Char('c')), &mode, false), Action::ClearSelection);
    }

    #[test]
    fn test_view_keys() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Enter), &mode, false), Action::GenerateGraph);
        assert_eq!(handle_key_event(key(KeyCode::Char('g')), &mode, false), Action::GenerateGraph);
        assert_eq!(handle_key_event(key(KeyCode::Char('m')), &mode, false), Action::GenerateMatrix);
        assert_eq!(handle_key_event(key(KeyCode::PageDown), &mode, false), Action::ScrollViewDown);
        assert_eq!(handle_key_event(key(KeyCode::Char('K')), &mode, false), Action::ScrollViewUp);
    }

    #[test]
    fn test_command_mode_input() {
        let mode = AppMode::Command(String::new());
        assert_eq!(handle_key_event(key(KeyCode::Char('q')), &mode, false), Action::CommandChar('q'));
        // Selection keys are plain text while typing a command
        assert_eq!(handle_key_event(key(KeyCode::Char('a')), &mode, false), Action::CommandChar('a'));
        assert_eq!(handle_key_event(key(KeyCode::Enter), &mode, false), Action::ExecuteCommand);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, false), Action::CancelCommand);
        assert_eq!(handle_key_event(key(KeyCode::Backspace), &mode, false), Action::CommandBackspace);
    }

    #[test]
    fn test_ctrl_c_quit() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key, &AppMode::Normal, false), Action::Quit);
    }

    #[test]
    fn test_dismiss_help() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('x')), &mode, true), Action::DismissHelp);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, true), Action::DismissHelp);
    }

    #[test]
    fn test_esc_cancels_load() {
        assert_eq!(handle_key_event(key(KeyCode::Esc), &AppMode::Normal, false), Action::CancelLoad);
    }

    #[test]
    fn test_apply_actions_drive_views() {
        let set = SequenceSet::from_records([("s0", "AC"), ("s1", "AC"), ("s2", "GT")]);
        let mut state = AppState::new(Session::load(set).unwrap(), None);

        apply_action(&mut state, Action::ToggleSelection);
        apply_action(&mut state, Action::MoveDown);
        apply_action(&mut state, Action::ToggleSelection);
        apply_action(&mut state, Action::GenerateGraph);
        match &state.view {
            Some(ActiveView::Graph(g)) => {
                assert_eq!(g.nodes.len(), 2);
                assert_eq!(g.edges[0].weight, 2);
            }
            other => panic!("expected graph, got {:?}", other),
        }

        // Regenerating does not consume anything
        apply_action(&mut state, Action::GenerateGraph);
        apply_action(&mut state, Action::GenerateGraph);
        match &state.view {
            Some(ActiveView::Graph(g)) => assert_eq!(g.edges[0].weight, 2),
            other => panic!("expected graph, got {:?}", other),
        }

        assert!(!apply_action(&mut state, Action::Quit));
    }
}
