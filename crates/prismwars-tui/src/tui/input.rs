// Keyboard and mouse input handling.
//
// Translates crossterm events into UserCommand messages for the app
// orchestrator, or into local ViewState changes (quit confirmation, cursor
// and pointer tracking). Nothing here validates moves; that is the
// interaction state machine's job on the other side of the channel.

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use prismwars_core::snapshot::PieceKind;

use super::widgets::board;
use super::ViewState;
use crate::protocol::UserCommand;

/// Degrees per rotation key press.
const ROTATION_STEP: i32 = 90;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator, `None` when it was handled locally or ignored.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports both press and release.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode.
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    // The game is over: the results overlay only waits to be dismissed.
    if view_state.finished {
        return match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => Some(UserCommand::Quit),
            _ => None,
        };
    }

    match key_event.code {
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            Some(UserCommand::SelectPiece(PieceKind::ALL[index]))
        }
        KeyCode::Char('r') => Some(UserCommand::Rotate(ROTATION_STEP)),
        KeyCode::Char('R') => Some(UserCommand::Rotate(-ROTATION_STEP)),
        KeyCode::Char('p') => Some(UserCommand::TogglePickup),
        KeyCode::Esc => Some(UserCommand::Deselect),
        KeyCode::Char('c') => Some(UserCommand::CancelPairedPlacement),
        KeyCode::Char('n') => Some(UserCommand::PassTurn),

        KeyCode::Up | KeyCode::Char('k') => move_cursor(view_state, 0, -1),
        KeyCode::Down | KeyCode::Char('j') => move_cursor(view_state, 0, 1),
        KeyCode::Left | KeyCode::Char('h') => move_cursor(view_state, -1, 0),
        KeyCode::Right | KeyCode::Char('l') => move_cursor(view_state, 1, 0),
        KeyCode::Enter | KeyCode::Char(' ') => {
            view_state.board_size()?;
            let (x, y) = view_state.cursor;
            Some(UserCommand::CellClicked { x, y })
        }

        // Quit asks for confirmation first.
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }

        _ => None,
    }
}

/// Keys while the quit dialog is up: y/q confirm, n/Esc cancel.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('q') => Some(UserCommand::Quit),
        KeyCode::Char('n') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

/// Move the keyboard cursor, clamped to the board, and hover the new cell.
fn move_cursor(view_state: &mut ViewState, dx: i32, dy: i32) -> Option<UserCommand> {
    let last = view_state.board_size()?.saturating_sub(1) as i32;
    let (x, y) = view_state.cursor;
    let (x, y) = ((x + dx).clamp(0, last), (y + dy).clamp(0, last));
    view_state.cursor = (x, y);
    Some(UserCommand::Hover { x, y })
}

/// Handle a mouse event over the terminal.
///
/// Pointer movement produces `Hover` only when it enters a different cell,
/// and a single `PointerLeft` when it leaves the board.
pub fn handle_mouse(mouse_event: MouseEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    if view_state.finished || view_state.confirm_quit {
        return None;
    }
    let cell = board::hit_cell(view_state, mouse_event.column, mouse_event.row);

    match mouse_event.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => match cell {
            Some(cell) if view_state.pointer_cell != Some(cell) => {
                view_state.pointer_cell = Some(cell);
                view_state.cursor = cell;
                Some(UserCommand::Hover {
                    x: cell.0,
                    y: cell.1,
                })
            }
            Some(_) => None,
            None => view_state
                .pointer_cell
                .take()
                .map(|_| UserCommand::PointerLeft),
        },
        MouseEventKind::Down(MouseButton::Left) => {
            let (x, y) = cell?;
            view_state.cursor = (x, y);
            Some(UserCommand::CellClicked { x, y })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
