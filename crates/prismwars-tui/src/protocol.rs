// Messages exchanged between the application loop and the terminal UI.

use std::sync::Arc;

use prismwars_core::connection::ConnectionStatus;
use prismwars_core::interaction::InteractionMode;
use prismwars_core::preview::Preview;
use prismwars_core::snapshot::{GameSnapshot, PieceKind};
use prismwars_core::wire::GameOverPayload;

/// App -> TUI.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    ConnectionStatus(ConnectionStatus),
    /// A new authoritative snapshot; the view replaces its copy wholesale.
    Snapshot {
        snapshot: Arc<GameSnapshot>,
        me: Option<usize>,
        beams_changed: bool,
    },
    Interaction(InteractionMode),
    Preview(Option<Box<Preview>>),
    Timer(Option<u32>),
    /// Transient message (local validation failure or authority error).
    Notification(String),
    /// Terminal transition. The payload is absent when the game ended via a
    /// finished snapshot rather than a game-over event.
    GameOver(Option<Box<GameOverPayload>>),
}

/// TUI -> App.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    SelectPiece(PieceKind),
    /// Rotate the selected piece by the given number of degrees.
    Rotate(i32),
    TogglePickup,
    Deselect,
    CancelPairedPlacement,
    PassTurn,
    CellClicked { x: i32, y: i32 },
    Hover { x: i32, y: i32 },
    PointerLeft,
    Quit,
}
