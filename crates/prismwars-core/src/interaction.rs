// Interaction state machine: the client-only intent layered on top of the
// authoritative snapshot (selected piece, rotation, pickup mode, and the
// mirrored paired-placement state).
//
// States: Idle, PieceSelected, Pickup, PairedPending. Pickup and a piece
// selection are mutually exclusive by construction. PairedPending is never
// entered on the client's own initiative; it mirrors the authority's
// `pending_portal` marker.

use thiserror::Error;
use tracing::{debug, info};

use crate::snapshot::{Cell, Exclusion, GameSnapshot, PieceKind, Rotation, SnapshotStore};
use crate::wire::GameCommand;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an inventory entry could not be selected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Waiting for the game state")]
    NoSnapshot,
    #[error("No {} pieces remaining", .0.label())]
    OutOfStock(PieceKind),
    #[error("Not enough energy for a {} ({cost} needed, {available} available)", kind.label())]
    CannotAfford {
        kind: PieceKind,
        cost: u32,
        available: u32,
    },
    #[error("Place or cancel the second portal first")]
    PairedPlacementPending,
}

/// Local placement pre-check failures. Surfaced like authority rejections,
/// but no command is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("Portal must be on the border")]
    PortalNotOnBorder,
    #[error("That cell is protected")]
    ProtectedCell,
    #[error("Blockers cannot be placed that close to a light source")]
    TooCloseToLightSource,
}

/// Legality pre-check shared by clicks and hover previews. Does not look at
/// occupancy; callers treat occupied cells as silent no-ops.
pub fn validate_placement(
    snapshot: &GameSnapshot,
    kind: PieceKind,
    cell: Cell,
) -> Result<(), PlacementError> {
    if kind.requires_border() && !snapshot.is_border(cell) {
        return Err(PlacementError::PortalNotOnBorder);
    }
    match snapshot.exclusion(kind, cell) {
        Some(Exclusion::Protected) => Err(PlacementError::ProtectedCell),
        Some(Exclusion::NearLightSource) => Err(PlacementError::TooCloseToLightSource),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractionMode {
    #[default]
    Idle,
    PieceSelected {
        kind: PieceKind,
        rotation: Rotation,
    },
    Pickup,
    /// First portal confirmed by the authority; the second must follow.
    PairedPending,
}

/// Owner of the selection state. Only this type writes it.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    mode: InteractionMode,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn selected_piece(&self) -> Option<PieceKind> {
        match self.mode {
            InteractionMode::PieceSelected { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Current rotation; 0 whenever nothing is selected.
    pub fn rotation(&self) -> Rotation {
        match self.mode {
            InteractionMode::PieceSelected { rotation, .. } => rotation,
            _ => Rotation::ZERO,
        }
    }

    /// What a board click would place right now. The second portal of a
    /// pair always goes down unrotated.
    pub fn placement(&self) -> Option<(PieceKind, Rotation)> {
        match self.mode {
            InteractionMode::PieceSelected { kind, rotation } => Some((kind, rotation)),
            InteractionMode::PairedPending => Some((PieceKind::PairedPortal, Rotation::ZERO)),
            _ => None,
        }
    }

    pub fn is_pickup_mode(&self) -> bool {
        self.mode == InteractionMode::Pickup
    }

    pub fn is_paired_pending(&self) -> bool {
        self.mode == InteractionMode::PairedPending
    }

    /// Select an inventory entry. Rotation always restarts at 0, even when
    /// re-selecting the same piece.
    pub fn select_piece(
        &mut self,
        kind: PieceKind,
        store: &SnapshotStore,
    ) -> Result<(), SelectionError> {
        if self.is_paired_pending() {
            return Err(SelectionError::PairedPlacementPending);
        }
        let (Some(snapshot), Some(me)) = (store.current(), store.me()) else {
            return Err(SelectionError::NoSnapshot);
        };
        if snapshot.inventory_count(me, kind) == 0 {
            return Err(SelectionError::OutOfStock(kind));
        }
        let cost = snapshot.cost(kind);
        let available = snapshot.energy(me);
        if cost > available {
            return Err(SelectionError::CannotAfford {
                kind,
                cost,
                available,
            });
        }

        debug!("selected {:?}", kind);
        self.mode = InteractionMode::PieceSelected {
            kind,
            rotation: Rotation::ZERO,
        };
        Ok(())
    }

    /// Drop the current selection. Returns whether anything changed.
    pub fn deselect(&mut self) -> bool {
        match self.mode {
            InteractionMode::PieceSelected { .. } | InteractionMode::Pickup => {
                self.mode = InteractionMode::Idle;
                true
            }
            _ => false,
        }
    }

    /// Rotate the selected piece by `delta` degrees. Only rotation-sensitive
    /// pieces react; returns whether the state changed.
    pub fn rotate(&mut self, delta: i32) -> bool {
        match self.mode {
            InteractionMode::PieceSelected { kind, rotation } if kind.is_rotation_sensitive() => {
                let rotated = rotation.rotated(delta);
                self.mode = InteractionMode::PieceSelected {
                    kind,
                    rotation: rotated,
                };
                rotated != rotation
            }
            _ => false,
        }
    }

    /// Enter or leave pickup mode. Entering clears any selection. Returns
    /// the new pickup flag.
    pub fn toggle_pickup(&mut self) -> Result<bool, SelectionError> {
        match self.mode {
            InteractionMode::PairedPending => Err(SelectionError::PairedPlacementPending),
            InteractionMode::Pickup => {
                self.mode = InteractionMode::Idle;
                Ok(false)
            }
            _ => {
                self.mode = InteractionMode::Pickup;
                Ok(true)
            }
        }
    }

    /// Abandon an in-progress paired placement. The authority confirms by
    /// omitting the marker from its next snapshot; if it does not, the next
    /// `on_snapshot` puts us back into PairedPending.
    pub fn cancel_paired_placement(&mut self) -> Option<GameCommand> {
        if !self.is_paired_pending() {
            return None;
        }
        info!("cancelling paired placement");
        self.mode = InteractionMode::Idle;
        Some(GameCommand::CancelPairedPlacement)
    }

    pub fn pass_turn(&self, store: &SnapshotStore) -> Option<GameCommand> {
        store.is_my_turn().then_some(GameCommand::PassTurn)
    }

    /// Mirror the authority's paired-placement marker. Returns whether the
    /// mode changed.
    pub fn on_snapshot(&mut self, store: &SnapshotStore) -> bool {
        let mine = store.has_my_pending_portal();
        match (self.mode, mine) {
            (InteractionMode::PairedPending, true) => false,
            (InteractionMode::PairedPending, false) => {
                info!("paired placement resolved by authority");
                self.mode = InteractionMode::Idle;
                true
            }
            (_, true) => {
                info!("authority reports first portal placed, awaiting second");
                self.mode = InteractionMode::PairedPending;
                true
            }
            (_, false) => false,
        }
    }

    /// Handle a click on board cell `(x, y)`.
    ///
    /// Returns the command to send, `Ok(None)` for a silent no-op (not our
    /// turn, off the board, occupied cell, nothing selected), or a local
    /// validation error. Placement and pickup clear the selection before the
    /// authority answers.
    pub fn handle_cell_click(
        &mut self,
        x: i32,
        y: i32,
        store: &SnapshotStore,
    ) -> Result<Option<GameCommand>, PlacementError> {
        let Some(snapshot) = store.current() else {
            return Ok(None);
        };
        if !store.is_my_turn() {
            debug!("ignoring click at ({x}, {y}): not our turn");
            return Ok(None);
        }
        let Some(cell) = snapshot.cell(x, y) else {
            return Ok(None);
        };
        let (cx, cy) = cell;

        match self.mode {
            InteractionMode::Idle => Ok(None),
            InteractionMode::Pickup => {
                self.mode = InteractionMode::Idle;
                Ok(Some(GameCommand::PickupPiece { x: cx, y: cy }))
            }
            InteractionMode::PairedPending => {
                if snapshot.is_occupied(cell) {
                    return Ok(None);
                }
                validate_placement(snapshot, PieceKind::PairedPortal, cell)?;
                Ok(Some(GameCommand::PlacePiece {
                    x: cx,
                    y: cy,
                    kind: PieceKind::PairedPortal,
                    rotation: Rotation::ZERO,
                }))
            }
            InteractionMode::PieceSelected { kind, rotation } => {
                if snapshot.is_occupied(cell) {
                    return Ok(None);
                }
                validate_placement(snapshot, kind, cell)?;
                self.mode = InteractionMode::Idle;
                Ok(Some(GameCommand::PlacePiece {
                    x: cx,
                    y: cy,
                    kind,
                    rotation,
                }))
            }
        }
    }

    /// Drop all intent; used on the terminal transition.
    pub fn reset(&mut self) {
        self.mode = InteractionMode::Idle;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
