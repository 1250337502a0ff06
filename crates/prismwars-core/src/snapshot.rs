// Authoritative game snapshot model and the store that holds the latest one.
//
// Snapshots arrive wholesale from the authority and are never patched in
// place: `SnapshotStore::apply` swaps the whole value and reports what changed
// relative to the superseded snapshot so downstream consumers (particles,
// preview, timer) know what to regenerate.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A board coordinate as `(x, y)`.
pub type Cell = (usize, usize);

// ---------------------------------------------------------------------------
// Pieces
// ---------------------------------------------------------------------------

/// The fixed enumeration of optical pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    Reflector,
    Splitter,
    AreaEmitter,
    Blocker,
    PairedPortal,
}

impl PieceKind {
    /// Inventory order, also used for the `1`..`5` selection keys.
    pub const ALL: [PieceKind; 5] = [
        PieceKind::Reflector,
        PieceKind::Splitter,
        PieceKind::AreaEmitter,
        PieceKind::Blocker,
        PieceKind::PairedPortal,
    ];

    /// Only these pieces redirect light differently depending on rotation.
    pub fn is_rotation_sensitive(self) -> bool {
        matches!(self, PieceKind::Reflector | PieceKind::Splitter)
    }

    /// Portals have to sit on the outermost ring of the board.
    pub fn requires_border(self) -> bool {
        self == PieceKind::PairedPortal
    }

    pub fn label(self) -> &'static str {
        match self {
            PieceKind::Reflector => "Reflector",
            PieceKind::Splitter => "Splitter",
            PieceKind::AreaEmitter => "Area Emitter",
            PieceKind::Blocker => "Blocker",
            PieceKind::PairedPortal => "Portal Pair",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PieceKind::Reflector => "Reflects light beams at 90°. Rotate to change the reflection direction.",
            PieceKind::Splitter => "Splits light into three beams: straight, left and right.",
            PieceKind::AreaEmitter => "Lights up the cells around it for its owner.",
            PieceKind::Blocker => "Stops light completely. Cannot be placed next to a light source.",
            PieceKind::PairedPortal => "Two linked portals on the border. Place both before your turn ends.",
        }
    }
}

/// Piece rotation in degrees, always one of 0/90/180/270.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation(u16);

impl Rotation {
    pub const ZERO: Rotation = Rotation(0);

    /// Normalise an arbitrary angle onto the nearest quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        let quarter = ((degrees as f64) / 90.0).round() as i32;
        Rotation((quarter.rem_euclid(4) * 90) as u16)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Rotate by `delta` degrees (positive is clockwise).
    pub fn rotated(self, delta: i32) -> Self {
        Rotation::from_degrees(self.0 as i32 + delta)
    }
}

/// A piece placed on the board. Only ever created by the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    /// Owning player index.
    pub player: usize,
    #[serde(default)]
    pub rotation: Rotation,
    /// Display color, derived from the owner.
    pub color: String,
}

// ---------------------------------------------------------------------------
// Players, scores, light
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub username: String,
    pub color: String,
}

/// Lifecycle of a game as reported by the authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBreakdown {
    pub territory: u32,
    pub combo: u32,
    pub objective: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Player display name.
    pub player: String,
    pub color: String,
    pub score: u32,
    #[serde(default)]
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A light source on the board margin. Coordinates of -1 or `board_size`
/// place it just outside the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSource {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub player: usize,
    pub color: String,
}

/// One straight run of a traced beam, in cell coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub player: usize,
    pub color: String,
}

/// Marker for a paired placement whose first portal is already down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPortal {
    pub player: usize,
    pub x: usize,
    pub y: usize,
}

// ---------------------------------------------------------------------------
// Territory
// ---------------------------------------------------------------------------

/// Who controls a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellControl {
    Neutral,
    Owned(usize),
    Contested,
}

/// Grid of controlling player indices per cell, indexed `[y][x]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerritoryGrid(pub Vec<Vec<Vec<usize>>>);

impl TerritoryGrid {
    pub fn control(&self, x: usize, y: usize) -> CellControl {
        match self.0.get(y).and_then(|row| row.get(x)).map(Vec::as_slice) {
            None | Some([]) => CellControl::Neutral,
            Some([owner]) => CellControl::Owned(*owner),
            Some(_) => CellControl::Contested,
        }
    }

    /// Number of cells controlled by exactly `player`.
    pub fn owned_by(&self, player: usize) -> usize {
        self.0
            .iter()
            .flatten()
            .filter(|cell| cell.as_slice() == [player])
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// GameSnapshot
// ---------------------------------------------------------------------------

/// Why a cell refuses a piece before the authority is even asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Protected,
    NearLightSource,
}

/// The complete authoritative game state. Read-only once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(default)]
    pub game_id: String,
    #[serde(rename = "state", default)]
    pub phase: GamePhase,
    pub players: Vec<PlayerInfo>,
    pub current_player: usize,
    /// Indexed `[y][x]`.
    pub board: Vec<Vec<Option<Piece>>>,
    pub board_size: usize,
    pub round_number: u32,
    pub max_rounds: u32,
    #[serde(default)]
    pub win_points: u32,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
    #[serde(default)]
    pub player_inventory: Vec<BTreeMap<PieceKind, u32>>,
    #[serde(default)]
    pub player_energy: Vec<u32>,
    #[serde(default)]
    pub piece_costs: BTreeMap<PieceKind, u32>,
    #[serde(default)]
    pub light_sources: Vec<LightSource>,
    #[serde(default)]
    pub light_paths: Vec<BeamSegment>,
    #[serde(default)]
    pub territory: TerritoryGrid,
    #[serde(default)]
    pub protected_cells: BTreeSet<Cell>,
    #[serde(default)]
    pub blocker_exclusion_cells: BTreeSet<Cell>,
    #[serde(default)]
    pub amplifier_cells: BTreeSet<Cell>,
    #[serde(default)]
    pub disconnected_players: BTreeSet<usize>,
    #[serde(default)]
    pub missed_turns: Vec<u32>,
    #[serde(default)]
    pub pending_portal: Option<PendingPortal>,
    #[serde(default)]
    pub time_remaining: Option<u32>,
}

impl GameSnapshot {
    /// Convert possibly out-of-range coordinates into a board cell.
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        let size = self.board_size as i32;
        if (0..size).contains(&x) && (0..size).contains(&y) {
            Some((x as usize, y as usize))
        } else {
            None
        }
    }

    pub fn piece_at(&self, (x, y): Cell) -> Option<&Piece> {
        self.board.get(y).and_then(|row| row.get(x)).and_then(Option::as_ref)
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.piece_at(cell).is_some()
    }

    /// True for cells on the outermost ring of the board.
    pub fn is_border(&self, (x, y): Cell) -> bool {
        let last = self.board_size.saturating_sub(1);
        x == 0 || y == 0 || x == last || y == last
    }

    /// Zone rule that forbids `kind` on `cell`, if any. Blockers are kept
    /// away from light sources in addition to the protected cells everyone
    /// must avoid.
    pub fn exclusion(&self, kind: PieceKind, cell: Cell) -> Option<Exclusion> {
        if self.protected_cells.contains(&cell) {
            return Some(Exclusion::Protected);
        }
        if kind == PieceKind::Blocker && self.blocker_exclusion_cells.contains(&cell) {
            return Some(Exclusion::NearLightSource);
        }
        None
    }

    pub fn inventory_count(&self, player: usize, kind: PieceKind) -> u32 {
        self.player_inventory
            .get(player)
            .and_then(|inv| inv.get(&kind))
            .copied()
            .unwrap_or(0)
    }

    /// Remaining energy; snapshots without an energy economy report
    /// `u32::MAX` so every piece is affordable.
    pub fn energy(&self, player: usize) -> u32 {
        if self.player_energy.is_empty() {
            return u32::MAX;
        }
        self.player_energy.get(player).copied().unwrap_or(0)
    }

    pub fn cost(&self, kind: PieceKind) -> u32 {
        self.piece_costs.get(&kind).copied().unwrap_or(0)
    }

    pub fn current_player_info(&self) -> Option<&PlayerInfo> {
        self.players.get(self.current_player)
    }

    pub fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == GamePhase::Finished
    }
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// What changed when a new snapshot superseded the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotDelta {
    /// The beam-segment list differs from the superseded snapshot.
    pub beams_changed: bool,
    pub board_size_changed: bool,
    /// The game has reached its finished state.
    pub terminal: bool,
}

/// Holds the latest authoritative snapshot and the derived "which index is
/// me" view. Written only by the application loop on snapshot arrival.
#[derive(Debug)]
pub struct SnapshotStore {
    player_id: String,
    current: Option<Arc<GameSnapshot>>,
    me: Option<usize>,
}

impl SnapshotStore {
    pub fn new(player_id: impl Into<String>) -> Self {
        SnapshotStore {
            player_id: player_id.into(),
            current: None,
            me: None,
        }
    }

    /// Replace the held snapshot wholesale. The previous value is dropped.
    pub fn apply(&mut self, snapshot: GameSnapshot) -> SnapshotDelta {
        let (beams_changed, board_size_changed) = match &self.current {
            Some(prev) => (
                prev.light_paths != snapshot.light_paths,
                prev.board_size != snapshot.board_size,
            ),
            None => (true, true),
        };

        let me = snapshot.player_index(&self.player_id);
        if me.is_none() {
            debug!("player {} not present in snapshot", self.player_id);
        }
        let terminal = snapshot.is_terminal();
        if terminal {
            info!("snapshot reports finished game {}", snapshot.game_id);
        }

        self.me = me;
        self.current = Some(Arc::new(snapshot));

        SnapshotDelta {
            beams_changed,
            board_size_changed,
            terminal,
        }
    }

    pub fn current(&self) -> Option<&Arc<GameSnapshot>> {
        self.current.as_ref()
    }

    /// This client's player index in the current snapshot.
    pub fn me(&self) -> Option<usize> {
        self.me
    }

    pub fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.phase == GamePhase::Playing)
    }

    pub fn is_my_turn(&self) -> bool {
        match (&self.current, self.me) {
            (Some(s), Some(me)) => s.phase == GamePhase::Playing && s.current_player == me,
            _ => false,
        }
    }

    /// True when the authority reports a paired placement owned by us.
    pub fn has_my_pending_portal(&self) -> bool {
        match (&self.current, self.me) {
            (Some(s), Some(me)) => s.pending_portal.is_some_and(|p| p.player == me),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn rotation_normalises_to_quarter_turns() {
        assert_eq!(Rotation::from_degrees(0).degrees(), 0);
        assert_eq!(Rotation::from_degrees(450).degrees(), 90);
        assert_eq!(Rotation::from_degrees(-90).degrees(), 270);
        assert_eq!(Rotation::ZERO.rotated(-90).rotated(-90).degrees(), 180);
        assert_eq!(Rotation::from_degrees(270).rotated(90).degrees(), 0);
    }

    #[test]
    fn territory_control_classifies_cells() {
        let grid = TerritoryGrid(vec![vec![vec![], vec![1], vec![0, 1]]]);
        assert_eq!(grid.control(0, 0), CellControl::Neutral);
        assert_eq!(grid.control(1, 0), CellControl::Owned(1));
        assert_eq!(grid.control(2, 0), CellControl::Contested);
        assert_eq!(grid.control(5, 5), CellControl::Neutral);
        assert_eq!(grid.owned_by(1), 1);
        assert_eq!(grid.owned_by(0), 0);
    }

    #[test]
    fn border_and_bounds() {
        let s = snapshot(8);
        assert_eq!(s.cell(-1, 0), None);
        assert_eq!(s.cell(8, 3), None);
        assert_eq!(s.cell(3, 4), Some((3, 4)));
        assert!(s.is_border((0, 4)));
        assert!(s.is_border((7, 7)));
        assert!(!s.is_border((3, 3)));
    }

    #[test]
    fn blockers_use_the_wider_exclusion_set() {
        let mut s = snapshot(8);
        s.protected_cells.insert((2, 2));
        s.blocker_exclusion_cells.insert((0, 1));
        assert_eq!(s.exclusion(PieceKind::Reflector, (2, 2)), Some(Exclusion::Protected));
        assert_eq!(s.exclusion(PieceKind::Blocker, (2, 2)), Some(Exclusion::Protected));
        assert_eq!(s.exclusion(PieceKind::Reflector, (0, 1)), None);
        assert_eq!(
            s.exclusion(PieceKind::Blocker, (0, 1)),
            Some(Exclusion::NearLightSource)
        );
    }

    #[test]
    fn energy_without_economy_is_unbounded() {
        let mut s = snapshot(8);
        s.player_energy.clear();
        assert_eq!(s.energy(0), u32::MAX);
    }

    #[test]
    fn store_derives_my_index_and_turn() {
        let mut store = SnapshotStore::new("p1");
        assert!(!store.is_my_turn());

        let mut s = snapshot(8);
        s.current_player = 1;
        store.apply(s);
        assert_eq!(store.me(), Some(1));
        assert!(store.is_my_turn());
        assert!(store.is_active());
    }

    #[test]
    fn store_replaces_snapshot_wholesale() {
        let mut store = SnapshotStore::new("p0");
        let mut first = snapshot(8);
        first.board[1][1] = Some(piece(PieceKind::Blocker, 0));
        first.territory = TerritoryGrid(vec![vec![vec![0]; 8]; 8]);
        store.apply(first);

        let second = snapshot(8);
        store.apply(second.clone());

        let current = store.current().unwrap();
        assert_eq!(**current, second);
        assert!(current.piece_at((1, 1)).is_none());
        assert!(current.territory.is_empty());
    }

    #[test]
    fn store_reports_beam_changes() {
        let mut store = SnapshotStore::new("p0");
        let mut s = snapshot(8);
        s.light_paths = vec![beam(-1, 2, 7, 2)];

        let delta = store.apply(s.clone());
        assert!(delta.beams_changed);
        assert!(delta.board_size_changed);

        let delta = store.apply(s.clone());
        assert!(!delta.beams_changed);
        assert!(!delta.board_size_changed);

        s.light_paths.push(beam(2, -1, 2, 7));
        assert!(store.apply(s).beams_changed);
    }

    #[test]
    fn finished_snapshot_is_terminal() {
        let mut store = SnapshotStore::new("p0");
        let mut s = snapshot(8);
        s.phase = GamePhase::Finished;
        assert!(store.apply(s).terminal);
        assert!(!store.is_active());
        assert!(!store.is_my_turn());
    }

    #[test]
    fn pending_portal_ownership() {
        let mut store = SnapshotStore::new("p0");
        let mut s = snapshot(8);
        s.pending_portal = Some(PendingPortal { player: 1, x: 0, y: 3 });
        store.apply(s.clone());
        assert!(!store.has_my_pending_portal());

        s.pending_portal = Some(PendingPortal { player: 0, x: 0, y: 3 });
        store.apply(s);
        assert!(store.has_my_pending_portal());
    }

    #[test]
    fn deserializes_minimal_authority_payload() {
        let json = r##"{
            "game_id": "ABC123",
            "state": "playing",
            "players": [{"id": "p0", "username": "Alice", "color": "#FF6B6B", "ready": true}],
            "current_player": 0,
            "board": [[null, {"type": "reflector", "player": 0, "rotation": 90, "color": "#FF6B6B"}],
                      [null, null]],
            "board_size": 2,
            "round_number": 3,
            "max_rounds": 20,
            "player_inventory": [{"reflector": 14, "splitter": 8, "blocker": 10}],
            "territory": [[[0], []], [[0, 1], []]],
            "protected_cells": [[1, 1]],
            "time_remaining": 42
        }"##;
        let s: GameSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(s.phase, GamePhase::Playing);
        let piece = s.piece_at((1, 0)).unwrap();
        assert_eq!(piece.kind, PieceKind::Reflector);
        assert_eq!(piece.rotation.degrees(), 90);
        assert_eq!(s.inventory_count(0, PieceKind::Reflector), 14);
        assert_eq!(s.inventory_count(0, PieceKind::PairedPortal), 0);
        assert_eq!(s.territory.control(0, 1), CellControl::Contested);
        assert!(s.protected_cells.contains(&(1, 1)));
        assert_eq!(s.time_remaining, Some(42));
        assert!(s.pending_portal.is_none());
    }
}
