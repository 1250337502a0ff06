// Speculative placement previews.
//
// Hovering a legal cell with a piece selected asks the authority what the
// territory would look like after that placement. Requests carry a
// monotonically increasing `request_id`; only the response to the latest
// issued request is ever displayed. Responses that echo no id are matched to
// the oldest outstanding request, which preserves arrival-order semantics for
// authorities that do not echo. Outstanding requests only live as long as the
// connection they were sent on.

use std::collections::VecDeque;

use tracing::debug;

use crate::interaction::{validate_placement, InteractionState};
use crate::snapshot::{Cell, PieceKind, Rotation, SnapshotStore, TerritoryGrid};
use crate::wire::{GameCommand, PreviewResponse};

/// Unanswered requests tracked by id. Older ones are only counted.
const MAX_OUTSTANDING: usize = 64;

/// The hypothetical placement a preview was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewTarget {
    pub cell: Cell,
    pub kind: PieceKind,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub target: PreviewTarget,
    pub territory: TerritoryGrid,
}

#[derive(Debug, Default)]
pub struct PreviewCoordinator {
    last_issued: u64,
    /// Id whose response may be displayed; `None` after a clear.
    latest: Option<u64>,
    pending_target: Option<PreviewTarget>,
    outstanding: VecDeque<u64>,
    /// Requests dropped from the front of `outstanding` whose responses
    /// are still due. Always older than anything still queued.
    overflowed: usize,
    shown: Option<Preview>,
}

impl PreviewCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The preview currently on screen, if any.
    pub fn current(&self) -> Option<&Preview> {
        self.shown.as_ref()
    }

    pub fn latest_request_id(&self) -> Option<u64> {
        self.latest
    }

    /// Pointer moved over board coordinates `(x, y)`. Returns a preview
    /// request to send, or `None` when nothing needs asking (the preview is
    /// cleared whenever the target is not previewable).
    pub fn on_hover(
        &mut self,
        x: i32,
        y: i32,
        interaction: &InteractionState,
        store: &SnapshotStore,
    ) -> Option<GameCommand> {
        let Some((kind, rotation)) = interaction.placement() else {
            self.clear();
            return None;
        };
        if interaction.is_pickup_mode() || !store.is_my_turn() {
            self.clear();
            return None;
        }
        let Some(snapshot) = store.current() else {
            self.clear();
            return None;
        };
        let Some(cell) = snapshot
            .cell(x, y)
            .filter(|cell| !snapshot.is_occupied(*cell))
            .filter(|cell| validate_placement(snapshot, kind, *cell).is_ok())
        else {
            self.clear();
            return None;
        };

        let target = PreviewTarget { cell, kind, rotation };
        if self.latest.is_some() && self.pending_target == Some(target) {
            return None;
        }

        self.last_issued += 1;
        let request_id = self.last_issued;
        self.latest = Some(request_id);
        self.pending_target = Some(target);
        self.shown = None;
        self.outstanding.push_back(request_id);
        if self.outstanding.len() > MAX_OUTSTANDING {
            self.outstanding.pop_front();
            self.overflowed += 1;
        }

        Some(GameCommand::RequestPreview {
            x: cell.0,
            y: cell.1,
            kind,
            rotation,
            request_id,
        })
    }

    /// Apply an authority response. Returns whether it was displayed.
    pub fn on_response(&mut self, response: PreviewResponse) -> bool {
        let id = match response.request_id {
            Some(id) => {
                self.outstanding.retain(|pending| *pending != id);
                Some(id)
            }
            None if self.overflowed > 0 => {
                self.overflowed -= 1;
                None
            }
            None => self.outstanding.pop_front(),
        };

        match (id, self.latest, self.pending_target) {
            (Some(id), Some(latest), Some(target)) if id == latest => {
                self.shown = Some(Preview {
                    target,
                    territory: response.territory,
                });
                true
            }
            _ => {
                debug!(
                    "discarding stale preview response {:?} (latest {:?})",
                    id, self.latest
                );
                false
            }
        }
    }

    /// Drop the displayed preview and invalidate any in-flight request.
    pub fn clear(&mut self) {
        self.latest = None;
        self.pending_target = None;
        self.shown = None;
    }

    pub fn on_pointer_leave(&mut self) {
        self.clear();
    }

    /// A new authoritative snapshot makes every preview computed against the
    /// old board meaningless.
    pub fn on_snapshot(&mut self) {
        self.clear();
    }

    /// Forget outstanding requests; their responses died with the connection.
    pub fn on_disconnect(&mut self) {
        self.reset();
    }

    /// A fresh connection starts with nothing in flight.
    pub fn on_connect(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.clear();
        self.outstanding.clear();
        self.overflowed = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures::{piece, snapshot};
    use crate::snapshot::{GameSnapshot, PendingPortal};

    fn store_with(s: GameSnapshot) -> SnapshotStore {
        let mut store = SnapshotStore::new("p0");
        store.apply(s);
        store
    }

    fn selected(kind: PieceKind, store: &SnapshotStore) -> InteractionState {
        let mut st = InteractionState::new();
        st.select_piece(kind, store).unwrap();
        st
    }

    fn territory(owner: usize) -> TerritoryGrid {
        TerritoryGrid(vec![vec![vec![owner]]])
    }

    fn response(id: Option<u64>, owner: usize) -> PreviewResponse {
        PreviewResponse {
            territory: territory(owner),
            request_id: id,
        }
    }

    #[test]
    fn hover_issues_request_with_incrementing_ids() {
        let store = store_with(snapshot(8));
        let st = selected(PieceKind::Reflector, &store);
        let mut preview = PreviewCoordinator::new();

        let first = preview.on_hover(2, 3, &st, &store);
        assert_eq!(
            first,
            Some(GameCommand::RequestPreview {
                x: 2,
                y: 3,
                kind: PieceKind::Reflector,
                rotation: Rotation::ZERO,
                request_id: 1,
            })
        );
        let second = preview.on_hover(4, 5, &st, &store);
        assert!(matches!(
            second,
            Some(GameCommand::RequestPreview { request_id: 2, .. })
        ));
    }

    #[test]
    fn same_target_is_not_requested_twice() {
        let store = store_with(snapshot(8));
        let mut st = selected(PieceKind::Reflector, &store);
        let mut preview = PreviewCoordinator::new();

        assert!(preview.on_hover(2, 3, &st, &store).is_some());
        assert!(preview.on_hover(2, 3, &st, &store).is_none());

        st.rotate(90);
        assert!(preview.on_hover(2, 3, &st, &store).is_some());
    }

    #[test]
    fn out_of_order_responses_keep_newest_preview() {
        let store = store_with(snapshot(8));
        let st = selected(PieceKind::Reflector, &store);
        let mut preview = PreviewCoordinator::new();
        preview.on_hover(2, 3, &st, &store);
        preview.on_hover(4, 5, &st, &store);

        assert!(preview.on_response(response(Some(2), 1)));
        assert!(!preview.on_response(response(Some(1), 0)));

        let shown = preview.current().unwrap();
        assert_eq!(shown.target.cell, (4, 5));
        assert_eq!(shown.territory, territory(1));
    }

    #[test]
    fn unechoed_responses_follow_arrival_order() {
        let store = store_with(snapshot(8));
        let st = selected(PieceKind::Splitter, &store);
        let mut preview = PreviewCoordinator::new();
        preview.on_hover(2, 3, &st, &store);
        preview.on_hover(4, 5, &st, &store);

        // First arrival answers request #1, which is stale.
        assert!(!preview.on_response(response(None, 0)));
        assert!(preview.current().is_none());
        assert!(preview.on_response(response(None, 1)));
        assert_eq!(preview.current().unwrap().target.cell, (4, 5));
    }

    #[test]
    fn hover_clears_when_not_previewable() {
        let mut s = snapshot(8);
        s.board[1][1] = Some(piece(PieceKind::Blocker, 1));
        s.blocker_exclusion_cells.insert((6, 6));
        let store = store_with(s);
        let mut preview = PreviewCoordinator::new();

        let idle = InteractionState::new();
        assert!(preview.on_hover(2, 2, &idle, &store).is_none());

        let st = selected(PieceKind::Blocker, &store);
        for (x, y) in [(1, 1), (6, 6), (-1, 2), (8, 8)] {
            preview.on_hover(2, 2, &st, &store);
            preview.on_response(response(None, 0));
            assert!(preview.current().is_some());

            assert!(preview.on_hover(x, y, &st, &store).is_none());
            assert!(preview.current().is_none(), "({x}, {y}) left a preview");
        }

        let portal = selected(PieceKind::PairedPortal, &store);
        assert!(preview.on_hover(3, 3, &portal, &store).is_none());
        assert!(preview.on_hover(0, 3, &portal, &store).is_some());
    }

    #[test]
    fn no_preview_outside_my_turn_or_in_pickup() {
        let mut s = snapshot(8);
        let store = store_with(s.clone());
        let mut st = selected(PieceKind::Reflector, &store);
        let mut preview = PreviewCoordinator::new();

        s.current_player = 1;
        let other_turn = store_with(s);
        assert!(preview.on_hover(2, 2, &st, &other_turn).is_none());

        st.toggle_pickup().unwrap();
        assert!(preview.on_hover(2, 2, &st, &store).is_none());
    }

    #[test]
    fn clearing_discards_in_flight_response() {
        let store = store_with(snapshot(8));
        let st = selected(PieceKind::Reflector, &store);
        let mut preview = PreviewCoordinator::new();

        preview.on_hover(2, 3, &st, &store);
        preview.on_pointer_leave();
        assert!(!preview.on_response(response(Some(1), 0)));
        assert!(preview.current().is_none());

        preview.on_hover(2, 3, &st, &store);
        preview.on_response(response(Some(2), 0));
        assert!(preview.current().is_some());
        preview.on_snapshot();
        assert!(preview.current().is_none());

        // Same cell again after a snapshot is a fresh request.
        assert!(preview.on_hover(2, 3, &st, &store).is_some());
    }

    #[test]
    fn disconnect_forgets_outstanding_requests() {
        let store = store_with(snapshot(8));
        let st = selected(PieceKind::Reflector, &store);
        let mut preview = PreviewCoordinator::new();
        preview.on_hover(2, 3, &st, &store);
        preview.on_disconnect();

        preview.on_hover(4, 4, &st, &store);
        // Unechoed response now pairs with request #2, not the lost #1.
        assert!(preview.on_response(response(None, 0)));
    }

    #[test]
    fn overflowed_requests_still_consume_their_responses() {
        let store = store_with(snapshot(8));
        let st = selected(PieceKind::Reflector, &store);
        let mut preview = PreviewCoordinator::new();

        let issued = MAX_OUTSTANDING as u64 + 1;
        for n in 0..issued {
            let cell = if n % 2 == 0 { (2, 3) } else { (4, 5) };
            assert!(preview.on_hover(cell.0, cell.1, &st, &store).is_some());
        }
        assert_eq!(preview.latest_request_id(), Some(issued));

        // Answers to every older request arrive first and are all stale.
        for _ in 1..issued {
            assert!(!preview.on_response(response(None, 1)));
            assert!(preview.current().is_none());
        }
        assert!(preview.on_response(response(None, 0)));
        assert_eq!(preview.current().unwrap().territory, territory(0));
        assert_eq!(preview.current().unwrap().target.cell, (2, 3));
    }

    #[test]
    fn connect_starts_with_nothing_in_flight() {
        let store = store_with(snapshot(8));
        let st = selected(PieceKind::Reflector, &store);
        let mut preview = PreviewCoordinator::new();
        preview.on_hover(2, 3, &st, &store);
        preview.on_connect();

        preview.on_hover(2, 3, &st, &store);
        assert!(preview.on_response(response(None, 0)));
    }

    #[test]
    fn second_portal_is_previewed_unrotated() {
        let mut s = snapshot(8);
        s.pending_portal = Some(PendingPortal { player: 0, x: 0, y: 2 });
        let store = store_with(s);
        let mut st = InteractionState::new();
        st.on_snapshot(&store);
        assert!(st.is_paired_pending());
        let mut preview = PreviewCoordinator::new();

        assert!(preview.on_hover(3, 3, &st, &store).is_none());
        assert_eq!(
            preview.on_hover(7, 4, &st, &store),
            Some(GameCommand::RequestPreview {
                x: 7,
                y: 4,
                kind: PieceKind::PairedPortal,
                rotation: Rotation::ZERO,
                request_id: 1,
            })
        );
    }
}
