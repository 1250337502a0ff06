// Application state and orchestration logic.
//
// The central event loop that coordinates transport events from the game
// server, user commands from the TUI, and the client's own timers (heartbeat,
// reconnect delay, countdown). It owns the single `AppState` container; each
// core component only ever sees the slice it needs and answers with commands
// or actions that this loop carries out. UI changes are pushed to the TUI as
// `UiUpdate` messages.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use prismwars_core::connection::{ConnectionAction, ConnectionManager, ConnectionStatus};
use prismwars_core::interaction::InteractionState;
use prismwars_core::preview::PreviewCoordinator;
use prismwars_core::session::SessionStore;
use prismwars_core::snapshot::{GameSnapshot, SnapshotStore};
use prismwars_core::timer::CountdownTimer;
use prismwars_core::transport::{TransportEvent, TransportRequest};
use prismwars_core::wire::{GameCommand, ServerMessage, SessionIds};

use crate::config::Config;
use crate::protocol::{UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete client state.
pub struct AppState {
    pub config: Config,
    pub ids: SessionIds,
    pub display_name: String,
    pub sessions: SessionStore,
    pub connection: ConnectionManager,
    pub snapshots: SnapshotStore,
    pub interaction: InteractionState,
    pub preview: PreviewCoordinator,
    pub timer: CountdownTimer,
    /// Board cell last reported under the pointer or cursor.
    pub hover: Option<(i32, i32)>,
    /// Set once the game is over. Nothing but quitting happens afterwards.
    pub terminal: bool,
}

impl AppState {
    pub fn new(
        config: Config,
        ids: SessionIds,
        display_name: String,
        sessions: SessionStore,
    ) -> Self {
        let connection =
            ConnectionManager::new(config.heartbeat_period(), config.reconnect_delay());
        let snapshots = SnapshotStore::new(ids.player_id.clone());

        AppState {
            config,
            ids,
            display_name,
            sessions,
            connection,
            snapshots,
            interaction: InteractionState::new(),
            preview: PreviewCoordinator::new(),
            timer: CountdownTimer::new(),
            hover: None,
            terminal: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// Recurring or pending work owned by the loop. `None` means stopped.
#[derive(Default)]
struct Timers {
    heartbeat: Option<Interval>,
    countdown: Option<Interval>,
    reconnect_at: Option<Instant>,
}

impl Timers {
    fn is_idle(&self) -> bool {
        self.heartbeat.is_none() && self.countdown.is_none() && self.reconnect_at.is_none()
    }
}

/// An interval whose first tick is one full period away.
fn delayed_interval(period: Duration, missed: MissedTickBehavior) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(missed);
    interval
}

/// Tick a running interval; pend forever when stopped.
async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the application event loop until the user quits.
pub async fn run(
    mut transport_rx: mpsc::Receiver<TransportEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    req_tx: mpsc::Sender<TransportRequest>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!(
        "Application event loop started for game {} as {}",
        state.ids.game_id, state.ids.player_id
    );

    let mut timers = Timers {
        countdown: Some(delayed_interval(
            state.config.countdown_tick(),
            MissedTickBehavior::Burst,
        )),
        ..Timers::default()
    };

    // When the transport task goes away we stop polling its channel so the
    // game-over screen stays up instead of the loop spinning.
    let mut transport_open = true;

    loop {
        tokio::select! {
            // --- Transport events ---
            event = transport_rx.recv(), if transport_open => {
                match event {
                    Some(event) => {
                        handle_transport_event(&mut state, &mut timers, event, &ui_tx, &req_tx).await;
                    }
                    None => {
                        info!("Transport channel closed");
                        transport_open = false;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx, &req_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Heartbeat ---
            _ = next_tick(&mut timers.heartbeat) => {
                if let Some(cmd) = state.connection.heartbeat() {
                    send_command(&state, cmd, &req_tx).await;
                }
            }

            // --- Countdown ---
            _ = next_tick(&mut timers.countdown) => {
                let remaining = state.timer.tick(state.snapshots.is_active());
                let _ = ui_tx.send(UiUpdate::Timer(remaining)).await;
            }

            // --- Reconnect delay ---
            _ = sleep_until_opt(timers.reconnect_at) => {
                timers.reconnect_at = None;
                if state.connection.on_reconnect_due() {
                    info!("Reconnect delay elapsed, asking transport to reconnect");
                    let _ = req_tx.send(TransportRequest::Reconnect).await;
                }
            }
        }
    }

    let _ = req_tx.send(TransportRequest::Shutdown).await;
    info!("Application event loop exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Transport events
// ---------------------------------------------------------------------------

async fn handle_transport_event(
    state: &mut AppState,
    timers: &mut Timers,
    event: TransportEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
    req_tx: &mpsc::Sender<TransportRequest>,
) {
    if let TransportEvent::Message(text) = event {
        handle_server_message(state, timers, &text, ui_tx, req_tx).await;
        return;
    }
    if state.terminal {
        debug!("Ignoring {:?} after game over", event);
        return;
    }

    match event {
        TransportEvent::Connected => state.preview.on_connect(),
        TransportEvent::Disconnected => {
            state.preview.on_disconnect();
            let _ = ui_tx.send(UiUpdate::Preview(None)).await;
        }
        _ => {}
    }
    let actions = state.connection.on_transport_event(&event);
    apply_connection_actions(state, timers, actions, req_tx).await;
    let _ = ui_tx
        .send(UiUpdate::ConnectionStatus(state.connection.status()))
        .await;
}

async fn apply_connection_actions(
    state: &AppState,
    timers: &mut Timers,
    actions: Vec<ConnectionAction>,
    req_tx: &mpsc::Sender<TransportRequest>,
) {
    for action in actions {
        match action {
            ConnectionAction::Send(cmd) => send_command(state, cmd, req_tx).await,
            ConnectionAction::StartHeartbeat(period) => {
                timers.heartbeat = Some(delayed_interval(period, MissedTickBehavior::Delay));
            }
            ConnectionAction::StopHeartbeat => timers.heartbeat = None,
            ConnectionAction::ScheduleReconnect(delay) => {
                timers.reconnect_at = Some(Instant::now() + delay);
            }
            ConnectionAction::CancelReconnect => timers.reconnect_at = None,
        }
    }
}

/// Handle a text frame from the game server.
async fn handle_server_message(
    state: &mut AppState,
    timers: &mut Timers,
    text: &str,
    ui_tx: &mpsc::Sender<UiUpdate>,
    req_tx: &mpsc::Sender<TransportRequest>,
) {
    let msg = match ServerMessage::parse(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to parse server message: {}", e);
            return;
        }
    };

    match msg {
        ServerMessage::GameStateUpdate(snapshot) => {
            if state.terminal {
                debug!("Ignoring snapshot after game over");
                return;
            }
            apply_snapshot(state, timers, *snapshot, ui_tx, req_tx).await;
        }
        ServerMessage::PreviewResult(response) => {
            if !state.terminal && state.preview.on_response(response) {
                push_preview(state, ui_tx).await;
            }
        }
        ServerMessage::GameOver(payload) => {
            info!(
                "Game over: {} with {} points",
                payload.winner.name, payload.winner.score
            );
            if !state.terminal {
                enter_terminal(state, timers, ui_tx).await;
            }
            let _ = ui_tx
                .send(UiUpdate::GameOver(Some(Box::new(payload))))
                .await;
        }
        ServerMessage::Error { message } => {
            warn!("Server reported error: {}", message);
            notify(ui_tx, message).await;
        }
    }
}

async fn apply_snapshot(
    state: &mut AppState,
    timers: &mut Timers,
    snapshot: GameSnapshot,
    ui_tx: &mpsc::Sender<UiUpdate>,
    req_tx: &mpsc::Sender<TransportRequest>,
) {
    let delta = state.snapshots.apply(snapshot);
    let Some(current) = state.snapshots.current().cloned() else {
        return;
    };
    debug!(
        "Applied snapshot: round {}/{}, current player {}",
        current.round_number, current.max_rounds, current.current_player
    );

    if let Err(e) = state.sessions.touch() {
        warn!("Failed to refresh session record: {}", e);
    }
    state.interaction.on_snapshot(&state.snapshots);
    state.preview.on_snapshot();
    state.timer.sync(current.time_remaining);

    let _ = ui_tx
        .send(UiUpdate::Snapshot {
            snapshot: current,
            me: state.snapshots.me(),
            beams_changed: delta.beams_changed,
        })
        .await;
    let _ = ui_tx
        .send(UiUpdate::Interaction(state.interaction.mode()))
        .await;
    let _ = ui_tx.send(UiUpdate::Timer(state.timer.remaining())).await;

    if delta.terminal {
        enter_terminal(state, timers, ui_tx).await;
        let _ = ui_tx.send(UiUpdate::GameOver(None)).await;
        return;
    }

    // The pointer has not moved, but the board under it has.
    refresh_hover(state, req_tx).await;
    push_preview(state, ui_tx).await;
}

/// Tear down everything recurring. Runs once, on the first terminal signal.
async fn enter_terminal(state: &mut AppState, timers: &mut Timers, ui_tx: &mpsc::Sender<UiUpdate>) {
    info!("Game finished, stopping timers and clearing session");
    state.terminal = true;

    let actions = state.connection.shutdown();
    debug!("Connection shutdown actions: {:?}", actions);
    timers.heartbeat = None;
    timers.countdown = None;
    timers.reconnect_at = None;

    state.interaction.reset();
    state.preview.clear();
    state.hover = None;

    if let Err(e) = state.sessions.clear() {
        warn!("Failed to clear session record: {}", e);
    }

    let _ = ui_tx
        .send(UiUpdate::Interaction(state.interaction.mode()))
        .await;
    let _ = ui_tx.send(UiUpdate::Preview(None)).await;
}

// ---------------------------------------------------------------------------
// User commands
// ---------------------------------------------------------------------------

async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
    req_tx: &mpsc::Sender<TransportRequest>,
) {
    if state.terminal {
        debug!("Ignoring {:?} after game over", cmd);
        return;
    }

    match cmd {
        UserCommand::SelectPiece(kind) => {
            match state.interaction.select_piece(kind, &state.snapshots) {
                Ok(()) => {
                    state.preview.clear();
                    refresh_hover(state, req_tx).await;
                }
                Err(e) => notify(ui_tx, e.to_string()).await,
            }
        }
        UserCommand::Rotate(delta) => {
            if state.interaction.rotate(delta) {
                state.preview.clear();
                refresh_hover(state, req_tx).await;
            }
        }
        UserCommand::TogglePickup => match state.interaction.toggle_pickup() {
            Ok(_) => state.preview.clear(),
            Err(e) => notify(ui_tx, e.to_string()).await,
        },
        UserCommand::Deselect => {
            if state.interaction.deselect() {
                state.preview.clear();
            }
        }
        UserCommand::CancelPairedPlacement => {
            if let Some(cmd) = state.interaction.cancel_paired_placement() {
                send_command(state, cmd, req_tx).await;
            }
        }
        UserCommand::PassTurn => match state.interaction.pass_turn(&state.snapshots) {
            Some(cmd) => {
                state.preview.clear();
                send_command(state, cmd, req_tx).await;
            }
            None => notify(ui_tx, "It is not your turn".to_string()).await,
        },
        UserCommand::CellClicked { x, y } => {
            match state.interaction.handle_cell_click(x, y, &state.snapshots) {
                Ok(Some(cmd)) => {
                    state.preview.clear();
                    send_command(state, cmd, req_tx).await;
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Rejected placement at ({x}, {y}): {e}");
                    notify(ui_tx, e.to_string()).await;
                }
            }
        }
        UserCommand::Hover { x, y } => {
            state.hover = Some((x, y));
            refresh_hover(state, req_tx).await;
        }
        UserCommand::PointerLeft => {
            state.hover = None;
            state.preview.on_pointer_leave();
        }
        UserCommand::Quit => {}
    }

    let _ = ui_tx
        .send(UiUpdate::Interaction(state.interaction.mode()))
        .await;
    push_preview(state, ui_tx).await;
}

/// Re-evaluate the preview for the cell under the pointer. Nothing is asked
/// while offline; the transport would drop the request unsent.
async fn refresh_hover(state: &mut AppState, req_tx: &mpsc::Sender<TransportRequest>) {
    let Some((x, y)) = state.hover else {
        return;
    };
    if state.connection.status() != ConnectionStatus::Connected {
        state.preview.clear();
        return;
    }
    if let Some(cmd) = state
        .preview
        .on_hover(x, y, &state.interaction, &state.snapshots)
    {
        send_command(state, cmd, req_tx).await;
    }
}

async fn push_preview(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let preview = state.preview.current().cloned().map(Box::new);
    let _ = ui_tx.send(UiUpdate::Preview(preview)).await;
}

async fn send_command(
    state: &AppState,
    cmd: GameCommand,
    req_tx: &mpsc::Sender<TransportRequest>,
) {
    debug!("Sending {:?}", cmd);
    let text = cmd.stamp(&state.ids).to_json();
    if req_tx.send(TransportRequest::Send(text)).await.is_err() {
        warn!("Transport task is gone; command dropped");
    }
}

async fn notify(ui_tx: &mpsc::Sender<UiUpdate>, message: String) {
    let _ = ui_tx.send(UiUpdate::Notification(message)).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use prismwars_core::interaction::InteractionMode;
    use prismwars_core::snapshot::PieceKind;
    use serde_json::{json, Value};

    fn ids() -> SessionIds {
        SessionIds {
            game_id: "ABC123".into(),
            player_id: "p0".into(),
        }
    }

    fn test_state() -> AppState {
        let sessions = SessionStore::open(":memory:").expect("in-memory database should open");
        sessions.save("ABC123", "p0", "Alice").unwrap();
        AppState::new(Config::default(), ids(), "Alice".into(), sessions)
    }

    struct Harness {
        state: AppState,
        timers: Timers,
        ui_tx: mpsc::Sender<UiUpdate>,
        ui_rx: mpsc::Receiver<UiUpdate>,
        req_tx: mpsc::Sender<TransportRequest>,
        req_rx: mpsc::Receiver<TransportRequest>,
    }

    impl Harness {
        fn new() -> Self {
            let (ui_tx, ui_rx) = mpsc::channel(256);
            let (req_tx, req_rx) = mpsc::channel(256);
            Harness {
                state: test_state(),
                timers: Timers::default(),
                ui_tx,
                ui_rx,
                req_tx,
                req_rx,
            }
        }

        async fn transport(&mut self, event: TransportEvent) {
            handle_transport_event(
                &mut self.state,
                &mut self.timers,
                event,
                &self.ui_tx,
                &self.req_tx,
            )
            .await;
        }

        async fn server(&mut self, frame: Value) {
            self.transport(TransportEvent::Message(frame.to_string())).await;
        }

        async fn command(&mut self, cmd: UserCommand) {
            handle_user_command(&mut self.state, cmd, &self.ui_tx, &self.req_tx).await;
        }

        /// Outbound frames sent so far, parsed.
        fn sent(&mut self) -> Vec<Value> {
            let mut out = Vec::new();
            while let Ok(req) = self.req_rx.try_recv() {
                if let TransportRequest::Send(text) = req {
                    out.push(serde_json::from_str(&text).unwrap());
                }
            }
            out
        }

        fn updates(&mut self) -> Vec<UiUpdate> {
            let mut out = Vec::new();
            while let Ok(update) = self.ui_rx.try_recv() {
                out.push(update);
            }
            out
        }
    }

    fn snapshot_frame(state: &str, current_player: usize) -> Value {
        let inventory = json!({"reflector": 2, "splitter": 1, "paired_portal": 1});
        json!({
            "event": "game_state_update",
            "data": {
                "game_id": "ABC123",
                "state": state,
                "players": [
                    {"id": "p0", "username": "Alice", "color": "#FF6B6B"},
                    {"id": "p1", "username": "Bob", "color": "#4ECDC4"}
                ],
                "current_player": current_player,
                "board": vec![vec![Value::Null; 8]; 8],
                "board_size": 8,
                "round_number": 2,
                "max_rounds": 20,
                "player_inventory": [inventory.clone(), inventory],
                "player_energy": [5, 5],
                "piece_costs": {"reflector": 1, "splitter": 2, "paired_portal": 2},
                "time_remaining": 45
            }
        })
    }

    #[tokio::test]
    async fn connect_sends_join_and_starts_heartbeat() {
        let mut h = Harness::new();
        h.transport(TransportEvent::Connected).await;

        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["event"], "join_game_room");
        assert_eq!(sent[0]["data"]["game_id"], "ABC123");
        assert!(h.timers.heartbeat.is_some());
        assert!(h
            .updates()
            .iter()
            .any(|u| matches!(u, UiUpdate::ConnectionStatus(s) if s.label() == "Connected")));
    }

    #[tokio::test]
    async fn disconnect_stops_heartbeat_and_schedules_reconnect() {
        let mut h = Harness::new();
        h.transport(TransportEvent::Connected).await;
        h.transport(TransportEvent::Disconnected).await;

        assert!(h.timers.heartbeat.is_none());
        assert!(h.timers.reconnect_at.is_some());
        assert!(h
            .updates()
            .iter()
            .any(|u| matches!(u, UiUpdate::ConnectionStatus(s) if s.label() == "Reconnecting…")));
    }

    #[tokio::test]
    async fn snapshot_is_forwarded_and_syncs_timer() {
        let mut h = Harness::new();
        h.server(snapshot_frame("playing", 0)).await;

        assert_eq!(h.state.timer.remaining(), Some(45));
        let updates = h.updates();
        assert!(updates.iter().any(|u| matches!(
            u,
            UiUpdate::Snapshot { me: Some(0), beams_changed: true, .. }
        )));
        assert!(updates
            .iter()
            .any(|u| matches!(u, UiUpdate::Timer(Some(45)))));
    }

    #[tokio::test]
    async fn click_sends_placement_and_clears_selection() {
        let mut h = Harness::new();
        h.transport(TransportEvent::Connected).await;
        h.server(snapshot_frame("playing", 0)).await;
        h.sent();
        h.command(UserCommand::SelectPiece(PieceKind::Reflector)).await;
        h.command(UserCommand::Hover { x: 3, y: 4 }).await;
        h.command(UserCommand::CellClicked { x: 3, y: 4 }).await;

        let sent = h.sent();
        assert_eq!(sent[0]["event"], "request_preview");
        assert_eq!(sent[1]["event"], "place_piece");
        assert_eq!(sent[1]["data"]["piece_type"], "reflector");
        assert_eq!(h.state.interaction.mode(), InteractionMode::Idle);
        assert!(h.state.preview.current().is_none());
    }

    #[tokio::test]
    async fn local_validation_failure_is_notified_without_sending() {
        let mut h = Harness::new();
        h.server(snapshot_frame("playing", 0)).await;
        h.command(UserCommand::SelectPiece(PieceKind::PairedPortal)).await;
        h.updates();

        h.command(UserCommand::CellClicked { x: 4, y: 4 }).await;
        assert!(h.sent().is_empty());
        assert!(h.updates().iter().any(|u| matches!(
            u,
            UiUpdate::Notification(m) if m == "Portal must be on the border"
        )));
        assert_eq!(
            h.state.interaction.selected_piece(),
            Some(PieceKind::PairedPortal)
        );
    }

    #[tokio::test]
    async fn server_error_becomes_notification() {
        let mut h = Harness::new();
        h.server(json!({"event": "error", "data": {"message": "Not your turn"}}))
            .await;
        assert!(h
            .updates()
            .iter()
            .any(|u| matches!(u, UiUpdate::Notification(m) if m == "Not your turn")));
    }

    #[tokio::test]
    async fn pass_turn_outside_my_turn_is_refused() {
        let mut h = Harness::new();
        h.server(snapshot_frame("playing", 1)).await;
        h.command(UserCommand::PassTurn).await;
        assert!(h.sent().is_empty());

        h.server(snapshot_frame("playing", 0)).await;
        h.command(UserCommand::PassTurn).await;
        assert_eq!(h.sent()[0]["event"], "pass_turn");
    }

    #[tokio::test]
    async fn malformed_frame_is_ignored() {
        let mut h = Harness::new();
        h.transport(TransportEvent::Message("{not json".into())).await;
        assert!(h.updates().is_empty());
        assert!(h.state.snapshots.current().is_none());
    }

    #[tokio::test]
    async fn finished_snapshot_tears_everything_down_once() {
        let mut h = Harness::new();
        h.timers.countdown = Some(delayed_interval(
            Duration::from_secs(1),
            MissedTickBehavior::Burst,
        ));
        h.transport(TransportEvent::Connected).await;
        h.server(snapshot_frame("finished", 0)).await;

        assert!(h.state.terminal);
        assert!(h.timers.is_idle());
        assert!(h.state.sessions.load().unwrap().is_none());
        assert!(h
            .updates()
            .iter()
            .any(|u| matches!(u, UiUpdate::GameOver(None))));
        h.sent();

        // Everything after the terminal transition is inert.
        h.command(UserCommand::SelectPiece(PieceKind::Reflector)).await;
        h.transport(TransportEvent::Disconnected).await;
        h.server(snapshot_frame("playing", 0)).await;
        assert!(h.sent().is_empty());
        assert!(h.timers.is_idle());
        assert_eq!(h.state.interaction.mode(), InteractionMode::Idle);

        // A late game-over payload still reaches the UI.
        h.server(json!({
            "event": "game_over",
            "data": {
                "winner": {"name": "Alice", "score": 30, "color": "#FF6B6B"},
                "final_scores": [{"player": "Alice", "color": "#FF6B6B", "score": 30}]
            }
        }))
        .await;
        assert!(h
            .updates()
            .iter()
            .any(|u| matches!(u, UiUpdate::GameOver(Some(_)))));
    }

    #[tokio::test]
    async fn hover_while_offline_does_not_desync_previews() {
        let mut h = Harness::new();
        h.transport(TransportEvent::Connected).await;
        h.server(snapshot_frame("playing", 0)).await;
        h.command(UserCommand::SelectPiece(PieceKind::Reflector)).await;
        h.transport(TransportEvent::Disconnected).await;
        h.sent();

        h.command(UserCommand::Hover { x: 2, y: 3 }).await;
        assert!(h.sent().is_empty());
        assert!(h.state.preview.current().is_none());

        h.transport(TransportEvent::Connected).await;
        h.server(snapshot_frame("playing", 0)).await;
        let sent = h.sent();
        assert_eq!(sent[0]["event"], "join_game_room");
        let requests: Vec<&Value> = sent
            .iter()
            .filter(|f| f["event"] == "request_preview")
            .collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["data"]["x"], 2);

        // The authority answers without echoing the id.
        h.server(json!({"event": "preview_result", "data": {"territory": [[[0]]]}}))
            .await;
        let shown = h.state.preview.current().expect("preview after reconnect");
        assert_eq!(shown.target.cell, (2, 3));

        h.command(UserCommand::Hover { x: 4, y: 5 }).await;
        h.server(json!({"event": "preview_result", "data": {"territory": [[[0]]]}}))
            .await;
        assert_eq!(h.state.preview.current().unwrap().target.cell, (4, 5));
    }
}
