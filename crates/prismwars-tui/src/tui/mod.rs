// TUI front-end: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors the parts of the application state
// it draws. The app orchestrator pushes `UiUpdate` messages over an mpsc
// channel; the TUI applies them to `ViewState` and repaints on every frame
// tick. The frame tick also drives the particle animation loop, which runs
// from the first live snapshot until the game is over.

pub mod input;
pub mod layout;
pub mod widgets;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream};
use futures_util::StreamExt;
use ratatui::layout::Rect;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use prismwars_core::connection::ConnectionStatus;
use prismwars_core::interaction::InteractionMode;
use prismwars_core::particles::{AnimationLoop, ParticleSystem};
use prismwars_core::preview::Preview;
use prismwars_core::projection::{BoardProjection, ProjectionParams};
use prismwars_core::snapshot::GameSnapshot;
use prismwars_core::timer::CountdownTimer;
use prismwars_core::wire::GameOverPayload;

use crate::config::Config;
use crate::protocol::{UiUpdate, UserCommand};

use layout::build_layout;

/// How long a notification stays up unless configured otherwise.
const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// A transient message shown on the notification line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub expires_at: Instant,
}

/// TUI-local state that mirrors the application state for rendering.
pub struct ViewState {
    pub connection_status: ConnectionStatus,
    /// Latest authoritative snapshot, replaced wholesale.
    pub snapshot: Option<Arc<GameSnapshot>>,
    /// Our player index in `snapshot`.
    pub me: Option<usize>,
    pub mode: InteractionMode,
    pub preview: Option<Preview>,
    pub timer: CountdownTimer,
    pub notification: Option<Notification>,
    pub notification_ttl: Duration,
    /// The game has ended; input is limited to quitting.
    pub finished: bool,
    /// Final results, when the authority sent them.
    pub game_over: Option<GameOverPayload>,
    /// Keyboard cursor on the board, in cell coordinates.
    pub cursor: (i32, i32),
    /// Cell the mouse pointer is over, if it is over the board at all.
    pub pointer_cell: Option<(i32, i32)>,
    pub confirm_quit: bool,
    pub animation: AnimationLoop,
    /// Inner area of the board panel as of the last frame.
    pub board_area: Rect,
    pub projection: Option<BoardProjection>,
    pub projection_params: ProjectionParams,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::new(
            AnimationLoop::new(ParticleSystem::new()),
            ProjectionParams::default(),
            DEFAULT_NOTIFICATION_TTL,
        )
    }
}

impl ViewState {
    pub fn new(
        animation: AnimationLoop,
        projection_params: ProjectionParams,
        notification_ttl: Duration,
    ) -> Self {
        ViewState {
            connection_status: ConnectionStatus::Disconnected,
            snapshot: None,
            me: None,
            mode: InteractionMode::Idle,
            preview: None,
            timer: CountdownTimer::new(),
            notification: None,
            notification_ttl,
            finished: false,
            game_over: None,
            cursor: (0, 0),
            pointer_cell: None,
            confirm_quit: false,
            animation,
            board_area: Rect::default(),
            projection: None,
            projection_params,
        }
    }

    pub fn board_size(&self) -> Option<usize> {
        self.snapshot.as_ref().map(|s| s.board_size)
    }

    /// Recompute the board geometry for a frame of the given size. The
    /// projection is only rebuilt when the viewport or board size changed.
    pub fn sync_geometry(&mut self, area: Rect) {
        let layout = build_layout(area);
        self.board_area = widgets::board::inner_area(layout.board);

        let Some(board_size) = self.board_size() else {
            self.projection = None;
            return;
        };
        let (width, height) = widgets::board::viewport(self.board_area);
        let stale = self
            .projection
            .map_or(true, |p| p.is_stale(width, height, board_size));
        if stale {
            debug!(
                "Recomputing board projection for {}x{} viewport, board size {}",
                width, height, board_size
            );
            self.projection = Some(BoardProjection::compute(
                width,
                height,
                board_size,
                self.projection_params,
            ));
        }
    }

    /// Per-frame housekeeping: advance the animation and drop an expired
    /// notification.
    pub fn on_frame(&mut self, now: Instant) {
        self.animation.tick();
        if self
            .notification
            .as_ref()
            .is_some_and(|n| n.expires_at <= now)
        {
            self.notification = None;
        }
    }

    fn notify(&mut self, message: String, now: Instant) {
        self.notification = Some(Notification {
            message,
            expires_at: now + self.notification_ttl,
        });
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    apply_ui_update_at(state, update, Instant::now());
}

fn apply_ui_update_at(state: &mut ViewState, update: UiUpdate, now: Instant) {
    match update {
        UiUpdate::ConnectionStatus(status) => {
            state.connection_status = status;
        }
        UiUpdate::Snapshot {
            snapshot,
            me,
            beams_changed,
        } => {
            if beams_changed {
                state.animation.on_beams_changed(&snapshot.light_paths);
            }
            if !snapshot.is_terminal() {
                state.animation.start();
            }
            let last = snapshot.board_size.saturating_sub(1) as i32;
            state.cursor = (state.cursor.0.clamp(0, last), state.cursor.1.clamp(0, last));
            state.snapshot = Some(snapshot);
            state.me = me;
        }
        UiUpdate::Interaction(mode) => {
            state.mode = mode;
        }
        UiUpdate::Preview(preview) => {
            state.preview = preview.map(|p| *p);
        }
        UiUpdate::Timer(remaining) => {
            state.timer.reset();
            state.timer.sync(remaining);
        }
        UiUpdate::Notification(message) => {
            state.notify(message, now);
        }
        UiUpdate::GameOver(payload) => {
            state.finished = true;
            if let Some(payload) = payload {
                state.game_over = Some(*payload);
            }
            state.animation.stop();
            state.preview = None;
            state.pointer_cell = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete screen.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let area = frame.area();
    let layout = build_layout(area);

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::board::render(frame, layout.board, state);
    widgets::scores::render(frame, layout.scores, state);
    widgets::inventory::render(frame, layout.inventory, state);
    widgets::selection::render(frame, layout.selection, state);
    widgets::notification::render(frame, layout.notification, state);
    widgets::help_bar::render(frame, layout.help_bar, state);

    if state.finished {
        widgets::game_over::render(frame, area, state);
    }
    if state.confirm_quit {
        widgets::quit_confirm::render(frame, area);
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

fn restore_terminal() {
    let _ = crossterm::execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
}

/// Run the TUI event loop.
///
/// 1. Initializes the terminal and enables mouse capture.
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard and mouse input,
///    frame ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    config: &Config,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();
    crossterm::execute!(std::io::stdout(), EnableMouseCapture)?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::new(
        AnimationLoop::new(ParticleSystem::new()),
        config.projection(),
        config.notification_ttl(),
    );
    let mut event_stream = EventStream::new();

    let mut frame_tick = tokio::time::interval(config.frame_period());
    frame_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => apply_ui_update(&mut view_state, update),
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                let cmd = match maybe_event {
                    Some(Ok(Event::Key(key_event))) => input::handle_key(key_event, &mut view_state),
                    Some(Ok(Event::Mouse(mouse_event))) => input::handle_mouse(mouse_event, &mut view_state),
                    // Resizes are picked up by the next frame's geometry sync.
                    Some(Ok(_)) => None,
                    Some(Err(e)) => {
                        warn!("Terminal input error: {}", e);
                        break Ok(());
                    }
                    None => break Ok(()),
                };
                if let Some(cmd) = cmd {
                    let quit = cmd == UserCommand::Quit;
                    let _ = cmd_tx.send(cmd).await;
                    if quit {
                        break Ok(());
                    }
                }
            }

            _ = frame_tick.tick() => {
                view_state.on_frame(Instant::now());
                if let Err(e) = terminal.draw(|frame| {
                    view_state.sync_geometry(frame.area());
                    render_frame(frame, &view_state);
                }) {
                    break Err(e.into());
                }
            }
        }
    };

    restore_terminal();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
