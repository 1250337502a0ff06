// Status bar widget: connection indicator, round, countdown, whose turn.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use prismwars_core::connection::ConnectionStatus;
use prismwars_core::snapshot::{GamePhase, GameSnapshot};

use super::board::player_color;
use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [connection] | Round r/max | ⏱ m:ss | turn
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let separator = || Span::styled(" | ", Style::default().fg(Color::Gray));
    let mut spans = Vec::new();

    let (dot, dot_color) = connection_indicator(state.connection_status);
    spans.push(Span::styled(
        format!(" {} ", dot),
        Style::default().fg(dot_color),
    ));
    spans.push(Span::styled(
        state.connection_status.label(),
        Style::default().fg(Color::White),
    ));

    if let Some(snapshot) = state.snapshot.as_deref() {
        spans.push(separator());
        spans.push(Span::styled(
            format!("Round {}/{}", snapshot.round_number, snapshot.max_rounds),
            Style::default().fg(Color::White),
        ));

        spans.push(separator());
        let timer_style = if state.timer.is_urgent() {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("⏱ {}", state.timer), timer_style));

        spans.push(separator());
        spans.push(turn_span(snapshot, state.me, state.finished));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Return the connection dot character and its color.
pub fn connection_indicator(status: ConnectionStatus) -> (&'static str, Color) {
    match status {
        ConnectionStatus::Connected => ("●", Color::Green),
        ConnectionStatus::Disconnected => ("●", Color::Yellow),
        ConnectionStatus::Error => ("●", Color::Red),
    }
}

/// Describe whose turn it is.
pub fn turn_span(snapshot: &GameSnapshot, me: Option<usize>, finished: bool) -> Span<'static> {
    if finished || snapshot.phase == GamePhase::Finished {
        return Span::styled("Game over", Style::default().fg(Color::Gray));
    }
    if snapshot.phase == GamePhase::Waiting {
        return Span::styled(
            "Waiting for players",
            Style::default().fg(Color::Gray),
        );
    }
    if me == Some(snapshot.current_player) {
        return Span::styled(
            "Your turn",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        );
    }
    match snapshot.current_player_info() {
        Some(player) => Span::styled(
            format!("{}'s turn", player.username),
            Style::default().fg(player_color(&player.color)),
        ),
        None => Span::styled("Waiting", Style::default().fg(Color::Gray)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::tests::{live_state, sample_snapshot};

    fn rendered(state: &ViewState) -> String {
        let backend = ratatui::backend::TestBackend::new(100, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), state))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn connection_indicator_colors() {
        assert_eq!(
            connection_indicator(ConnectionStatus::Connected),
            ("●", Color::Green)
        );
        assert_eq!(
            connection_indicator(ConnectionStatus::Disconnected),
            ("●", Color::Yellow)
        );
        assert_eq!(
            connection_indicator(ConnectionStatus::Error),
            ("●", Color::Red)
        );
    }

    #[test]
    fn turn_span_variants() {
        let mut snapshot = sample_snapshot(8);
        assert_eq!(turn_span(&snapshot, Some(0), false).content, "Your turn");
        assert_eq!(turn_span(&snapshot, Some(1), false).content, "Alice's turn");

        snapshot.phase = GamePhase::Waiting;
        assert_eq!(
            turn_span(&snapshot, Some(0), false).content,
            "Waiting for players"
        );

        snapshot.phase = GamePhase::Playing;
        assert_eq!(turn_span(&snapshot, Some(0), true).content, "Game over");
    }

    #[test]
    fn shows_reconnecting_before_any_snapshot() {
        let state = ViewState::default();
        let text = rendered(&state);
        assert!(text.contains("Reconnecting…"));
        assert!(!text.contains("Round"));
    }

    #[test]
    fn shows_round_and_timer() {
        let mut state = live_state(8);
        state.connection_status = ConnectionStatus::Connected;
        state.timer.sync(Some(75));
        let text = rendered(&state);
        assert!(text.contains("Connected"));
        assert!(text.contains("Round 3/20"));
        assert!(text.contains("1:15"));
        assert!(text.contains("Your turn"));
    }
}
