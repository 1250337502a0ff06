// Game over overlay: winner headline and final standings.
//
// Uses the authority's game-over payload when one arrived. A game that ended
// through a finished snapshot alone falls back to the snapshot's scores.
// Every entry sharing the winning score is highlighted, so ties show all
// winners.

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use prismwars_core::snapshot::ScoreEntry;

use super::board::player_color;
use crate::tui::ViewState;

const DIALOG_WIDTH: u16 = 48;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let lines = build_lines(state);
    let height = lines.len() as u16 + 2;
    let dialog_area = centered_rect(DIALOG_WIDTH, height, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Game Over ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

/// Final standings, as sent by the authority or from the last snapshot.
fn standings(state: &ViewState) -> &[ScoreEntry] {
    match (&state.game_over, state.snapshot.as_deref()) {
        (Some(payload), _) => payload.final_scores.as_slice(),
        (None, Some(snapshot)) => snapshot.scores.as_slice(),
        (None, None) => &[],
    }
}

/// Highest score among the entries.
pub fn winning_score(entries: &[ScoreEntry]) -> Option<u32> {
    entries.iter().map(|e| e.score).max()
}

pub fn headline(state: &ViewState) -> String {
    if let Some(payload) = &state.game_over {
        return if payload.winner.is_tie() {
            format!("It's a tie at {} points!", payload.winner.score)
        } else {
            format!("{} wins with {} points!", payload.winner.name, payload.winner.score)
        };
    }
    let entries = standings(state);
    let Some(top) = winning_score(entries) else {
        return "The game has ended.".to_string();
    };
    let winners: Vec<&str> = entries
        .iter()
        .filter(|e| e.score == top)
        .map(|e| e.player.as_str())
        .collect();
    match winners.as_slice() {
        [single] => format!("{} wins with {} points!", single, top),
        _ => format!("It's a tie at {} points!", top),
    }
}

fn build_lines(state: &ViewState) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!(" {}", headline(state)),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
    ];
    if let Some(reason) = state.game_over.as_ref().and_then(|p| p.reason.as_ref()) {
        lines.push(Line::from(Span::styled(
            format!(" {}", reason),
            Style::default().fg(Color::Gray),
        )));
    }
    lines.push(Line::default());

    let entries = standings(state);
    let top = winning_score(entries);
    let my_name = state
        .me
        .and_then(|me| state.snapshot.as_ref()?.players.get(me))
        .map(|p| p.username.clone());

    for entry in entries {
        let winner = Some(entry.score) == top;
        let mut name_style = Style::default().fg(player_color(&entry.color));
        if winner {
            name_style = name_style.add_modifier(Modifier::BOLD);
        }
        let mut spans = vec![
            Span::raw(if winner { " ★ " } else { "   " }),
            Span::styled(format!("{:<16}", entry.player), name_style),
            Span::styled(
                format!("{:>4}", entry.score),
                Style::default().fg(Color::White),
            ),
        ];
        if my_name.as_deref() == Some(entry.player.as_str()) {
            spans.push(Span::styled(" (You)", Style::default().fg(Color::Gray)));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        " Press q to leave",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

/// Compute a centered rectangle of the given size within `area`, clamped to
/// the available space.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .split(area);
    Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .split(vertical[0])[0]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::tests::live_state;
    use prismwars_core::wire::{GameOverPayload, Winner};

    fn entry(name: &str, score: u32) -> ScoreEntry {
        ScoreEntry {
            player: name.into(),
            color: "#FFFFFF".into(),
            score,
            breakdown: Default::default(),
        }
    }

    fn payload(winner: &str, score: u32, finals: Vec<ScoreEntry>) -> GameOverPayload {
        GameOverPayload {
            winner: Winner {
                name: winner.into(),
                score,
                color: "#FFFFFF".into(),
                breakdown: Default::default(),
            },
            final_scores: finals,
            reason: Some("Round limit reached".into()),
        }
    }

    #[test]
    fn winning_score_is_max() {
        assert_eq!(winning_score(&[entry("a", 3), entry("b", 9)]), Some(9));
        assert_eq!(winning_score(&[]), None);
    }

    #[test]
    fn headline_from_payload() {
        let mut state = live_state(8);
        state.game_over = Some(payload("Alice", 30, vec![entry("Alice", 30)]));
        assert_eq!(headline(&state), "Alice wins with 30 points!");

        state.game_over = Some(payload("Tie", 20, vec![entry("Alice", 20), entry("Bob", 20)]));
        assert_eq!(headline(&state), "It's a tie at 20 points!");
    }

    #[test]
    fn headline_falls_back_to_snapshot_scores() {
        let state = live_state(8);
        assert_eq!(headline(&state), "Alice wins with 12 points!");
        assert_eq!(headline(&ViewState::default()), "The game has ended.");
    }

    #[test]
    fn all_tied_winners_are_starred() {
        let mut state = live_state(8);
        state.game_over = Some(payload(
            "Tie",
            20,
            vec![entry("Alice", 20), entry("Bob", 20), entry("Cara", 5)],
        ));
        let lines = build_lines(&state);
        let starred = lines
            .iter()
            .filter(|l| l.spans.first().is_some_and(|s| s.content == " ★ "))
            .count();
        assert_eq!(starred, 2);
        assert!(lines
            .iter()
            .any(|l| l.spans.iter().any(|s| s.content == " (You)")));
    }

    #[test]
    fn render_does_not_panic_on_small_screen() {
        let backend = ratatui::backend::TestBackend::new(20, 6);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = live_state(8);
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
