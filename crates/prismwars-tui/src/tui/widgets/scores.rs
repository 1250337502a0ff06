// Scores widget: one row per player with score, breakdown and markers.
//
// ▶ marks the player to move, "(You)" marks us, "(offline)" marks players
// the authority reports as disconnected.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use prismwars_core::snapshot::{GameSnapshot, ScoreEntry};

use super::board::player_color;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let lines = match state.snapshot.as_deref() {
        Some(snapshot) => build_score_lines(snapshot, state.me),
        None => vec![Line::from(Span::styled(
            " No game yet",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    let paragraph =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Scores "));
    frame.render_widget(paragraph, area);
}

/// Score rows. Players without a score entry yet are listed at zero.
pub fn build_score_lines(snapshot: &GameSnapshot, me: Option<usize>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if snapshot.win_points > 0 {
        lines.push(Line::from(Span::styled(
            format!(" First to {} points", snapshot.win_points),
            Style::default().fg(Color::DarkGray),
        )));
    }

    for (index, player) in snapshot.players.iter().enumerate() {
        let entry = snapshot
            .scores
            .iter()
            .find(|s| s.player == player.username);
        let score = entry.map_or(0, |s| s.score);
        let is_me = me == Some(index);
        let to_move = index == snapshot.current_player && !snapshot.is_terminal();

        let mut spans = vec![
            Span::styled(
                if to_move { " ▶ " } else { "   " },
                Style::default().fg(Color::White),
            ),
            Span::styled(
                player.username.clone(),
                Style::default()
                    .fg(player_color(&player.color))
                    .add_modifier(Modifier::BOLD),
            ),
        ];
        if is_me {
            spans.push(Span::styled(" (You)", Style::default().fg(Color::Gray)));
        }
        if snapshot.disconnected_players.contains(&index) {
            spans.push(Span::styled(
                " (offline)",
                Style::default().fg(Color::Red).add_modifier(Modifier::DIM),
            ));
        }
        spans.push(Span::styled(
            format!("  {}", score),
            Style::default().fg(Color::White),
        ));
        lines.push(Line::from(spans));

        if let Some(entry) = entry {
            lines.push(breakdown_line(entry));
        }
    }
    lines
}

fn breakdown_line(entry: &ScoreEntry) -> Line<'static> {
    let b = &entry.breakdown;
    Line::from(Span::styled(
        format!(
            "     territory {} · combo {} · objective {}",
            b.territory, b.combo, b.objective
        ),
        Style::default().fg(Color::DarkGray),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
