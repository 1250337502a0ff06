// Inventory widget: remaining energy and pieces, keyed 1-5.
//
// Pieces we are out of, or cannot afford, are dimmed. The selected piece is
// highlighted.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use prismwars_core::interaction::InteractionMode;
use prismwars_core::snapshot::{GameSnapshot, PieceKind, Rotation};

use super::board::piece_glyph;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let lines = match (state.snapshot.as_deref(), state.me) {
        (Some(snapshot), Some(me)) => build_inventory_lines(snapshot, me, state.mode),
        _ => vec![Line::from(Span::styled(
            " Not seated",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    let paragraph =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Inventory "));
    frame.render_widget(paragraph, area);
}

pub fn build_inventory_lines(
    snapshot: &GameSnapshot,
    me: usize,
    mode: InteractionMode,
) -> Vec<Line<'static>> {
    let energy = snapshot.energy(me);
    let mut lines = Vec::with_capacity(PieceKind::ALL.len() + 1);
    if !snapshot.player_energy.is_empty() {
        lines.push(Line::from(vec![
            Span::styled(" Energy: ", Style::default().fg(Color::Gray)),
            Span::styled(
                energy.to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
    }

    let selected = match mode {
        InteractionMode::PieceSelected { kind, .. } => Some(kind),
        _ => None,
    };

    for (index, kind) in PieceKind::ALL.into_iter().enumerate() {
        let count = snapshot.inventory_count(me, kind);
        let cost = snapshot.cost(kind);
        let usable = count > 0 && cost <= energy;

        let style = if selected == Some(kind) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else if usable {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        lines.push(Line::from(Span::styled(
            format!(
                " {} {} {:<12} x{}  ⚡{}",
                index + 1,
                piece_glyph(kind, Rotation::ZERO),
                kind.label(),
                count,
                cost
            ),
            style,
        )));
    }
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
