// Selection widget: what a click on the board would do right now.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use prismwars_core::interaction::InteractionMode;
use prismwars_core::preview::Preview;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let lines = build_selection_lines(state.mode, state.preview.as_ref(), state.me);
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Selection "))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

pub fn build_selection_lines(
    mode: InteractionMode,
    preview: Option<&Preview>,
    me: Option<usize>,
) -> Vec<Line<'static>> {
    let hint = Style::default().fg(Color::Gray);
    let mut lines = Vec::new();

    match mode {
        InteractionMode::Idle => {
            lines.push(Line::from(Span::styled(
                "Nothing selected. Press 1-5 to choose a piece or p to pick one up.",
                hint,
            )));
        }
        InteractionMode::PieceSelected { kind, rotation } => {
            lines.push(Line::from(Span::styled(
                kind.label(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )));
            if kind.is_rotation_sensitive() {
                lines.push(Line::from(vec![
                    Span::styled("Rotation: ", hint),
                    Span::styled(
                        format!("{}°", rotation.degrees()),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled("  (r / R)", Style::default().fg(Color::DarkGray)),
                ]));
            }
            lines.push(Line::from(Span::styled(kind.description(), hint)));
        }
        InteractionMode::Pickup => {
            lines.push(Line::from(Span::styled(
                "Pickup mode",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                "Click one of your pieces to return it to your inventory.",
                hint,
            )));
        }
        InteractionMode::PairedPending => {
            lines.push(Line::from(Span::styled(
                "Second portal",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                "Place the linked portal on the border, or press c to cancel.",
                hint,
            )));
        }
    }

    if let (Some(preview), Some(me)) = (preview, me) {
        let (x, y) = preview.target.cell;
        lines.push(Line::from(vec![
            Span::styled(format!("Preview at ({}, {}): ", x, y), hint),
            Span::styled(
                format!("{} cells", preview.territory.owned_by(me)),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
    }
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use prismwars_core::preview::PreviewTarget;
    use prismwars_core::snapshot::{PieceKind, Rotation, TerritoryGrid};

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .flat_map(|l| l.spans.iter().map(|s| s.content.to_string()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn idle_shows_hint() {
        let lines = build_selection_lines(InteractionMode::Idle, None, Some(0));
        assert!(text(&lines).contains("Press 1-5"));
    }

    #[test]
    fn rotation_only_for_sensitive_pieces() {
        let reflector = InteractionMode::PieceSelected {
            kind: PieceKind::Reflector,
            rotation: Rotation::from_degrees(270),
        };
        assert!(text(&build_selection_lines(reflector, None, Some(0))).contains("270°"));

        let blocker = InteractionMode::PieceSelected {
            kind: PieceKind::Blocker,
            rotation: Rotation::ZERO,
        };
        assert!(!text(&build_selection_lines(blocker, None, Some(0))).contains("Rotation"));
    }

    #[test]
    fn preview_reports_cells_we_would_own() {
        let preview = Preview {
            target: PreviewTarget {
                cell: (2, 3),
                kind: PieceKind::Reflector,
                rotation: Rotation::ZERO,
            },
            territory: TerritoryGrid(vec![vec![vec![0], vec![0, 1], vec![0]]]),
        };
        let mode = InteractionMode::PieceSelected {
            kind: PieceKind::Reflector,
            rotation: Rotation::ZERO,
        };
        let all = text(&build_selection_lines(mode, Some(&preview), Some(0)));
        assert!(all.contains("Preview at (2, 3)"));
        assert!(all.contains("2 cells"));
    }

    #[test]
    fn paired_pending_mentions_cancel() {
        let lines = build_selection_lines(InteractionMode::PairedPending, None, Some(0));
        assert!(text(&lines).contains("press c to cancel"));
    }
}
