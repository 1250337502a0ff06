// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +-----------------------------+--------------------+
// | Board (70%)                  | Scores (fill)      |
// |                              +--------------------+
// |                              | Inventory (8 rows) |
// |                              +--------------------+
// |                              | Selection (9 rows) |
// +-----------------------------+--------------------+
// | Notification (1 row)                              |
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Connection indicator, round, timer, whose turn.
    pub status_bar: Rect,
    /// The game board canvas, including its border.
    pub board: Rect,
    pub scores: Rect,
    /// Our remaining pieces and energy.
    pub inventory: Rect,
    /// Current interaction mode and preview summary.
    pub selection: Rect,
    /// Transient messages (rejections, validation failures).
    pub notification: Rect,
    /// Keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(10),   // board + side panel
            Constraint::Length(1), // notification
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let status_bar = vertical[0];
    let middle = vertical[1];
    let notification = vertical[2];
    let help_bar = vertical[3];

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(middle);

    let board = horizontal[0];
    let side = horizontal[1];

    let side_sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),    // scores
            Constraint::Length(8), // inventory: energy + five pieces
            Constraint::Length(9), // selection
        ])
        .split(side);

    AppLayout {
        status_bar,
        board,
        scores: side_sections[0],
        inventory: side_sections[1],
        selection: side_sections[2],
        notification,
        help_bar,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_area() -> Rect {
        Rect::new(0, 0, 160, 50)
    }

    fn all_rects(layout: &AppLayout) -> [(&'static str, Rect); 7] {
        [
            ("status_bar", layout.status_bar),
            ("board", layout.board),
            ("scores", layout.scores),
            ("inventory", layout.inventory),
            ("selection", layout.selection),
            ("notification", layout.notification),
            ("help_bar", layout.help_bar),
        ]
    }

    #[test]
    fn layout_all_rects_nonzero() {
        let layout = build_layout(test_area());
        for (name, rect) in all_rects(&layout) {
            assert!(
                rect.width > 0 && rect.height > 0,
                "{} has zero area: {:?}",
                name,
                rect
            );
        }
    }

    #[test]
    fn layout_single_row_bars() {
        let layout = build_layout(test_area());
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.notification.height, 1);
        assert_eq!(layout.help_bar.height, 1);
    }

    #[test]
    fn layout_board_wider_than_side_panel() {
        let layout = build_layout(test_area());
        assert!(
            layout.board.width > layout.scores.width,
            "Board ({}) should be wider than side panel ({})",
            layout.board.width,
            layout.scores.width
        );
    }

    #[test]
    fn layout_side_sections_stack_vertically() {
        let layout = build_layout(test_area());
        assert!(layout.scores.y < layout.inventory.y);
        assert!(layout.inventory.y < layout.selection.y);
        assert_eq!(layout.scores.width, layout.inventory.width);
        assert_eq!(layout.inventory.width, layout.selection.width);
    }

    #[test]
    fn layout_fits_within_area() {
        let area = test_area();
        let layout = build_layout(area);
        for (name, rect) in all_rects(&layout) {
            assert!(
                rect.x + rect.width <= area.width,
                "{} exceeds area width: {:?}",
                name,
                rect
            );
            assert!(
                rect.y + rect.height <= area.height,
                "{} exceeds area height: {:?}",
                name,
                rect
            );
        }
    }

    #[test]
    fn layout_small_terminal_still_valid() {
        let layout = build_layout(Rect::new(0, 0, 60, 24));
        assert!(layout.board.width > 0 && layout.board.height > 0);
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.help_bar.height, 1);
    }
}
