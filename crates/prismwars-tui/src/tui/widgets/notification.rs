// Notification line: the latest local rejection or authority error, until it
// expires.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let line = match &state.notification {
        Some(notification) => Line::from(vec![
            Span::styled(
                " ! ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {}", notification.message),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        None => Line::default(),
    };
    frame.render_widget(Paragraph::new(line), area);
}
