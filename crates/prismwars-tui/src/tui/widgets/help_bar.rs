// Help bar: keyboard shortcuts for the current screen.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

const PLAYING_HELP: &str =
    " 1-5:Piece | r/R:Rotate | p:Pickup | Esc:Deselect | c:Cancel portal | n:Pass | arrows+Enter:Cursor | q:Quit";
const FINISHED_HELP: &str = " q/Enter:Quit";

pub fn help_text(state: &ViewState) -> &'static str {
    if state.finished {
        FINISHED_HELP
    } else {
        PLAYING_HELP
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        help_text(state),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
