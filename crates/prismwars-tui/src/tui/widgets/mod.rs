// TUI widget modules, one per screen zone or overlay.

pub mod board;
pub mod game_over;
pub mod help_bar;
pub mod inventory;
pub mod notification;
pub mod quit_confirm;
pub mod scores;
pub mod selection;
pub mod status_bar;
