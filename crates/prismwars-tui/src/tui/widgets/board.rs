// Board widget: territory, grid, beams, particles, pieces and light sources.
//
// Drawn on a half-block canvas, so the viewport handed to the projection is
// one unit per column and two per row. Every coordinate below comes from the
// view's `BoardProjection`; mouse hit-testing goes through the same
// projection, so what is drawn and what is clicked always agree.

use std::str::FromStr;

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::canvas::{Canvas, Context, Line as CanvasLine, Points, Rectangle};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use prismwars_core::interaction::InteractionMode;
use prismwars_core::projection::BoardProjection;
use prismwars_core::snapshot::{CellControl, Direction, GameSnapshot, PieceKind, Rotation};

use crate::tui::ViewState;

const GRID_COLOR: Color = Color::Rgb(60, 60, 70);
const CONTESTED_COLOR: Color = Color::Rgb(70, 70, 70);
const CURSOR_COLOR: Color = Color::Yellow;

/// Share of the owner's colour used for territory shading.
const TERRITORY_DIM: f64 = 0.35;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(board_title(state));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (Some(snapshot), Some(projection)) = (state.snapshot.as_deref(), state.projection) else {
        let waiting = Paragraph::new("Waiting for game state…")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(waiting, inner);
        return;
    };

    let (width, height) = viewport(inner);
    if width < 1.0 || height < 1.0 {
        return;
    }

    let canvas = Canvas::default()
        .marker(Marker::HalfBlock)
        .x_bounds([0.0, width - 1.0])
        .y_bounds([0.0, height - 1.0])
        .paint(|ctx| {
            let painter = Painter {
                projection,
                height,
            };
            painter.territory(ctx, state, snapshot);
            ctx.layer();
            painter.grid(ctx, snapshot);
            ctx.layer();
            painter.beams(ctx, state, snapshot);
            painter.pieces(ctx, state, snapshot);
            painter.cursor(ctx, state, snapshot);
        });
    frame.render_widget(canvas, inner);
}

fn board_title(state: &ViewState) -> String {
    match state.mode {
        InteractionMode::Pickup => " Board (pickup) ".to_string(),
        InteractionMode::PairedPending => " Board (place second portal) ".to_string(),
        _ => " Board ".to_string(),
    }
}

/// Inner area of the board panel.
pub fn inner_area(panel: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(panel)
}

/// Viewport of the half-block canvas covering `inner`.
pub fn viewport(inner: Rect) -> (f64, f64) {
    (f64::from(inner.width), f64::from(inner.height) * 2.0)
}

/// Board cell under a terminal position, if any.
pub fn hit_cell(state: &ViewState, column: u16, row: u16) -> Option<(i32, i32)> {
    let projection = state.projection?;
    let area = state.board_area;
    if column < area.x || row < area.y || column >= area.right() || row >= area.bottom() {
        return None;
    }
    // Centre of the terminal cell: half a column across, one half-block down.
    let px = f64::from(column - area.x) + 0.5;
    let py = f64::from(row - area.y) * 2.0 + 1.0;
    projection.cell_at(px, py)
}

/// Parse a `#RRGGBB` player colour; unknown values draw white.
pub fn player_color(hex: &str) -> Color {
    Color::from_str(hex).unwrap_or(Color::White)
}

fn dim(color: Color, factor: f64) -> Color {
    match color {
        Color::Rgb(r, g, b) => {
            let scale = |c: u8| (f64::from(c) * factor).round() as u8;
            Color::Rgb(scale(r), scale(g), scale(b))
        }
        other => other,
    }
}

/// Glyph for a piece. Rotation-sensitive pieces show their facing.
pub fn piece_glyph(kind: PieceKind, rotation: Rotation) -> &'static str {
    match kind {
        PieceKind::Reflector => match rotation.degrees() {
            90 | 270 => "\\",
            _ => "/",
        },
        PieceKind::Splitter => match rotation.degrees() {
            90 => "►",
            180 => "▼",
            270 => "◄",
            _ => "▲",
        },
        PieceKind::AreaEmitter => "✦",
        PieceKind::Blocker => "■",
        PieceKind::PairedPortal => "◎",
    }
}

fn direction_arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "↑",
        Direction::Down => "↓",
        Direction::Left => "←",
        Direction::Right => "→",
    }
}

// ---------------------------------------------------------------------------
// Painter
// ---------------------------------------------------------------------------

/// Projection-space drawing helpers. Projection y grows downwards, canvas y
/// grows upwards.
struct Painter {
    projection: BoardProjection,
    height: f64,
}

impl Painter {
    fn flip(&self, py: f64) -> f64 {
        (self.height - 1.0) - py
    }

    fn point(&self, (px, py): (f64, f64)) -> (f64, f64) {
        (px, self.flip(py))
    }

    /// Every half-block pixel inside cell `(x, y)`.
    fn cell_pixels(&self, x: i32, y: i32, out: &mut Vec<(f64, f64)>) {
        let (ox, oy) = self.projection.cell_origin(x, y);
        let size = self.projection.cell_size;
        let steps = size.ceil() as usize;
        for i in 0..steps {
            for j in 0..steps {
                out.push(self.point((ox + i as f64, oy + j as f64)));
            }
        }
    }

    fn cell_rect(&self, x: i32, y: i32, color: Color) -> Rectangle {
        let (ox, oy) = self.projection.cell_origin(x, y);
        let size = self.projection.cell_size;
        Rectangle {
            x: ox,
            y: self.flip(oy + size - 1.0),
            width: (size - 1.0).max(0.0),
            height: (size - 1.0).max(0.0),
            color,
        }
    }

    fn label(&self, ctx: &mut Context, (x, y): (i32, i32), text: &'static str, style: Style) {
        let (px, py) = self.point(self.projection.cell_center(x, y));
        ctx.print(px, py, Span::styled(text, style));
    }

    /// Territory shading. A displayed preview replaces the real territory.
    fn territory(&self, ctx: &mut Context, state: &ViewState, snapshot: &GameSnapshot) {
        let territory = state
            .preview
            .as_ref()
            .map(|p| &p.territory)
            .unwrap_or(&snapshot.territory);
        let preview_factor = if state.preview.is_some() {
            TERRITORY_DIM + 0.15
        } else {
            TERRITORY_DIM
        };

        let n = snapshot.board_size;
        let mut contested = Vec::new();
        for (index, player) in snapshot.players.iter().enumerate() {
            let mut pixels = Vec::new();
            for y in 0..n {
                for x in 0..n {
                    if territory.control(x, y) == CellControl::Owned(index) {
                        self.cell_pixels(x as i32, y as i32, &mut pixels);
                    }
                }
            }
            if !pixels.is_empty() {
                ctx.draw(&Points {
                    coords: &pixels,
                    color: dim(player_color(&player.color), preview_factor),
                });
            }
        }
        for y in 0..n {
            for x in 0..n {
                if territory.control(x, y) == CellControl::Contested {
                    self.cell_pixels(x as i32, y as i32, &mut contested);
                }
            }
        }
        if !contested.is_empty() {
            ctx.draw(&Points {
                coords: &contested,
                color: CONTESTED_COLOR,
            });
        }
    }

    fn grid(&self, ctx: &mut Context, snapshot: &GameSnapshot) {
        let n = snapshot.board_size as i32;
        for y in 0..n {
            for x in 0..n {
                ctx.draw(&self.cell_rect(x, y, GRID_COLOR));
            }
        }
    }

    fn beams(&self, ctx: &mut Context, state: &ViewState, snapshot: &GameSnapshot) {
        for segment in &snapshot.light_paths {
            let (x1, y1) = self.point(
                self.projection
                    .point_center(f64::from(segment.x1), f64::from(segment.y1)),
            );
            let (x2, y2) = self.point(
                self.projection
                    .point_center(f64::from(segment.x2), f64::from(segment.y2)),
            );
            ctx.draw(&CanvasLine {
                x1,
                y1,
                x2,
                y2,
                color: player_color(&segment.color),
            });
        }

        let particles: Vec<(f64, f64)> = state
            .animation
            .particles()
            .iter()
            .map(|p| {
                let (x, y) = p.position();
                self.point(self.projection.point_center(x, y))
            })
            .collect();
        if !particles.is_empty() {
            ctx.draw(&Points {
                coords: &particles,
                color: Color::White,
            });
        }
    }

    fn pieces(&self, ctx: &mut Context, state: &ViewState, snapshot: &GameSnapshot) {
        let zone = Style::default().fg(Color::DarkGray);
        for &(x, y) in &snapshot.protected_cells {
            self.label(ctx, (x as i32, y as i32), "·", zone);
        }
        if matches!(
            state.mode,
            InteractionMode::PieceSelected {
                kind: PieceKind::Blocker,
                ..
            }
        ) {
            let excluded = Style::default().fg(Color::Red).add_modifier(Modifier::DIM);
            for &(x, y) in &snapshot.blocker_exclusion_cells {
                self.label(ctx, (x as i32, y as i32), "×", excluded);
            }
        }

        for (y, row) in snapshot.board.iter().enumerate() {
            for (x, piece) in row.iter().enumerate() {
                if let Some(piece) = piece {
                    let style = Style::default()
                        .fg(player_color(&piece.color))
                        .add_modifier(Modifier::BOLD);
                    self.label(
                        ctx,
                        (x as i32, y as i32),
                        piece_glyph(piece.kind, piece.rotation),
                        style,
                    );
                }
            }
        }

        // Ghost of the previewed placement.
        if let Some(preview) = &state.preview {
            let ghost_color = state
                .me
                .and_then(|me| snapshot.players.get(me))
                .map(|p| player_color(&p.color))
                .unwrap_or(Color::White);
            let (x, y) = preview.target.cell;
            self.label(
                ctx,
                (x as i32, y as i32),
                piece_glyph(preview.target.kind, preview.target.rotation),
                Style::default().fg(ghost_color).add_modifier(Modifier::DIM),
            );
        }

        for source in &snapshot.light_sources {
            let style = Style::default()
                .fg(player_color(&source.color))
                .add_modifier(Modifier::BOLD);
            self.label(ctx, (source.x, source.y), direction_arrow(source.direction), style);
        }
    }

    fn cursor(&self, ctx: &mut Context, state: &ViewState, snapshot: &GameSnapshot) {
        if let Some(pending) = snapshot.pending_portal {
            ctx.draw(&self.cell_rect(pending.x as i32, pending.y as i32, Color::Magenta));
        }
        if !state.finished {
            let (x, y) = state.cursor;
            ctx.draw(&self.cell_rect(x, y, CURSOR_COLOR));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::tests::live_state;
    use prismwars_core::snapshot::{LightSource, Piece, TerritoryGrid};
    use std::sync::Arc;

    #[test]
    fn player_color_parses_hex_and_falls_back() {
        assert_eq!(player_color("#FF6B6B"), Color::Rgb(0xFF, 0x6B, 0x6B));
        assert_eq!(player_color("not a colour"), Color::White);
    }

    #[test]
    fn dim_scales_rgb_only() {
        assert_eq!(dim(Color::Rgb(200, 100, 0), 0.5), Color::Rgb(100, 50, 0));
        assert_eq!(dim(Color::Red, 0.5), Color::Red);
    }

    #[test]
    fn glyphs_follow_rotation() {
        assert_eq!(piece_glyph(PieceKind::Reflector, Rotation::ZERO), "/");
        assert_eq!(
            piece_glyph(PieceKind::Reflector, Rotation::from_degrees(90)),
            "\\"
        );
        assert_eq!(
            piece_glyph(PieceKind::Splitter, Rotation::from_degrees(180)),
            "▼"
        );
        assert_eq!(
            piece_glyph(PieceKind::Blocker, Rotation::from_degrees(90)),
            "■"
        );
    }

    #[test]
    fn viewport_uses_half_blocks() {
        assert_eq!(viewport(Rect::new(3, 4, 80, 30)), (80.0, 60.0));
    }

    #[test]
    fn hit_cell_needs_projection() {
        let state = ViewState::default();
        assert_eq!(hit_cell(&state, 10, 10), None);
    }

    #[test]
    fn hit_cell_maps_every_cell_centre_back() {
        let mut state = live_state(8);
        state.sync_geometry(Rect::new(0, 0, 120, 40));
        let projection = state.projection.unwrap();
        for y in 0..8 {
            for x in 0..8 {
                let (px, py) = projection.cell_center(x, y);
                let column = state.board_area.x + px as u16;
                let row = state.board_area.y + (py / 2.0) as u16;
                assert_eq!(hit_cell(&state, column, row), Some((x, y)));
            }
        }
    }

    #[test]
    fn renders_waiting_message_without_snapshot() {
        let backend = ratatui::backend::TestBackend::new(60, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Waiting for game state"));
    }

    #[test]
    fn renders_full_board_without_panic() {
        let mut snapshot = crate::tui::tests::sample_snapshot(8);
        snapshot.board[1][2] = Some(Piece {
            kind: PieceKind::Splitter,
            player: 1,
            rotation: Rotation::from_degrees(90),
            color: "#4ECDC4".into(),
        });
        snapshot.light_sources.push(LightSource {
            x: -1,
            y: 2,
            direction: Direction::Right,
            player: 0,
            color: "#FF6B6B".into(),
        });
        let mut grid = vec![vec![Vec::new(); 8]; 8];
        grid[2][3] = vec![0];
        grid[4][4] = vec![0, 1];
        snapshot.territory = TerritoryGrid(grid);
        snapshot.protected_cells.insert((0, 0));

        let mut state = live_state(8);
        state.snapshot = Some(Arc::new(snapshot));
        state.animation.tick();

        let backend = ratatui::backend::TestBackend::new(120, 40);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| {
                state.sync_geometry(frame.area());
                let layout = crate::tui::layout::build_layout(frame.area());
                render(frame, layout.board, &state);
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("►"));
        assert!(text.contains("→"));
    }
}
