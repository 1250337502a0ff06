// Board-to-viewport projection.
//
// One `BoardProjection` is derived per (viewport, board size) pair and every
// drawing or hit-test coordinate goes through it: grid lines, pieces, beams,
// particles, previews and pointer hits all agree because none of them compute
// geometry on their own. The viewport unit is whatever the front-end draws in
// (pixels, half-block terminal cells); y grows downwards.

/// Tunables for the projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    /// Upper bound on the size of one cell, in viewport units.
    pub max_cell_size: f64,
    /// Empty cells' worth of space kept around the board, split evenly.
    pub margin_cells: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        ProjectionParams {
            max_cell_size: 60.0,
            margin_cells: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardProjection {
    pub cell_size: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    board_size: usize,
    viewport: (f64, f64),
}

impl BoardProjection {
    pub fn compute(width: f64, height: f64, board_size: usize, params: ProjectionParams) -> Self {
        let span = board_size as f64 + params.margin_cells;
        let cell_size = if board_size == 0 || span <= 0.0 {
            0.0
        } else {
            params
                .max_cell_size
                .min(width / span)
                .min(height / span)
                .max(0.0)
        };
        let board_px = cell_size * board_size as f64;
        BoardProjection {
            cell_size,
            offset_x: ((width - board_px) / 2.0).max(0.0),
            offset_y: ((height - board_px) / 2.0).max(0.0),
            board_size,
            viewport: (width, height),
        }
    }

    /// True when the projection is out of date for the given inputs.
    pub fn is_stale(&self, width: f64, height: f64, board_size: usize) -> bool {
        self.viewport != (width, height) || self.board_size != board_size
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    /// Top-left corner of cell `(x, y)`.
    pub fn cell_origin(&self, x: i32, y: i32) -> (f64, f64) {
        (
            self.offset_x + x as f64 * self.cell_size,
            self.offset_y + y as f64 * self.cell_size,
        )
    }

    pub fn cell_center(&self, x: i32, y: i32) -> (f64, f64) {
        self.point_center(x as f64, y as f64)
    }

    /// Centre of a fractional cell position. Used for beam endpoints (which
    /// may lie on the margin at -1 or `board_size`) and moving particles.
    pub fn point_center(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.offset_x + (x + 0.5) * self.cell_size,
            self.offset_y + (y + 0.5) * self.cell_size,
        )
    }

    /// `(x, y, width, height)` of the whole grid.
    pub fn board_rect(&self) -> (f64, f64, f64, f64) {
        let side = self.cell_size * self.board_size as f64;
        (self.offset_x, self.offset_y, side, side)
    }

    /// Cell under viewport point `(px, py)`, or `None` off the grid.
    pub fn cell_at(&self, px: f64, py: f64) -> Option<(i32, i32)> {
        if self.cell_size <= 0.0 {
            return None;
        }
        let cx = ((px - self.offset_x) / self.cell_size).floor();
        let cy = ((py - self.offset_y) / self.cell_size).floor();
        let n = self.board_size as f64;
        if (0.0..n).contains(&cx) && (0.0..n).contains(&cy) {
            Some((cx as i32, cy as i32))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_size_capped_by_upper_limit() {
        let p = BoardProjection::compute(2000.0, 2000.0, 8, ProjectionParams::default());
        assert_eq!(p.cell_size, 60.0);
        assert_eq!(p.offset_x, (2000.0 - 480.0) / 2.0);
    }

    #[test]
    fn cell_size_fits_smaller_dimension_with_margin() {
        let p = BoardProjection::compute(400.0, 200.0, 8, ProjectionParams::default());
        assert_eq!(p.cell_size, 20.0);
        assert_eq!(p.offset_x, 120.0);
        assert_eq!(p.offset_y, 20.0);
        assert_eq!(p.board_rect(), (120.0, 20.0, 160.0, 160.0));
    }

    #[test]
    fn centres_and_origins_share_geometry() {
        let p = BoardProjection::compute(400.0, 200.0, 8, ProjectionParams::default());
        assert_eq!(p.cell_origin(0, 0), (120.0, 20.0));
        assert_eq!(p.cell_center(1, 2), (150.0, 70.0));
        // Margin light source just left of the grid.
        assert_eq!(p.cell_center(-1, 0), (110.0, 30.0));
        assert_eq!(p.point_center(1.0, 2.0), p.cell_center(1, 2));
    }

    #[test]
    fn hit_testing_inverts_projection() {
        let p = BoardProjection::compute(400.0, 200.0, 8, ProjectionParams::default());
        for (x, y) in [(0, 0), (3, 4), (7, 7)] {
            let (cx, cy) = p.cell_center(x, y);
            assert_eq!(p.cell_at(cx, cy), Some((x, y)));
        }
        assert_eq!(p.cell_at(119.0, 50.0), None);
        assert_eq!(p.cell_at(280.0, 50.0), None);
        assert_eq!(p.cell_at(150.0, 181.0), None);
    }

    #[test]
    fn staleness_tracks_viewport_and_board() {
        let p = BoardProjection::compute(400.0, 200.0, 8, ProjectionParams::default());
        assert!(!p.is_stale(400.0, 200.0, 8));
        assert!(p.is_stale(401.0, 200.0, 8));
        assert!(p.is_stale(400.0, 200.0, 10));
    }

    #[test]
    fn degenerate_inputs_do_not_panic() {
        let p = BoardProjection::compute(0.0, 0.0, 8, ProjectionParams::default());
        assert_eq!(p.cell_size, 0.0);
        assert_eq!(p.cell_at(0.0, 0.0), None);
        let p = BoardProjection::compute(100.0, 100.0, 0, ProjectionParams::default());
        assert_eq!(p.cell_at(50.0, 50.0), None);
    }
}
