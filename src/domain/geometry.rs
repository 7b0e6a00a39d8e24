// Grid geometry - pure cell/pixel math, no state
use super::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const GRID_COLS: u32 = 16;
pub const GRID_ROWS: u32 = 1000;
/// Approximate rendered row height in pixels, gap included.
pub const ROW_HEIGHT: f64 = 25.0;

/// Fixed-width, variable-height grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub cols: u32,
    pub rows: u32,
    pub row_height: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            cols: GRID_COLS,
            rows: GRID_ROWS,
            row_height: ROW_HEIGHT,
        }
    }
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPos {
    pub row: u32,
    pub col: u32,
}

impl CellPos {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// On-screen rectangle of the grid container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
}

impl GridRect {
    pub fn new(left: f64, top: f64, width: f64) -> Self {
        Self { left, top, width }
    }
}

/// Inclusive row/column rectangle occupied by a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl Bounds {
    pub fn new(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        Self {
            start_row,
            start_col,
            end_row,
            end_col,
        }
    }

    pub fn contains(&self, cell: CellPos) -> bool {
        cell.row >= self.start_row
            && cell.row <= self.end_row
            && cell.col >= self.start_col
            && cell.col <= self.end_col
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        overlaps(self, other)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.start_row, self.start_col, self.end_row, self.end_col
        )
    }
}

/// Bounds spanned by two arbitrary corner cells.
pub fn normalize(a: CellPos, b: CellPos) -> Bounds {
    Bounds {
        start_row: a.row.min(b.row),
        end_row: a.row.max(b.row),
        start_col: a.col.min(b.col),
        end_col: a.col.max(b.col),
    }
}

/// Two rectangles overlap unless one lies entirely above, below, left or right of the other.
pub fn overlaps(a: &Bounds, b: &Bounds) -> bool {
    !(a.end_row < b.start_row
        || a.start_row > b.end_row
        || a.end_col < b.start_col
        || a.start_col > b.end_col)
}

impl GridSpec {
    pub fn max_row(&self) -> u32 {
        self.rows.saturating_sub(1)
    }

    pub fn max_col(&self) -> u32 {
        self.cols.saturating_sub(1)
    }

    pub fn cell_width(&self, rect: &GridRect) -> f64 {
        rect.width / f64::from(self.cols.max(1))
    }

    /// Maps a pointer position to the cell under it, clamped to the grid.
    pub fn pixel_to_cell(&self, x: f64, y: f64, rect: &GridRect) -> CellPos {
        let cell_width = self.cell_width(rect);
        let col = if cell_width > 0.0 {
            ((x - rect.left) / cell_width).floor()
        } else {
            0.0
        };
        let row = if self.row_height > 0.0 {
            ((y - rect.top) / self.row_height).floor()
        } else {
            0.0
        };

        CellPos {
            row: clamp_to_axis(row, self.max_row()),
            col: clamp_to_axis(col, self.max_col()),
        }
    }

    /// Converts a pointer displacement into whole-cell deltas `(rows, cols)`.
    pub fn pixel_delta_to_cells(&self, dx: f64, dy: f64, rect: &GridRect) -> (i64, i64) {
        let cell_width = self.cell_width(rect);
        let delta_col = if cell_width > 0.0 {
            (dx / cell_width).round() as i64
        } else {
            0
        };
        let delta_row = if self.row_height > 0.0 {
            (dy / self.row_height).round() as i64
        } else {
            0
        };
        (delta_row, delta_col)
    }

    pub fn contains(&self, bounds: &Bounds) -> bool {
        bounds.start_row <= bounds.end_row
            && bounds.start_col <= bounds.end_col
            && bounds.end_row < self.rows
            && bounds.end_col < self.cols
    }

    pub fn validate(&self, bounds: &Bounds) -> Result<(), DashboardError> {
        if self.contains(bounds) {
            Ok(())
        } else {
            Err(DashboardError::OutOfBounds {
                bounds: *bounds,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }
}

fn clamp_to_axis(value: f64, max: u32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(max) {
        max
    } else {
        value as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> GridRect {
        // 16 columns of 50px each
        GridRect::new(100.0, 20.0, 800.0)
    }

    #[test]
    fn test_pixel_to_cell() {
        let grid = GridSpec::default();
        assert_eq!(grid.pixel_to_cell(100.0, 20.0, &rect()), CellPos::new(0, 0));
        assert_eq!(grid.pixel_to_cell(175.0, 70.0, &rect()), CellPos::new(2, 1));
        assert_eq!(grid.pixel_to_cell(149.9, 44.9, &rect()), CellPos::new(0, 0));
    }

    #[test]
    fn test_pixel_to_cell_clamps_outside_grid() {
        let grid = GridSpec::default();
        assert_eq!(grid.pixel_to_cell(0.0, -500.0, &rect()), CellPos::new(0, 0));
        assert_eq!(
            grid.pixel_to_cell(5000.0, 1.0e9, &rect()),
            CellPos::new(GRID_ROWS - 1, GRID_COLS - 1)
        );
    }

    #[test]
    fn test_pixel_delta_rounds_to_nearest_cell() {
        let grid = GridSpec::default();
        assert_eq!(grid.pixel_delta_to_cells(74.0, 38.0, &rect()), (2, 1));
        assert_eq!(grid.pixel_delta_to_cells(-76.0, -10.0, &rect()), (0, -2));
    }

    #[test]
    fn test_normalize_any_corner_order() {
        let expected = Bounds::new(1, 2, 4, 6);
        assert_eq!(normalize(CellPos::new(1, 2), CellPos::new(4, 6)), expected);
        assert_eq!(normalize(CellPos::new(4, 6), CellPos::new(1, 2)), expected);
        assert_eq!(normalize(CellPos::new(4, 2), CellPos::new(1, 6)), expected);
    }

    #[test]
    fn test_overlaps() {
        let a = Bounds::new(0, 0, 2, 2);
        assert!(overlaps(&a, &Bounds::new(1, 1, 3, 3)));
        assert!(overlaps(&a, &Bounds::new(2, 2, 2, 2)));
        assert!(overlaps(&Bounds::new(0, 0, 9, 9), &Bounds::new(3, 3, 4, 4)));
        assert!(!overlaps(&a, &Bounds::new(3, 0, 5, 2)));
        assert!(!overlaps(&a, &Bounds::new(0, 3, 2, 5)));
    }

    #[test]
    fn test_overlaps_is_symmetric() {
        let a = Bounds::new(5, 5, 7, 9);
        let b = Bounds::new(7, 0, 8, 5);
        assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        assert!(overlaps(&a, &b));
    }

    #[test]
    fn test_validate_rejects_out_of_grid() {
        let grid = GridSpec::default();
        assert!(grid.validate(&Bounds::new(0, 0, 999, 15)).is_ok());
        assert!(matches!(
            grid.validate(&Bounds::new(0, 0, 1, 16)),
            Err(DashboardError::OutOfBounds { .. })
        ));
        assert!(grid.validate(&Bounds::new(3, 0, 2, 0)).is_err());
    }

    #[test]
    fn test_bounds_serializes_camel_case() {
        let json = serde_json::to_value(Bounds::new(1, 2, 3, 4)).unwrap();
        assert_eq!(json["startRow"], 1);
        assert_eq!(json["endCol"], 4);
    }
}
