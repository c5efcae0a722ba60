//! Pure calculation functions for grid layout.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::params::{CellRegion, GridSize, Padding, PlannedCell};

/// Tile counts the suggestions are anchored on, smallest first.
pub const TARGET_TILE_COUNTS: [u32; 4] = [21, 36, 56, 72];

/// Upper bound on the number of suggestions returned.
pub const MAX_SUGGESTIONS: usize = 5;

/// Largest allowed difference between grid aspect and image aspect before
/// the column count is re-derived from the image aspect.
const ASPECT_TOLERANCE: f64 = 0.4;

/// Suggest grid sizes whose cells come out roughly square for this image.
///
/// For each anchor in [`TARGET_TILE_COUNTS`] the row count is chosen so that
/// `rows² · aspect ≈ target`, then columns fill the target. When the resulting
/// grid aspect drifts more than 0.4 from the image aspect, columns are
/// recomputed from the image aspect alone; rows are kept as they are.
///
/// Rounding is half-to-even, so `4.5` rounds to `4`.
///
/// # Examples
/// ```
/// # use emoji_grid::imaging::{Dimensions, GridSize, suggest_grid_sizes};
/// let dims = Dimensions::new(1600, 900).unwrap();
/// let grids = suggest_grid_sizes(dims);
/// assert_eq!(grids[0], GridSize::new(5, 3).unwrap());
/// ```
pub fn suggest_grid_sizes(dims: Dimensions) -> Vec<GridSize> {
    let aspect = dims.width as f64 / dims.height as f64;
    let mut grids: Vec<GridSize> = Vec::with_capacity(TARGET_TILE_COUNTS.len());

    for target in TARGET_TILE_COUNTS {
        let target = target as f64;
        let rows = round_side((target / aspect).sqrt());
        let mut cols = round_side(target / rows as f64);

        let grid_aspect = cols as f64 / rows as f64;
        if (grid_aspect - aspect).abs() > ASPECT_TOLERANCE {
            cols = round_side(aspect * rows as f64);
        }

        let grid = GridSize { cols, rows };
        if !grids.contains(&grid) {
            grids.push(grid);
        }
    }

    grids.truncate(MAX_SUGGESTIONS);
    grids
}

/// Round half-to-even and floor at the minimum grid side.
fn round_side(value: f64) -> u32 {
    (value.round_ties_even() as u32).max(GridSize::MIN_SIDE)
}

/// Lay out every cell of `grid` over an image, row-major.
///
/// Cell size is the floor of `dimension / count`, computed once; leftover
/// pixels on the right and bottom edges are not part of any cell. Each cell
/// is inset by the padding margin and then clamped to the image bounds.
/// Degenerate regions are returned as-is; the caller rejects them.
pub fn plan_cells(dims: Dimensions, grid: GridSize, padding: Padding) -> Vec<PlannedCell> {
    (0..grid.rows)
        .flat_map(|row| (0..grid.cols).map(move |col| plan_cell(dims, grid, padding, row, col)))
        .collect()
}

/// Region of the single cell at `row`, `col`.
///
/// Every cell has the same padded size, so cell `(0, 0)` tells whether the
/// whole grid is usable.
pub fn plan_cell(
    dims: Dimensions,
    grid: GridSize,
    padding: Padding,
    row: u32,
    col: u32,
) -> PlannedCell {
    let cell_w = i64::from(dims.width / grid.cols);
    let cell_h = i64::from(dims.height / grid.rows);
    let pad = i64::from(padding.pixels());
    let (r, c) = (i64::from(row), i64::from(col));

    PlannedCell {
        row,
        col,
        region: CellRegion {
            left: clamp_axis(c * cell_w + pad, dims.width),
            top: clamp_axis(r * cell_h + pad, dims.height),
            right: clamp_axis((c + 1) * cell_w - pad, dims.width),
            bottom: clamp_axis((r + 1) * cell_h - pad, dims.height),
        },
    }
}

fn clamp_axis(value: i64, max: u32) -> u32 {
    value.clamp(0, i64::from(max)) as u32
}
