//! Parameter types for image operations.
//!
//! These structs describe *what* to cut, not *how* to cut it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which plans a crop from the user's choices) and the
//! [`backend`](super::backend) (which does the pixel work). This separation
//! lets tests swap in a mock backend without changing the planning logic.
//!
//! ## Types
//!
//! - [`GridSize`]: Columns × rows partition, at least 2×2 and at most 200 cells. Parses from `"6x3"`.
//! - [`Padding`]: Discrete inset level 1–5, trimmed as `level * 2` pixels per side.
//! - [`CellRegion`]: A clamped crop rectangle inside the source image.
//! - [`PlannedCell`]: A region tagged with its grid position.
//! - [`SliceParams`]: Everything one slice needs: source, cells, tile size.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("Invalid grid {cols}x{rows}: both sides must be at least {min}", min = GridSize::MIN_SIDE)]
    GridTooSmall { cols: u32, rows: u32 },
    #[error("Invalid grid {cols}x{rows}: at most {max} emoji per pack", max = GridSize::MAX_CELLS)]
    GridTooLarge { cols: u32, rows: u32 },
    #[error("Invalid grid '{0}': expected COLSxROWS, e.g. 6x3")]
    GridSyntax(String),
    #[error("Invalid padding level {0}: expected 1-5")]
    PaddingOutOfRange(i64),
    #[error("Invalid padding '{0}': expected a level from 1 to 5")]
    PaddingSyntax(String),
    #[error("Invalid tile size {0}: must be positive")]
    ZeroTileSize(u32),
}

/// A columns × rows partition of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub cols: u32,
    pub rows: u32,
}

impl GridSize {
    pub const MIN_SIDE: u32 = 2;
    /// Telegram caps a custom emoji set at 200 emoji.
    pub const MAX_CELLS: u32 = 200;

    pub fn new(cols: u32, rows: u32) -> Result<Self, ParamError> {
        if cols < Self::MIN_SIDE || rows < Self::MIN_SIDE {
            return Err(ParamError::GridTooSmall { cols, rows });
        }
        if u64::from(cols) * u64::from(rows) > u64::from(Self::MAX_CELLS) {
            return Err(ParamError::GridTooLarge { cols, rows });
        }
        Ok(Self { cols, rows })
    }

    /// Number of tiles the grid produces.
    pub fn cell_count(self) -> u32 {
        self.cols * self.rows
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

impl FromStr for GridSize {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || ParamError::GridSyntax(s.to_string());
        let (cols, rows) = s.trim().split_once(['x', 'X']).ok_or_else(syntax)?;
        let cols = cols.parse::<u32>().map_err(|_| syntax())?;
        let rows = rows.parse::<u32>().map_err(|_| syntax())?;
        Self::new(cols, rows)
    }
}

/// Padding level chosen by the user (1–5).
///
/// A discrete setting rather than a pixel value: each level trims two pixels
/// from every side of every cell before the resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding(u8);

impl Padding {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: i64) -> Result<Self, ParamError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&level) {
            Ok(Self(level as u8))
        } else {
            Err(ParamError::PaddingOutOfRange(level))
        }
    }

    /// All selectable levels, smallest first.
    pub fn all() -> impl Iterator<Item = Padding> {
        (Self::MIN..=Self::MAX).map(Padding)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Margin trimmed from each side of a cell.
    pub fn pixels(self) -> u32 {
        u32::from(self.0) * 2
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl FromStr for Padding {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = s
            .trim()
            .parse::<i64>()
            .map_err(|_| ParamError::PaddingSyntax(s.to_string()))?;
        Self::new(level)
    }
}

/// Crop rectangle in source pixel coordinates, already clamped to the image.
///
/// `right` and `bottom` are exclusive. A region with `right <= left` or
/// `bottom <= top` is degenerate and must never reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRegion {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CellRegion {
    pub fn is_degenerate(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

impl fmt::Display for CellRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// One grid cell: its position and the region it is cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedCell {
    pub row: u32,
    pub col: u32,
    pub region: CellRegion,
}

/// Parameters for slicing a source image into square tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceParams {
    pub source: PathBuf,
    /// Cells in row-major order. Output tiles keep this order.
    pub cells: Vec<PlannedCell>,
    /// Edge length of every output tile.
    pub tile_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_rejects_single_row_or_column() {
        assert_eq!(
            GridSize::new(1, 4),
            Err(ParamError::GridTooSmall { cols: 1, rows: 4 })
        );
        assert!(GridSize::new(4, 1).is_err());
        assert!(GridSize::new(2, 2).is_ok());
    }

    #[test]
    fn grid_rejects_more_cells_than_a_pack_holds() {
        assert!(GridSize::new(20, 10).is_ok());
        assert_eq!(
            GridSize::new(20, 11),
            Err(ParamError::GridTooLarge { cols: 20, rows: 11 })
        );
        assert!(matches!(
            "70000x70000".parse::<GridSize>(),
            Err(ParamError::GridTooLarge { .. })
        ));
        assert!(matches!(
            GridSize::new(u32::MAX, u32::MAX),
            Err(ParamError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn grid_parses_callback_form() {
        let grid: GridSize = "6x3".parse().unwrap();
        assert_eq!(grid, GridSize { cols: 6, rows: 3 });
        assert_eq!(grid.cell_count(), 18);
        assert_eq!(grid.to_string(), "6x3");
    }

    #[test]
    fn grid_parse_accepts_uppercase_separator() {
        assert_eq!("4X5".parse::<GridSize>().unwrap(), GridSize { cols: 4, rows: 5 });
    }

    #[test]
    fn grid_parse_rejects_garbage() {
        assert!(matches!(
            "six-by-three".parse::<GridSize>(),
            Err(ParamError::GridSyntax(_))
        ));
        assert!(matches!(
            "6x".parse::<GridSize>(),
            Err(ParamError::GridSyntax(_))
        ));
        assert!(matches!(
            "-1x3".parse::<GridSize>(),
            Err(ParamError::GridSyntax(_))
        ));
    }

    #[test]
    fn padding_levels_map_to_even_pixels() {
        let pixels: Vec<u32> = Padding::all().map(Padding::pixels).collect();
        assert_eq!(pixels, vec![2, 4, 6, 8, 10]);
    }

    #[test]
    fn padding_out_of_range_rejected() {
        assert_eq!(Padding::new(0), Err(ParamError::PaddingOutOfRange(0)));
        assert_eq!(Padding::new(6), Err(ParamError::PaddingOutOfRange(6)));
        assert_eq!(
            "abc".parse::<Padding>(),
            Err(ParamError::PaddingSyntax("abc".to_string()))
        );
        assert_eq!(
            "abc".parse::<Padding>().unwrap_err().to_string(),
            "Invalid padding 'abc': expected a level from 1 to 5"
        );
        assert_eq!("3".parse::<Padding>().unwrap().level(), 3);
    }

    #[test]
    fn region_degenerate_when_inverted_or_empty() {
        let empty = CellRegion {
            left: 10,
            top: 0,
            right: 10,
            bottom: 5,
        };
        assert!(empty.is_degenerate());
        assert_eq!(empty.width(), 0);

        let ok = CellRegion {
            left: 2,
            top: 2,
            right: 8,
            bottom: 9,
        };
        assert!(!ok.is_degenerate());
        assert_eq!((ok.width(), ok.height()), (6, 7));
    }
}
