//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take the user's choices, plan the cells, reject anything the backend
//! must never see, and call the backend.

use super::backend::{BackendError, Dimensions, EmojiTile, ImageBackend};
use super::calculations::{plan_cell, plan_cells, suggest_grid_sizes};
use super::params::{CellRegion, GridSize, Padding, ParamError, PlannedCell, SliceParams};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default tile edge in pixels; Telegram custom emoji are 100×100.
pub const DEFAULT_TILE_SIZE: u32 = 100;

#[derive(Error, Debug)]
pub enum CropError {
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(
        "Cell ({row}, {col}) collapses to {region} after padding; use less padding or fewer cells"
    )]
    DegenerateCell {
        row: u32,
        col: u32,
        region: CellRegion,
    },
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Failed to write tile {path}: {source}")]
    WriteTile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, CropError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<Dimensions> {
    Ok(backend.identify(path)?)
}

/// Identify an image and suggest grids for it.
pub fn suggest_for_image(
    backend: &impl ImageBackend,
    path: &Path,
) -> Result<(Dimensions, Vec<GridSize>)> {
    let dims = get_dimensions(backend, path)?;
    Ok((dims, suggest_grid_sizes(dims)))
}

/// Plan a crop without executing it.
///
/// Fails when the padded cells are empty, so a bad padding choice never
/// produces a stretched or blank tile. The first cell is checked before the
/// rest of the grid is laid out.
pub fn plan_crop(
    dims: Dimensions,
    grid: GridSize,
    padding: Padding,
    tile_size: u32,
) -> Result<Vec<PlannedCell>> {
    if tile_size == 0 {
        return Err(ParamError::ZeroTileSize(tile_size).into());
    }
    let GridSize { cols, rows } = grid;
    GridSize::new(cols, rows)?;

    let first = plan_cell(dims, grid, padding, 0, 0);
    if first.region.is_degenerate() {
        return Err(CropError::DegenerateCell {
            row: first.row,
            col: first.col,
            region: first.region,
        });
    }

    let cells = plan_cells(dims, grid, padding);
    if let Some(bad) = cells.iter().find(|c| c.region.is_degenerate()) {
        return Err(CropError::DegenerateCell {
            row: bad.row,
            col: bad.col,
            region: bad.region,
        });
    }
    Ok(cells)
}

/// Crop an image file into `grid.cols * grid.rows` square tiles, row-major.
pub fn crop_to_grid(
    backend: &impl ImageBackend,
    source: &Path,
    grid: GridSize,
    padding: Padding,
    tile_size: u32,
) -> Result<Vec<EmojiTile>> {
    let dims = get_dimensions(backend, source)?;
    let cells = plan_crop(dims, grid, padding, tile_size)?;

    let tiles = backend.slice(&SliceParams {
        source: source.to_path_buf(),
        cells,
        tile_size,
    })?;

    tracing::debug!(
        source = %source.display(),
        grid = %grid,
        padding = padding.level(),
        tiles = tiles.len(),
        "cropped image"
    );
    Ok(tiles)
}

/// Write tiles to `output_dir` as `emoji_{row}_{col}.png`.
///
/// Returns the written paths in tile order.
pub fn save_tiles(tiles: &[EmojiTile], output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).map_err(|source| CropError::WriteTile {
        path: output_dir.to_path_buf(),
        source,
    })?;

    tiles
        .iter()
        .map(|tile| {
            let path = output_dir.join(tile.file_name());
            std::fs::write(&path, &tile.png).map_err(|source| CropError::WriteTile {
                path: path.clone(),
                source,
            })?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::create_test_jpeg;

    fn grid(cols: u32, rows: u32) -> GridSize {
        GridSize::new(cols, rows).unwrap()
    }

    fn padding(level: i64) -> Padding {
        Padding::new(level).unwrap()
    }

    #[test]
    fn get_dimensions_calls_backend() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 1920,
            height: 1080,
        }]);

        let dims = get_dimensions(&backend, Path::new("/test.jpg")).unwrap();
        assert_eq!((dims.width, dims.height), (1920, 1080));
    }

    #[test]
    fn suggest_for_image_uses_identified_dimensions() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 1600,
            height: 900,
        }]);

        let (dims, grids) = suggest_for_image(&backend, Path::new("/photo.jpg")).unwrap();
        assert_eq!(dims.width, 1600);
        assert_eq!(grids[0], grid(5, 3));
    }

    #[test]
    fn plan_crop_rejects_padding_larger_than_cells() {
        let dims = Dimensions::new(40, 40).unwrap();
        let result = plan_crop(dims, grid(4, 4), padding(5), DEFAULT_TILE_SIZE);
        assert!(matches!(
            result,
            Err(CropError::DegenerateCell { row: 0, col: 0, .. })
        ));
    }

    #[test]
    fn plan_crop_rejects_one_pixel_cells_from_first_cell() {
        // 1px cells cannot lose 2px per side
        let dims = Dimensions::new(100, 100).unwrap();
        let result = plan_crop(dims, grid(100, 2), padding(1), DEFAULT_TILE_SIZE);
        assert!(matches!(
            result,
            Err(CropError::DegenerateCell { row: 0, col: 0, .. })
        ));
    }

    #[test]
    fn plan_crop_rejects_oversized_grid_built_from_fields() {
        // Public fields bypass GridSize::new; the planner checks again
        let dims = Dimensions::new(100, 100).unwrap();
        let huge = GridSize {
            cols: 70_000,
            rows: 70_000,
        };
        let result = plan_crop(dims, huge, padding(1), DEFAULT_TILE_SIZE);
        assert!(matches!(
            result,
            Err(CropError::Param(ParamError::GridTooLarge {
                cols: 70_000,
                rows: 70_000
            }))
        ));
    }

    #[test]
    fn plan_crop_rejects_zero_tile_size() {
        let dims = Dimensions::new(400, 400).unwrap();
        let result = plan_crop(dims, grid(2, 2), padding(1), 0);
        assert!(matches!(
            result,
            Err(CropError::Param(ParamError::ZeroTileSize(0)))
        ));
    }

    #[test]
    fn crop_with_mock_passes_all_cells() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 1200,
            height: 1200,
        }]);

        let tiles = crop_to_grid(
            &backend,
            Path::new("/input.jpg"),
            grid(3, 3),
            padding(1),
            DEFAULT_TILE_SIZE,
        )
        .unwrap();
        assert_eq!(tiles.len(), 9);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Identify(_)));
        assert!(matches!(
            &ops[1],
            RecordedOp::Slice {
                cells: 9,
                tile_size: 100,
                ..
            }
        ));
    }

    #[test]
    fn crop_degenerate_never_reaches_backend() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 40,
            height: 40,
        }]);

        let result = crop_to_grid(&backend, Path::new("/input.jpg"), grid(4, 4), padding(5), 100);
        assert!(matches!(result, Err(CropError::DegenerateCell { .. })));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1, "only identify should run: {ops:?}");
    }

    #[test]
    fn crop_backend_failure_is_propagated() {
        let backend = MockBackend::failing_slice(vec![Dimensions {
            width: 800,
            height: 800,
        }]);

        let result = crop_to_grid(&backend, Path::new("/input.jpg"), grid(2, 2), padding(1), 100);
        assert!(matches!(result, Err(CropError::Backend(_))));
    }

    #[test]
    fn crop_real_image_end_to_end() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("input.jpg");
        create_test_jpeg(&source, 1200, 1200);

        let tiles = crop_to_grid(
            &RustBackend::new(),
            &source,
            grid(3, 3),
            padding(1),
            DEFAULT_TILE_SIZE,
        )
        .unwrap();

        assert_eq!(tiles.len(), 9);
        let order: Vec<(u32, u32)> = tiles.iter().map(|t| (t.row, t.col)).collect();
        assert_eq!(
            order,
            vec![
                (0, 0),
                (0, 1),
                (0, 2),
                (1, 0),
                (1, 1),
                (1, 2),
                (2, 0),
                (2, 1),
                (2, 2)
            ]
        );
        for tile in &tiles {
            let decoded = image::load_from_memory(&tile.png).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (100, 100));
            assert!(decoded.color().has_alpha());
        }
    }

    #[test]
    fn crop_real_image_tile_count_for_many_grids() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("input.png");
        crate::test_helpers::create_test_png(&source, 160, 120);

        let backend = RustBackend::new();
        for (cols, rows) in [(2, 2), (4, 3), (6, 5), (8, 2)] {
            let tiles = crop_to_grid(&backend, &source, grid(cols, rows), padding(1), 24).unwrap();
            assert_eq!(tiles.len() as u32, cols * rows);
        }
    }

    #[test]
    fn crop_real_image_small_cells_high_padding_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("input.jpg");
        create_test_jpeg(&source, 60, 60);

        // 15px cells cannot lose 10px on each side
        let result = crop_to_grid(&RustBackend::new(), &source, grid(4, 4), padding(5), 100);
        assert!(matches!(result, Err(CropError::DegenerateCell { .. })));
    }

    #[test]
    fn save_tiles_writes_named_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("emojis");
        let tiles = vec![
            EmojiTile {
                row: 0,
                col: 0,
                png: vec![1, 2, 3],
            },
            EmojiTile {
                row: 0,
                col: 1,
                png: vec![4],
            },
        ];

        let paths = save_tiles(&tiles, &out).unwrap();
        assert_eq!(paths, vec![out.join("emoji_0_0.png"), out.join("emoji_0_1.png")]);
        assert_eq!(std::fs::read(&paths[0]).unwrap(), vec![1, 2, 3]);
    }
}
