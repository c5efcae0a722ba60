//! Image processing: grid suggestion and tile cutting, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Suggest grids** | [`suggest_grid_sizes`] (pure arithmetic) |
//! | **Crop → tiles** | `crop_imm` + `resize_exact` (Lanczos3) + PNG encode |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for grid math (unit testable)
//! - **Parameters**: Data structures describing the cut
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, EmojiTile, ImageBackend};
pub use calculations::{
    MAX_SUGGESTIONS, TARGET_TILE_COUNTS, plan_cell, plan_cells,
    suggest_grid_sizes,
};
pub use operations::{
    CropError, DEFAULT_TILE_SIZE, crop_to_grid, get_dimensions, plan_crop, save_tiles,
    suggest_for_image,
};
pub use params::{CellRegion, GridSize, Padding, ParamError, PlannedCell, SliceParams};
pub use rust_backend::{RustBackend, slice_image};
