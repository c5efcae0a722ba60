//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | Normalize | `DynamicImage::to_rgba8` (opaque alpha synthesized) |
//! | Crop | `DynamicImage::crop_imm` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → PNG | `DynamicImage::write_to` |
//!
//! Tiles are cut in parallel with rayon; the indexed collect keeps row-major order.

use super::backend::{BackendError, Dimensions, EmojiTile, ImageBackend};
use super::params::{PlannedCell, SliceParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use rayon::prelude::*;
use std::io::Cursor;
use std::path::Path;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
///
/// The format is sniffed from the content, so a PNG saved as `input.jpg`
/// still decodes.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode an image as PNG into memory.
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {}", e)))?;
    Ok(buf.into_inner())
}

/// Cut one cell out of an RGBA source and scale it to a square tile.
fn cut_tile(
    rgba: &DynamicImage,
    cell: &PlannedCell,
    tile_size: u32,
) -> Result<EmojiTile, BackendError> {
    let region = cell.region;
    if region.is_degenerate() {
        return Err(BackendError::ProcessingFailed(format!(
            "Empty crop region {} for cell ({}, {})",
            region, cell.row, cell.col
        )));
    }

    let cropped = rgba.crop_imm(region.left, region.top, region.width(), region.height());
    let resized = cropped.resize_exact(tile_size, tile_size, FilterType::Lanczos3);

    Ok(EmojiTile {
        row: cell.row,
        col: cell.col,
        png: encode_png(&resized)?,
    })
}

/// Slice an already-decoded image into tiles.
///
/// The source is converted to RGBA first so every tile carries an alpha
/// channel, even when the source had none.
pub fn slice_image(
    img: &DynamicImage,
    cells: &[PlannedCell],
    tile_size: u32,
) -> Result<Vec<EmojiTile>, BackendError> {
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    cells
        .par_iter()
        .map(|cell| cut_tile(&rgba, cell, tile_size))
        .collect()
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| match e {
                image::ImageError::IoError(io) => BackendError::Io(io),
                other => BackendError::ProcessingFailed(format!(
                    "Failed to read dimensions of {}: {}",
                    path.display(),
                    other
                )),
            })?;
        Dimensions::new(width, height).ok_or_else(|| {
            BackendError::ProcessingFailed(format!("Image has zero size: {}x{}", width, height))
        })
    }

    fn slice(&self, params: &SliceParams) -> Result<Vec<EmojiTile>, BackendError> {
        let img = load_image(&params.source)?;
        slice_image(&img, &params.cells, params.tile_size)
    }
}
