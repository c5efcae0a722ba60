//! Shared test utilities for the emoji-grid test suite.
//!
//! Provides synthetic image builders so tests never depend on fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = tmp.path().join("input.jpg");
//! create_test_jpeg(&path, 1200, 1200);
//! ```

use image::{DynamicImage, ImageEncoder, RgbImage};
use std::path::Path;

// =========================================================================
// In-memory images
// =========================================================================

/// An RGB image whose pixels encode their own coordinates.
///
/// No two cells of a grid look the same, which makes ordering mistakes
/// visible in byte comparisons.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Encode a gradient image as PNG bytes.
pub fn gradient_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_image(width, height);
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

// =========================================================================
// On-disk images
// =========================================================================

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient_image(width, height).to_rgb8();
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a PNG file at `path` regardless of its extension.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    std::fs::write(path, gradient_png_bytes(width, height)).unwrap();
}
