//! CLI output formatting for the offline commands.
//!
//! # Output Format
//!
//! ## Suggest
//!
//! ```text
//! photo.jpg (1600x900)
//! 001 5x3 (15 emoji)
//!     Cell: 320x300 px
//! 002 7x4 (28 emoji)
//!     Cell: 228x225 px
//! ```
//!
//! ## Crop
//!
//! ```text
//! photo.jpg → photo/ (grid 5x3, padding 1)
//! 001 emoji_0_0.png
//! 002 emoji_0_1.png
//! ...
//! Wrote 15 tiles
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::imaging::{Dimensions, GridSize, Padding};
use std::path::{Path, PathBuf};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn format_suggestions(source: &Path, dims: Dimensions, grids: &[GridSize]) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}x{})",
        file_label(source),
        dims.width,
        dims.height
    )];
    for (i, grid) in grids.iter().enumerate() {
        lines.push(format!(
            "{} {} ({} emoji)",
            format_index(i + 1),
            grid,
            grid.cell_count()
        ));
        lines.push(format!(
            "{}Cell: {}x{} px",
            indent(1),
            dims.width / grid.cols,
            dims.height / grid.rows
        ));
    }
    lines
}

pub fn print_suggestions(source: &Path, dims: Dimensions, grids: &[GridSize]) {
    for line in format_suggestions(source, dims, grids) {
        println!("{line}");
    }
}

pub fn format_crop_result(
    source: &Path,
    output_dir: &Path,
    grid: GridSize,
    padding: Padding,
    written: &[PathBuf],
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} → {}/ (grid {}, padding {})",
        file_label(source),
        output_dir.display(),
        grid,
        padding.level()
    )];
    lines.extend(
        written
            .iter()
            .enumerate()
            .map(|(i, path)| format!("{} {}", format_index(i + 1), file_label(path))),
    );
    let noun = if written.len() == 1 { "tile" } else { "tiles" };
    lines.push(format!("Wrote {} {noun}", written.len()));
    lines
}

pub fn print_crop_result(
    source: &Path,
    output_dir: &Path,
    grid: GridSize,
    padding: Padding,
    written: &[PathBuf],
) {
    for line in format_crop_result(source, output_dir, grid, padding, written) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn suggestions_list_grids_with_cell_size() {
        let grids = [GridSize::new(5, 3).unwrap(), GridSize::new(7, 4).unwrap()];
        let lines = format_suggestions(
            Path::new("/photos/photo.jpg"),
            Dimensions::new(1600, 900).unwrap(),
            &grids,
        );
        assert_eq!(
            lines,
            vec![
                "photo.jpg (1600x900)",
                "001 5x3 (15 emoji)",
                "    Cell: 320x300 px",
                "002 7x4 (28 emoji)",
                "    Cell: 228x225 px",
            ]
        );
    }

    #[test]
    fn crop_result_lists_files_and_total() {
        let written = vec![
            PathBuf::from("photo/emoji_0_0.png"),
            PathBuf::from("photo/emoji_0_1.png"),
        ];
        let lines = format_crop_result(
            Path::new("photo.jpg"),
            Path::new("photo"),
            GridSize::new(2, 2).unwrap(),
            Padding::new(3).unwrap(),
            &written,
        );
        assert_eq!(lines[0], "photo.jpg → photo/ (grid 2x2, padding 3)");
        assert_eq!(lines[1], "001 emoji_0_0.png");
        assert_eq!(lines[2], "002 emoji_0_1.png");
        assert_eq!(lines.last().unwrap(), "Wrote 2 tiles");
    }

    #[test]
    fn crop_result_singular_noun() {
        let lines = format_crop_result(
            Path::new("a.png"),
            Path::new("a"),
            GridSize::new(2, 2).unwrap(),
            Padding::default(),
            &[PathBuf::from("a/emoji_0_0.png")],
        );
        assert_eq!(lines.last().unwrap(), "Wrote 1 tile");
    }
}
