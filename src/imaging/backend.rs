//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and slice.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::params::SliceParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Returns `None` when either side is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

/// One cut-out emoji: PNG bytes plus its grid position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiTile {
    pub row: u32,
    pub col: u32,
    /// Square RGBA PNG, `tile_size` on each side.
    pub png: Vec<u8>,
}

impl EmojiTile {
    /// File name used when tiles are written to disk.
    pub fn file_name(&self) -> String {
        format!("emoji_{}_{}.png", self.row, self.col)
    }
}

/// Trait for image processing backends.
///
/// Backends are `Sync` so a single instance can be shared by concurrent
/// conversations.
pub trait ImageBackend: Sync {
    /// Get image dimensions without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the source, then crop and resize every planned cell.
    ///
    /// Returns one tile per cell, in the order of `params.cells`.
    fn slice(&self, params: &SliceParams) -> Result<Vec<EmojiTile>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{CellRegion, PlannedCell};
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub fail_slice: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Slice {
            source: String,
            cells: usize,
            tile_size: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        /// A backend whose identify succeeds but whose slice always fails.
        pub fn failing_slice(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                fail_slice: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));

            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn slice(&self, params: &SliceParams) -> Result<Vec<EmojiTile>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Slice {
                source: params.source.to_string_lossy().to_string(),
                cells: params.cells.len(),
                tile_size: params.tile_size,
            });

            if self.fail_slice {
                return Err(BackendError::ProcessingFailed(
                    "mock slice failure".to_string(),
                ));
            }

            Ok(params
                .cells
                .iter()
                .map(|cell| EmojiTile {
                    row: cell.row,
                    col: cell.col,
                    png: vec![cell.row as u8, cell.col as u8],
                })
                .collect())
        }
    }

    #[test]
    fn dimensions_reject_zero_sides() {
        assert!(Dimensions::new(0, 10).is_none());
        assert!(Dimensions::new(10, 0).is_none());
        assert_eq!(
            Dimensions::new(3, 4),
            Some(Dimensions {
                width: 3,
                height: 4
            })
        );
    }

    #[test]
    fn tile_file_name_encodes_position() {
        let tile = EmojiTile {
            row: 2,
            col: 7,
            png: Vec::new(),
        };
        assert_eq!(tile.file_name(), "emoji_2_7.png");
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_records_slice() {
        let backend = MockBackend::new();
        let region = CellRegion {
            left: 0,
            top: 0,
            right: 10,
            bottom: 10,
        };

        let tiles = backend
            .slice(&SliceParams {
                source: "/source.jpg".into(),
                cells: vec![
                    PlannedCell {
                        row: 0,
                        col: 0,
                        region,
                    },
                    PlannedCell {
                        row: 0,
                        col: 1,
                        region,
                    },
                ],
                tile_size: 100,
            })
            .unwrap();

        assert_eq!(tiles.len(), 2);
        assert_eq!((tiles[1].row, tiles[1].col), (0, 1));
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Slice {
                cells: 2,
                tile_size: 100,
                ..
            }
        ));
    }
}
