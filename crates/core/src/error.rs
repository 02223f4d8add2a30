//! Error types for dirscan.

use thiserror::Error;

/// Primary error type for layout and dictionary operations.
///
/// Page-level variants (`InsufficientData`, `NoHeadersFound`, `EmptyPage`)
/// are local to one page; callers log them and move on to the next input.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("found {boxes} boxes, fewer than the {expected} expected columns")]
    InsufficientData { boxes: usize, expected: usize },

    #[error("no header boxes found among non-column boxes")]
    NoHeadersFound,

    #[error("no boxes left after removing image-edge noise")]
    EmptyPage,

    #[error("corrupt similarity index: {0}")]
    CorruptIndex(String),

    #[error("invalid bounding box: width {width}, height {height}")]
    InvalidBox { width: i32, height: i32 },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias for ScanError.
pub type Result<T> = std::result::Result<T, ScanError>;
