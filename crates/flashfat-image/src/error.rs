//! Error types for flash image files

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Flash image errors
#[derive(Debug, Error)]
pub enum ImageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The image file could not be opened or created
    #[error("Failed to open image '{}': {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Image size is not a whole number of sectors or is out of range
    #[error("Invalid image size: {0} bytes")]
    InvalidSize(u64),

    /// Read error
    #[error("Read of {len} bytes at offset {offset:#x} failed: {source}")]
    ReadFailed {
        offset: u32,
        len: usize,
        #[source]
        source: io::Error,
    },

    /// Write error
    #[error("Write of {len} bytes at offset {offset:#x} failed: {source}")]
    WriteFailed {
        offset: u32,
        len: usize,
        #[source]
        source: io::Error,
    },

    /// Missing required parameter
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },
}

/// Result type for image operations
pub type Result<T> = std::result::Result<T, ImageError>;
