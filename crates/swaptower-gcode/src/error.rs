//! Error types for G-code file handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing G-code.
#[derive(Error, Debug)]
pub enum GcodeError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file contained no G-code lines.
    #[error("no G-code lines in {}", .0.display())]
    EmptyFile(PathBuf),
}

/// Result type for G-code operations.
pub type Result<T> = std::result::Result<T, GcodeError>;
