use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("short transfer (requested {expected} bytes, storage moved {actual})")]
    ShortTransfer { expected: usize, actual: usize },

    #[error("unsupported extended header length {0}")]
    UnsupportedHeaderLength(u16),

    #[error("machine RAM size mismatch (expected {expected} bytes, found {found} bytes)")]
    RamLenMismatch { expected: usize, found: usize },

    #[error("rle output does not fit in {capacity} bytes")]
    EncodeOverflow { capacity: usize },

    #[error("invalid snapshot options: {0}")]
    InvalidOptions(&'static str),
}
