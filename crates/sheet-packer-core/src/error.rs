use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetPackerError {
    #[error("Duplicate sprite identifier: {0}")]
    DuplicateIdentifier(String),
    #[error("Unknown sprite identifier: {0}")]
    UnknownIdentifier(String),
    #[error("Invalid dimensions for {key}: {width}x{height} (limit {limit})")]
    InvalidDimensions {
        key: String,
        width: u32,
        height: u32,
        limit: u32,
    },
    #[error("{pending} sprite(s) are still waiting to be decoded")]
    NotReady { pending: usize },
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Encoding error: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("An export is already in progress for this spritesheet")]
    AlreadyInProgress,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Nothing to render: canvas is {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("Sheet would be {width}px wide, more than a u32 extent can hold")]
    SheetTooLarge { width: u64 },
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SheetPackerError>;
