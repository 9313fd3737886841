// error.rs - Construction and configuration errors
//
// Interaction calls never fail loudly: they return false and log instead.
// These errors are only produced while building a cluster.

use std::fmt;

#[derive(Debug)]
pub enum BlobError {
    /// Container has no usable size (missing element, zero or NaN dimensions).
    InvalidContainer { width: f32, height: f32 },
    /// A tuning value is out of range.
    InvalidConfig(String),
    /// Not enough background patterns for the requested number of blobs.
    MissingPattern { blobs: usize, patterns: usize },
    /// JSON input could not be parsed.
    Parse(serde_json::Error),
}

impl fmt::Display for BlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobError::InvalidContainer { width, height } => {
                write!(f, "Container must have a positive size, got {}x{}", width, height)
            }
            BlobError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            BlobError::MissingPattern { blobs, patterns } => write!(
                f,
                "Need one pattern per blob: {} blobs but only {} patterns",
                blobs, patterns
            ),
            BlobError::Parse(e) => write!(f, "Failed to parse input: {}", e),
        }
    }
}

impl std::error::Error for BlobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlobError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BlobError {
    fn from(e: serde_json::Error) -> Self {
        BlobError::Parse(e)
    }
}

pub type Result<T> = std::result::Result<T, BlobError>;
