// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the pose decoding library.

use std::fmt;

/// Result type alias for decoding operations.
pub type Result<T> = std::result::Result<T, PoseError>;

/// Main error type for the pose decoding library.
#[derive(Debug)]
pub enum PoseError {
    /// Invalid configuration provided (thresholds, scales, topology).
    ConfigError(String),
    /// Tensor shape does not match the configured topology or resolution.
    ShapeError(String),
    /// Decoding-stage invariant failure (defensive checks).
    DecodeError(String),
    /// IO error (file not found, unreadable dump, etc.).
    IoError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
}

impl fmt::Display for PoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::ShapeError(msg) => write!(f, "Shape error: {msg}"),
            Self::DecodeError(msg) => write!(f, "Decode error: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for PoseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PoseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ndarray_npy::ReadNpyError> for PoseError {
    fn from(err: ndarray_npy::ReadNpyError) -> Self {
        Self::IoError(err.to_string())
    }
}
