//! Error types for the volume directory.

use crate::types::VolumeId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Every hosted volume is at or past the writable threshold; callers
    /// recover by registering more machines.
    #[error("no writable volume available")]
    NoWritableVolume,

    #[error("unknown volume {0}")]
    UnknownVolume(VolumeId),

    /// The backing file could not be written. In-memory and on-disk state
    /// may have diverged; the directory must not keep serving writes.
    #[error("failed to persist directory to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for DirectoryError {
    fn from(err: bincode::Error) -> Self {
        DirectoryError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DirectoryError::NoWritableVolume.to_string(),
            "no writable volume available"
        );
        assert_eq!(DirectoryError::UnknownVolume(42).to_string(), "unknown volume 42");
    }
}
