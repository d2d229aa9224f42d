//! Error types shared across the workspace
//!
//! One `Error` enum covers every layer; crates with richer local failure
//! modes (key validation, WAL framing) define their own error types and
//! convert into this one at the boundary. We use `thiserror` for the
//! `Display` and `Error` implementations.

use crate::key::KeyError;
use std::io;
use thiserror::Error;

/// Result type alias for tesseradb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tesseradb operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (WAL file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected (CRC mismatch, bad header)
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Key failed validation
    #[error("Invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// Serialized record exceeds `Limits::max_value_bytes`
    #[error("Value too large: {actual} bytes exceeds maximum {max}")]
    ValueTooLarge {
        /// Serialized record size in bytes
        actual: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// No extension registered under the given name
    #[error("Extension not registered: {0}")]
    ExtensionNotRegistered(String),

    /// An extension with the given name is already registered
    #[error("Extension already registered: {0}")]
    ExtensionAlreadyRegistered(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_display_corruption() {
        let err = Error::Corruption("CRC mismatch at offset 128".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Data corruption"));
        assert!(msg.contains("CRC mismatch"));
    }

    #[test]
    fn test_error_display_extension_not_registered() {
        let err = Error::ExtensionNotRegistered("by-date".to_string());
        assert!(err.to_string().contains("by-date"));
    }

    #[test]
    fn test_error_from_key_error() {
        let err: Error = KeyError::Empty.into();
        assert!(matches!(err, Error::InvalidKey(KeyError::Empty)));
    }

    #[test]
    fn test_error_from_bincode() {
        let invalid = vec![0xFF; 8];
        let result: Result<String> = bincode::deserialize(&invalid).map_err(|e| e.into());
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(7)
        }
        assert_eq!(returns_result().unwrap(), 7);
    }
}
