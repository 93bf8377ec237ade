//! The local storage contract.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

/// Durable key-value storage with last-write-wins semantics.
///
/// Values are JSON documents. `get` of a missing key is `Ok(None)`,
/// `remove` of a missing key is a no-op.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Deletes the value stored under `key`.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Errors that can occur during local storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// Stored value is not valid JSON.
    ParseError(PathBuf, String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::ParseError(path, e) => {
                write!(f, "Failed to parse {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::ParseError(_, _) => None,
        }
    }
}
