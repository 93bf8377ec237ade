//! Durable local key-value storage for sync engine state.
//!
//! The sync queue and identifier map are persisted through the
//! [`LocalStore`] trait so the engine survives process restarts.
//! [`FileStore`] keeps one JSON file per key under the app data
//! directory; [`MemoryStore`] backs tests.

mod file;
mod local;
mod memory;

pub use file::FileStore;
pub use local::{LocalStore, StorageError};
pub use memory::MemoryStore;
