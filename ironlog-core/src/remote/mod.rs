//! Remote store access.
//!
//! The sync engine talks to the backend through the [`RemoteStore`]
//! trait. [`HttpRemote`] implements it against a per-entity REST API.
//! Error classification ([`RemoteError`]) is load-bearing: the engine's
//! retry policy keys off the class, so implementations must preserve
//! it.

mod error;
mod http;
mod store;

pub use error::{ErrorClass, RemoteError};
pub use http::{check_server, HttpRemote};
pub use store::{RemoteRecord, RemoteStore};
