//! Access token caching for the Zermelo client.
//!
//! Tokens are opaque strings keyed by user id. The client depends on the
//! [`TokenStore`] trait; [`FileTokenStore`] persists to a JSON document and
//! [`MemoryTokenStore`] keeps everything in process.

pub mod error;
pub mod memory;
pub mod storage;

pub use error::StorageError;
pub use memory::MemoryTokenStore;
pub use storage::{FileTokenStore, TokenCache, TokenStore, DEFAULT_CACHE_FILE};
