//! Filesystem primitives for Depot
//!
//! Provides normalized relative paths, SHA-256 digests, atomic file writes,
//! and the content-addressed archive cache.

pub mod cache;
pub mod checksum;
pub mod error;
pub mod io;
pub mod path;

pub use cache::ArchiveCache;
pub use checksum::digest_bytes;
pub use error::{Error, Result};
pub use io::write_atomic;
pub use path::RelPath;
