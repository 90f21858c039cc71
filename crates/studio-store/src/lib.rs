//! Ordered key-value storage for the Studio ledger.
//!
//! The ledger engine never touches a concrete backend. It reads and writes
//! through the [`KeyValueStore`] trait, which models a small transactional
//! store: point reads, atomic multi-key batches, and ordered range scans.
//!
//! # Storage Backends
//!
//! - [`InMemoryKvStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FileKvStore`] -- single-file, CRC-framed batch log replayed on open
//!
//! # Design Rules
//!
//! 1. A [`WriteBatch`] is applied all-or-nothing.
//! 2. The store never interprets values -- they are opaque bytes.
//! 3. Scans return keys in ascending order for both bundled backends.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod batch;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use batch::{KeyRange, WriteBatch};
pub use error::{StoreError, StoreResult};
pub use file::{FileKvStore, FileStoreConfig, SyncMode};
pub use memory::InMemoryKvStore;
pub use traits::KeyValueStore;
