//! MemTable Module
//!
//! In-memory map holding the live key-value bindings.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Single-writer/multi-reader access pattern
//! - Track approximate size
//! - Ordered iteration for `list` and WAL snapshots
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered keys, so listings and snapshots are deterministic
//! - `Bytes` values make handing a value to a reader a refcount bump

mod table;

pub use table::{MemTable, MemTableIterator};
