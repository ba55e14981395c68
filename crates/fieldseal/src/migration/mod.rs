//! Bulk conversion of existing records between plaintext and envelope form.
//!
//! The processor never touches storage directly; hosts implement
//! [`RecordStore`] for their record type. [`MemoryStore`] is a reference
//! implementation backed by a `BTreeMap`.
//!
//! # Guarantees
//!
//! - Records are visited in ascending id order, one bounded page at a time.
//! - Each record's read-convert-write is its own unit. A failure aborts the
//!   batch but keeps the records already written, so a re-run resumes.
//! - Re-running either direction is a no-op for values already converted.

pub mod memory;
pub mod processor;
pub mod store;

pub use memory::{MemoryStore, MemoryStoreError};
pub use processor::{Direction, MigrationError, MigrationReport, Migrator, DEFAULT_PAGE_SIZE};
pub use store::{RawRecord, RecordStore};
