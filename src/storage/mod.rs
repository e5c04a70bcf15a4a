//! Run history storage backends.
//!
//! The [`HistoryStore`] trait defines how run records are persisted and
//! replayed. Every [`Session`](crate::Session) owns an
//! `Arc<dyn HistoryStore>`; many sessions, in one process or in many, may
//! point at the same history.
//!
//! # Available backends
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`JournalHistory`] | JSONL file next to the script with `fs2` file locking (the default) |
//! | [`MemoryHistory`] | In-memory `Vec` behind a read-write lock |
//!
//! # Guarantees
//!
//! The history is append-only. [`append`](HistoryStore::append) assigns the
//! next `sequence_index` and writes the record in one mutually exclusive
//! step, so concurrent writers never lose or reorder records.
//! [`load`](HistoryStore::load) may observe a history that is one append
//! behind; callers only use it to inform proposals.
//!
//! # Implementing a custom backend
//!
//! Implement [`HistoryStore`] and hand it to
//! [`SessionBuilder::store`](crate::SessionBuilder::store):
//!
//! ```
//! use bbopt::prelude::*;
//!
//! let history = MemoryHistory::new();
//! let session = Session::builder("tune.rs").store(history.clone()).build().unwrap();
//! assert_eq!(session.n_runs().unwrap(), 0);
//! ```

mod identity;
mod journal;
mod memory;

pub use identity::{HISTORY_SUFFIX, ScriptIdentity};
pub use journal::{JournalHistory, LockPolicy};
pub use memory::MemoryHistory;

use crate::error::Result;
use crate::record::RunRecord;

/// Durable, append-only log of run records for one script.
///
/// Implementations must be `Send + Sync` so a store can be shared between
/// sessions.
pub trait HistoryStore: Send + Sync {
    /// Replays every stored record in sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryCorruption`](crate::Error::HistoryCorruption) if a
    /// stored record cannot be decoded, or
    /// [`Durability`](crate::Error::Durability) on I/O failure.
    fn load(&self) -> Result<Vec<RunRecord>>;

    /// Appends `record`, assigning it the next sequence index, and returns
    /// the record as stored.
    ///
    /// Any `sequence_index` already set on `record` is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`Durability`](crate::Error::Durability) if the record could
    /// not be written; records appended earlier are unaffected.
    fn append(&self, record: RunRecord) -> Result<RunRecord>;
}

/// The sequence index following the last record of `history`.
pub(crate) fn next_sequence_index(history: &[RunRecord]) -> u64 {
    history
        .iter()
        .filter_map(|r| r.sequence_index)
        .max()
        .map_or(0, |i| i + 1)
}
