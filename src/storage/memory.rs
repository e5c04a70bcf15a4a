use std::sync::Arc;

use parking_lot::RwLock;

use super::{HistoryStore, next_sequence_index};
use crate::error::Result;
use crate::record::RunRecord;

/// In-memory run history.
///
/// This is a thin wrapper around `Arc<RwLock<Vec<RunRecord>>>`; clones share
/// the same records, which makes it convenient for driving several sessions
/// against one history inside a single process.
#[derive(Clone, Debug, Default)]
pub struct MemoryHistory {
    records: Arc<RwLock<Vec<RunRecord>>>,
}

impl MemoryHistory {
    /// Creates a new, empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history pre-populated with `records`.
    ///
    /// Records without a sequence index are numbered after the highest
    /// existing index, in the given order.
    #[must_use]
    pub fn with_records(records: Vec<RunRecord>) -> Self {
        let mut next = next_sequence_index(&records);
        let records = records
            .into_iter()
            .map(|mut r| {
                if r.sequence_index.is_none() {
                    r.sequence_index = Some(next);
                    next += 1;
                }
                r
            })
            .collect();
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl HistoryStore for MemoryHistory {
    fn load(&self) -> Result<Vec<RunRecord>> {
        Ok(self.records.read().clone())
    }

    fn append(&self, mut record: RunRecord) -> Result<RunRecord> {
        let mut records = self.records.write();
        record.sequence_index = Some(next_sequence_index(&records));
        records.push(record.clone());
        Ok(record)
    }
}
