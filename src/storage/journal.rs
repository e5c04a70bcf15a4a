//! JSONL-based journal history backend.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use parking_lot::Mutex;

use super::{HistoryStore, ScriptIdentity, next_sequence_index};
use crate::error::{Error, Result};
use crate::record::RunRecord;

/// Retry policy for acquiring the journal file lock.
///
/// Attempts are separated by an exponentially growing delay, starting at
/// `initial_backoff` and capped at `max_backoff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockPolicy {
    /// Total number of attempts before giving up.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound on the delay between attempts.
    pub max_backoff: Duration,
}

impl LockPolicy {
    /// The delay after the given zero-based failed attempt.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for LockPolicy {
    /// 40 attempts, 5 ms doubling up to 250 ms: roughly eight seconds in total.
    fn default() -> Self {
        Self {
            max_attempts: 40,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(250),
        }
    }
}

/// A history backend that appends run records as JSON lines to a file.
///
/// Multiple processes can safely share the same file: appends hold an
/// exclusive file lock for the whole read-check-append cycle, loads hold a
/// shared lock. A record torn by a crash mid-write is discarded on load and
/// cut off by the next append; earlier records are never touched.
///
/// # Examples
///
/// ```no_run
/// use bbopt::storage::{JournalHistory, ScriptIdentity};
///
/// let identity = ScriptIdentity::new("tune.rs").unwrap();
/// let history = JournalHistory::for_script(&identity);
/// assert!(history.path().ends_with("tune.rs.bbopt.jsonl"));
/// ```
#[derive(Debug)]
pub struct JournalHistory {
    path: PathBuf,
    lock_policy: LockPolicy,
    /// Serialise in-process appends so we only hold the file lock briefly.
    write_lock: Mutex<()>,
}

impl JournalHistory {
    /// Creates a journal history stored at `path`.
    ///
    /// The file does not need to exist yet; it is created by the first
    /// append.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock_policy: LockPolicy::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates the journal history that lives next to a script.
    #[must_use]
    pub fn for_script(identity: &ScriptIdentity) -> Self {
        Self::new(identity.history_path())
    }

    /// Replaces the lock retry policy.
    #[must_use]
    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    /// The journal file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `op` until it succeeds, fails fatally, or attempts run out.
    fn with_retries<T>(
        &self,
        operation: &str,
        mut op: impl FnMut() -> core::result::Result<T, Attempt>,
    ) -> Result<T> {
        let attempts = self.lock_policy.max_attempts.max(1);
        let mut last = String::new();
        for attempt in 0..attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(reason)) => {
                    trace_debug!(attempt, reason = %reason, "journal {operation} retry");
                    last = reason;
                    if attempt + 1 < attempts {
                        std::thread::sleep(self.lock_policy.backoff(attempt));
                    }
                }
            }
        }
        Err(Error::Durability(format!(
            "{operation} of {} failed after {attempts} attempts: {last}",
            self.path.display()
        )))
    }

    fn try_load(&self) -> core::result::Result<Vec<RunRecord>, Attempt> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Attempt::Retry(e.to_string())),
        };
        FileExt::try_lock_shared(&file).map_err(Attempt::from_lock)?;

        let mut bytes = Vec::new();
        let read = file.read_to_end(&mut bytes);
        let _ = FileExt::unlock(&file);
        read.map_err(|e| Attempt::Retry(e.to_string()))?;

        let journal = parse_journal(&bytes).map_err(Attempt::Fatal)?;
        if journal.intact_len < bytes.len() {
            trace_warn!(
                path = %self.path.display(),
                discarded = bytes.len() - journal.intact_len,
                "ignoring torn trailing record"
            );
        }
        Ok(journal.records)
    }

    fn try_append(&self, record: &RunRecord) -> core::result::Result<RunRecord, Attempt> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| Attempt::Retry(e.to_string()))?;
        FileExt::try_lock_exclusive(&file).map_err(Attempt::from_lock)?;

        let result = append_locked(&mut file, record);
        let _ = FileExt::unlock(&file);
        result
    }
}

impl HistoryStore for JournalHistory {
    fn load(&self) -> Result<Vec<RunRecord>> {
        self.with_retries("load", || self.try_load())
    }

    fn append(&self, record: RunRecord) -> Result<RunRecord> {
        let _guard = self.write_lock.lock();
        let stored = self.with_retries("append", || self.try_append(&record))?;
        trace_debug!(
            path = %self.path.display(),
            sequence_index = stored.sequence_index,
            "run appended"
        );
        Ok(stored)
    }
}

/// Outcome of one failed attempt.
enum Attempt {
    /// Transient: lock contention or an I/O error.
    Retry(String),
    /// Permanent: retrying cannot help.
    Fatal(Error),
}

impl Attempt {
    fn from_lock(e: std::io::Error) -> Self {
        if e.kind() == fs2::lock_contended_error().kind() {
            Self::Retry("file lock is held by another process".into())
        } else {
            Self::Retry(e.to_string())
        }
    }
}

/// The body of an append, run while holding the exclusive lock.
fn append_locked(file: &mut File, record: &RunRecord) -> core::result::Result<RunRecord, Attempt> {
    let io = |e: std::io::Error| Attempt::Retry(e.to_string());

    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0)).map_err(io)?;
    file.read_to_end(&mut bytes).map_err(io)?;
    let journal = parse_journal(&bytes).map_err(Attempt::Fatal)?;

    if journal.intact_len < bytes.len() {
        trace_warn!(
            discarded = bytes.len() - journal.intact_len,
            "truncating torn trailing record"
        );
        file.set_len(journal.intact_len as u64).map_err(io)?;
    }
    file.seek(SeekFrom::Start(journal.intact_len as u64))
        .map_err(io)?;

    let mut stored = record.clone();
    stored.sequence_index = Some(next_sequence_index(&journal.records));
    let mut line = String::new();
    if journal.needs_newline {
        line.push('\n');
    }
    line.push_str(
        &serde_json::to_string(&stored)
            .map_err(|e| Attempt::Fatal(Error::Durability(e.to_string())))?,
    );
    line.push('\n');

    file.write_all(line.as_bytes()).map_err(io)?;
    file.sync_data().map_err(io)?;
    Ok(stored)
}

/// Decoded journal contents.
struct ParsedJournal {
    records: Vec<RunRecord>,
    /// Length of the prefix holding intact records.
    intact_len: usize,
    /// The intact prefix ends in a record without a line terminator.
    needs_newline: bool,
}

/// Decode a JSONL journal.
///
/// An undecodable final record is treated as a torn write and excluded from
/// the intact prefix. An undecodable record followed by further records is
/// corruption.
fn parse_journal(bytes: &[u8]) -> Result<ParsedJournal> {
    let segments: Vec<&[u8]> = bytes.split_inclusive(|&b| b == b'\n').collect();
    let last_content = segments.iter().rposition(|s| !s.trim_ascii().is_empty());

    let mut records = Vec::new();
    let mut offset = 0;
    for (i, segment) in segments.iter().enumerate() {
        let start = offset;
        offset += segment.len();
        let line = segment.trim_ascii();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_slice::<RunRecord>(line) {
            Ok(record) => records.push(record),
            Err(_) if Some(i) == last_content => {
                return Ok(ParsedJournal {
                    records,
                    intact_len: start,
                    needs_newline: false,
                });
            }
            Err(e) => {
                return Err(Error::HistoryCorruption {
                    line: i + 1,
                    reason: e.to_string(),
                });
            }
        }
    }

    let needs_newline = last_content
        .is_some_and(|i| i + 1 == segments.len() && !segments[i].ends_with(b"\n"));
    Ok(ParsedJournal {
        records,
        intact_len: bytes.len(),
        needs_newline,
    })
}
