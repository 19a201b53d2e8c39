//! In-process ledger runtime for a single channel.
//!
//! Provides what a peer gives chaincode: committed world state, per-key
//! history and transaction simulation. A simulation records a read set
//! (key → committed version) and a write set; [`InMemoryLedger::commit`]
//! applies the write set only if every version read is still current,
//! so two concurrent creates of the same key cannot both commit.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Instant;

use asset_contract::{ChaincodeStub, HistoryIterator, KeyModification, StubError};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Notify;

/// Block height at which a value was committed.
pub type Version = u64;

/// Validation outcome recorded for every transaction that reached commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxValidationCode {
    Valid,
    MvccReadConflict,
    DuplicateTxid,
}

impl fmt::Display for TxValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TxValidationCode::Valid => "VALID",
            TxValidationCode::MvccReadConflict => "MVCC_READ_CONFLICT",
            TxValidationCode::DuplicateTxid => "DUPLICATE_TXID",
        })
    }
}

/// Reads and writes captured while simulating one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadWriteSet {
    /// `None` records that the key was absent when read
    pub reads: BTreeMap<String, Option<Version>>,
    /// `None` is a deletion
    pub writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl ReadWriteSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

#[derive(Debug, Clone)]
struct VersionedValue {
    value: Vec<u8>,
    version: Version,
}

#[derive(Default)]
struct LedgerState {
    world: HashMap<String, VersionedValue>,
    history: HashMap<String, Vec<KeyModification>>,
    statuses: HashMap<String, TxValidationCode>,
    height: u64,
    last_commit: Option<DateTime<Utc>>,
}

impl LedgerState {
    /// Commit time for the next block; never earlier than the previous one.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let timestamp = match self.last_commit {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_commit = Some(timestamp);
        timestamp
    }
}

pub struct InMemoryLedger {
    channel: String,
    state: RwLock<LedgerState>,
    committed: Notify,
}

impl InMemoryLedger {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            state: RwLock::new(LedgerState::default()),
            committed: Notify::new(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Number of blocks committed so far.
    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    /// Start simulating `tx_id`. State interactions after `deadline` fail.
    pub fn simulate(&self, tx_id: &str, deadline: Option<Instant>) -> Simulation<'_> {
        Simulation {
            ledger: self,
            tx_id: tx_id.to_string(),
            deadline,
            rwset: ReadWriteSet::default(),
        }
    }

    /// Validate and apply a simulated transaction as its own block.
    pub fn commit(&self, tx_id: &str, rwset: ReadWriteSet) -> TxValidationCode {
        let code = {
            let mut state = self.state.write();
            let code = Self::validate(&state, tx_id, &rwset);
            match code {
                TxValidationCode::Valid => Self::apply(&mut state, tx_id, rwset),
                TxValidationCode::MvccReadConflict => {
                    state.statuses.insert(tx_id.to_string(), code);
                }
                // The first transaction with this id keeps its status
                TxValidationCode::DuplicateTxid => {}
            }
            code
        };

        match code {
            TxValidationCode::Valid => {
                tracing::debug!(channel = %self.channel, tx_id, "transaction committed");
            }
            _ => {
                tracing::warn!(
                    channel = %self.channel,
                    tx_id,
                    code = %code,
                    "transaction invalidated"
                );
            }
        }
        self.committed.notify_waiters();
        code
    }

    /// Recorded validation code for `tx_id`, if it has reached commit.
    pub fn status(&self, tx_id: &str) -> Option<TxValidationCode> {
        self.state.read().statuses.get(tx_id).copied()
    }

    /// Wait until `tx_id` has a recorded validation code.
    pub async fn commit_status(&self, tx_id: &str) -> TxValidationCode {
        loop {
            let notified = self.committed.notified();
            if let Some(code) = self.status(tx_id) {
                return code;
            }
            notified.await;
        }
    }

    /// Hold the state exclusively; simulations and commits block until the guard drops.
    #[cfg(test)]
    pub(crate) fn lock_exclusive(&self) -> impl Sized + '_ {
        self.state.write()
    }

    /// Hold a shared read; commits block until the guard drops.
    #[cfg(test)]
    pub(crate) fn lock_shared(&self) -> impl Sized + '_ {
        self.state.read()
    }

    /// Delete `key` outside of any chaincode, as an administrative runtime action.
    pub fn delete_state(&self, tx_id: &str, key: &str) -> TxValidationCode {
        let mut rwset = ReadWriteSet::default();
        rwset.writes.insert(key.to_string(), None);
        self.commit(tx_id, rwset)
    }

    fn validate(state: &LedgerState, tx_id: &str, rwset: &ReadWriteSet) -> TxValidationCode {
        if state.statuses.contains_key(tx_id) {
            return TxValidationCode::DuplicateTxid;
        }
        let stale = rwset
            .reads
            .iter()
            .any(|(key, version)| state.world.get(key).map(|v| v.version) != *version);
        if stale {
            return TxValidationCode::MvccReadConflict;
        }
        TxValidationCode::Valid
    }

    fn apply(state: &mut LedgerState, tx_id: &str, rwset: ReadWriteSet) {
        state.height += 1;
        let height = state.height;
        let timestamp = state.next_timestamp();

        for (key, write) in rwset.writes {
            let modification = match write {
                Some(value) => {
                    state.world.insert(
                        key.clone(),
                        VersionedValue {
                            value: value.clone(),
                            version: height,
                        },
                    );
                    KeyModification {
                        tx_id: tx_id.to_string(),
                        value,
                        timestamp,
                        is_delete: false,
                    }
                }
                None => {
                    state.world.remove(&key);
                    KeyModification {
                        tx_id: tx_id.to_string(),
                        value: Vec::new(),
                        timestamp,
                        is_delete: true,
                    }
                }
            };
            state.history.entry(key).or_default().push(modification);
        }
        state
            .statuses
            .insert(tx_id.to_string(), TxValidationCode::Valid);
    }
}

// =============================================================================
// Simulation
// =============================================================================

/// Chaincode stub backed by the committed ledger plus a private write set.
pub struct Simulation<'a> {
    ledger: &'a InMemoryLedger,
    tx_id: String,
    deadline: Option<Instant>,
    rwset: ReadWriteSet,
}

impl Simulation<'_> {
    pub fn into_rwset(self) -> ReadWriteSet {
        self.rwset
    }

    fn check_deadline(&self) -> Result<(), StubError> {
        check_deadline(self.deadline)
    }
}

fn check_deadline(deadline: Option<Instant>) -> Result<(), StubError> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(StubError::DeadlineExceeded),
        _ => Ok(()),
    }
}

impl ChaincodeStub for Simulation<'_> {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, StubError> {
        self.check_deadline()?;
        if let Some(pending) = self.rwset.writes.get(key) {
            return Ok(pending.clone());
        }

        let committed = self.ledger.state.read().world.get(key).cloned();
        // First read of a key fixes the version validated at commit
        self.rwset
            .reads
            .entry(key.to_string())
            .or_insert(committed.as_ref().map(|v| v.version));
        Ok(committed.map(|v| v.value))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StubError> {
        self.check_deadline()?;
        self.rwset.writes.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn get_history_for_key(
        &mut self,
        key: &str,
    ) -> Result<Box<dyn HistoryIterator + '_>, StubError> {
        self.check_deadline()?;
        let entries = self
            .ledger
            .state
            .read()
            .history
            .get(key)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(SnapshotHistory {
            entries: entries.into_iter(),
            deadline: self.deadline,
            closed: false,
        }))
    }
}

/// History cursor over a snapshot taken when the iterator was opened.
struct SnapshotHistory {
    entries: std::vec::IntoIter<KeyModification>,
    deadline: Option<Instant>,
    closed: bool,
}

impl HistoryIterator for SnapshotHistory {
    fn has_next(&self) -> bool {
        !self.closed && !self.entries.as_slice().is_empty()
    }

    fn next(&mut self) -> Result<KeyModification, StubError> {
        if self.closed {
            return Err(StubError::Io("history iterator already closed".to_string()));
        }
        check_deadline(self.deadline)?;
        self.entries
            .next()
            .ok_or_else(|| StubError::Io("history iterator exhausted".to_string()))
    }

    fn close(&mut self) -> Result<(), StubError> {
        self.closed = true;
        Ok(())
    }
}
