//! In-memory [`ChaincodeStub`] for exercising the contract without a peer.
//!
//! Writes commit immediately and append to the key's history. Each call to
//! [`MockStub::begin`] starts a new transaction with a deterministic tx id and
//! advances the mock clock by one second.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::stub::{ChaincodeStub, HistoryIterator, KeyModification, StubError};

/// 2024-01-01T00:00:00Z
const EPOCH_SECS: i64 = 1_704_067_200;

pub struct MockStub {
    tx_id: String,
    tx_count: u64,
    clock: DateTime<Utc>,
    world: HashMap<String, Vec<u8>>,
    history: HashMap<String, Vec<KeyModification>>,
    reads: usize,
    open_iterators: Arc<AtomicUsize>,
    /// Every `get_state` fails
    pub fail_reads: bool,
    /// Every `put_state` fails
    pub fail_writes: bool,
    /// `get_history_for_key` itself fails
    pub fail_history: bool,
    /// The iterator fails when asked for the entry at this index
    pub fail_history_at: Option<usize>,
}

impl Default for MockStub {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStub {
    pub fn new() -> Self {
        Self {
            tx_id: String::new(),
            tx_count: 0,
            clock: DateTime::<Utc>::from_timestamp(EPOCH_SECS, 0).unwrap_or_default(),
            world: HashMap::new(),
            history: HashMap::new(),
            reads: 0,
            open_iterators: Arc::new(AtomicUsize::new(0)),
            fail_reads: false,
            fail_writes: false,
            fail_history: false,
            fail_history_at: None,
        }
    }

    /// Start a new transaction.
    pub fn begin(&mut self) -> &mut Self {
        self.tx_count += 1;
        self.tx_id = format!("mocktx{:04}", self.tx_count);
        self.clock += Duration::seconds(1);
        self
    }

    /// Remove `key` the way the runtime would, recording a deletion in history.
    pub fn delete(&mut self, key: &str) {
        self.begin();
        self.world.remove(key);
        let entry = KeyModification {
            tx_id: self.tx_id.clone(),
            value: Vec::new(),
            timestamp: self.clock,
            is_delete: true,
        };
        self.history.entry(key.to_string()).or_default().push(entry);
    }

    /// Committed bytes for `key`, bypassing read accounting.
    pub fn state(&self, key: &str) -> Option<&[u8]> {
        self.world.get(key).map(Vec::as_slice)
    }

    /// Store raw bytes directly, bypassing the contract.
    pub fn seed(&mut self, key: &str, value: Vec<u8>) {
        self.begin();
        self.world.insert(key.to_string(), value.clone());
        let entry = KeyModification {
            tx_id: self.tx_id.clone(),
            value,
            timestamp: self.clock,
            is_delete: false,
        };
        self.history.entry(key.to_string()).or_default().push(entry);
    }

    /// Number of `get_state` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// History iterators handed out and not yet closed.
    pub fn open_iterators(&self) -> usize {
        self.open_iterators.load(Ordering::SeqCst)
    }
}

impl ChaincodeStub for MockStub {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, StubError> {
        self.reads += 1;
        if self.fail_reads {
            return Err(StubError::Io("mock read failure".to_string()));
        }
        Ok(self.world.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StubError> {
        if self.fail_writes {
            return Err(StubError::Io("mock write failure".to_string()));
        }
        self.world.insert(key.to_string(), value.clone());
        let entry = KeyModification {
            tx_id: self.tx_id.clone(),
            value,
            timestamp: self.clock,
            is_delete: false,
        };
        self.history.entry(key.to_string()).or_default().push(entry);
        Ok(())
    }

    fn get_history_for_key(
        &mut self,
        key: &str,
    ) -> Result<Box<dyn HistoryIterator + '_>, StubError> {
        if self.fail_history {
            return Err(StubError::Io("mock history failure".to_string()));
        }
        self.open_iterators.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockHistoryIterator {
            entries: self.history.get(key).cloned().unwrap_or_default(),
            position: 0,
            fail_at: self.fail_history_at,
            closed: false,
            open_iterators: Arc::clone(&self.open_iterators),
        }))
    }
}

struct MockHistoryIterator {
    entries: Vec<KeyModification>,
    position: usize,
    fail_at: Option<usize>,
    closed: bool,
    open_iterators: Arc<AtomicUsize>,
}

impl HistoryIterator for MockHistoryIterator {
    fn has_next(&self) -> bool {
        !self.closed && self.position < self.entries.len()
    }

    fn next(&mut self) -> Result<KeyModification, StubError> {
        if self.closed {
            return Err(StubError::Io("iterator closed".to_string()));
        }
        if self.fail_at == Some(self.position) {
            return Err(StubError::Io(format!(
                "mock iterator failure at entry {}",
                self.position
            )));
        }
        let entry = self
            .entries
            .get(self.position)
            .cloned()
            .ok_or_else(|| StubError::Io("iterator exhausted".to_string()))?;
        self.position += 1;
        Ok(entry)
    }

    fn close(&mut self) -> Result<(), StubError> {
        if !self.closed {
            self.closed = true;
            self.open_iterators.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
