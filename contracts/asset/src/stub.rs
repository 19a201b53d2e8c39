//! Interface the ledger runtime hands to the contract on every invocation.
//!
//! The contract never holds state of its own: world-state reads, writes and
//! per-key history all go through a [`ChaincodeStub`] scoped to one
//! transaction.

use chrono::{DateTime, Utc};

/// Runtime-side failure of a state interaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StubError {
    #[error("ledger I/O failure: {0}")]
    Io(String),
    #[error("transaction deadline exceeded")]
    DeadlineExceeded,
}

/// A single committed change to a key, as reported by the history iterator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyModification {
    pub tx_id: String,
    /// Empty when `is_delete` is set
    pub value: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub is_delete: bool,
}

/// Cursor over the committed history of one key, oldest first.
pub trait HistoryIterator {
    fn has_next(&self) -> bool;

    fn next(&mut self) -> Result<KeyModification, StubError>;

    /// Release the cursor. Calling it more than once is a no-op.
    fn close(&mut self) -> Result<(), StubError>;
}

/// Key/value access for a single transaction.
pub trait ChaincodeStub {
    fn tx_id(&self) -> &str;

    /// `Ok(None)` means the key is absent; only runtime failures are errors.
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, StubError>;

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StubError>;

    fn get_history_for_key(
        &mut self,
        key: &str,
    ) -> Result<Box<dyn HistoryIterator + '_>, StubError>;
}

/// Per-invocation context passed to every contract operation.
pub struct TransactionContext<'a> {
    stub: &'a mut dyn ChaincodeStub,
}

impl<'a> TransactionContext<'a> {
    pub fn new(stub: &'a mut dyn ChaincodeStub) -> Self {
        Self { stub }
    }

    pub fn tx_id(&self) -> &str {
        self.stub.tx_id()
    }

    pub fn stub(&mut self) -> &mut dyn ChaincodeStub {
        &mut *self.stub
    }
}

/// Closes the wrapped iterator when dropped, so every exit path releases it.
pub(crate) struct ScopedHistory<'a> {
    inner: Box<dyn HistoryIterator + 'a>,
    key: String,
}

impl<'a> ScopedHistory<'a> {
    pub(crate) fn new(inner: Box<dyn HistoryIterator + 'a>, key: &str) -> Self {
        Self {
            inner,
            key: key.to_string(),
        }
    }

    pub(crate) fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    pub(crate) fn next(&mut self) -> Result<KeyModification, StubError> {
        self.inner.next()
    }
}

impl Drop for ScopedHistory<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            tracing::warn!(key = %self.key, error = %e, "failed to close history iterator");
        }
    }
}
