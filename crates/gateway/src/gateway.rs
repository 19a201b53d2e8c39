//! Client-side entry point to the ledger network.
//!
//! ## Call phases
//!
//! A *submit* is endorsed (the contract is simulated and its read/write set
//! captured), handed to ordering, and then awaited until the ledger reports a
//! commit status. An *evaluate* simulates the contract on one peer and
//! discards the write set. Each phase is bounded by its own deadline from
//! [`Timeouts`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use asset_contract::{Chaincode, ContractError};

use crate::config::Timeouts;
use crate::identity::Identity;
use crate::ledger::{InMemoryLedger, ReadWriteSet, TxValidationCode};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Evaluate,
    Endorse,
    Submit,
    CommitStatus,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Evaluate => "evaluate",
            Phase::Endorse => "endorse",
            Phase::Submit => "submit",
            Phase::CommitStatus => "commit status",
        })
    }
}

/// Errors from a gateway call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("endorsement of {function} failed: {source}")]
    Endorse {
        function: String,
        #[source]
        source: ContractError,
    },
    #[error("evaluation of {function} failed: {source}")]
    Evaluate {
        function: String,
        #[source]
        source: ContractError,
    },
    #[error("transaction {tx_id} failed to commit with status code {code}")]
    Commit {
        tx_id: String,
        code: TxValidationCode,
    },
    #[error("{phase} timed out after {timeout:?}")]
    Timeout { phase: Phase, timeout: Duration },
    #[error("invocation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl GatewayError {
    /// The contract failure behind this error, when the contract itself rejected the call.
    pub fn contract_error(&self) -> Option<&ContractError> {
        match self {
            GatewayError::Endorse { source, .. } | GatewayError::Evaluate { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

// =============================================================================
// Trait: Gateway
// =============================================================================

/// Abstraction over the ledger network for the REST handlers.
pub trait Gateway: Send + Sync + 'static {
    /// Endorse, order and commit a transaction; resolves once it is committed.
    fn submit_transaction(
        &self,
        function: String,
        args: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GatewayError>> + Send + '_>>;

    /// Run a read-only query on a single peer.
    fn evaluate_transaction(
        &self,
        function: String,
        args: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GatewayError>> + Send + '_>>;
}

// =============================================================================
// LocalGateway
// =============================================================================

/// Gateway onto an in-process ledger hosting the asset contract.
pub struct LocalGateway {
    ledger: Arc<InMemoryLedger>,
    chaincode: Chaincode,
    identity: Identity,
    contract: String,
    timeouts: Timeouts,
}

impl LocalGateway {
    pub fn new(
        ledger: Arc<InMemoryLedger>,
        identity: Identity,
        contract: impl Into<String>,
        timeouts: Timeouts,
    ) -> Self {
        let contract = contract.into();
        tracing::info!(
            channel = ledger.channel(),
            contract = %contract,
            msp_id = identity.msp_id(),
            functions = ?Chaincode.functions().collect::<Vec<_>>(),
            "Gateway connected"
        );
        Self {
            ledger,
            chaincode: Chaincode,
            identity,
            contract,
            timeouts,
        }
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    fn phase_timeout(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Evaluate => self.timeouts.evaluate,
            Phase::Endorse => self.timeouts.endorse,
            Phase::Submit => self.timeouts.submit,
            Phase::CommitStatus => self.timeouts.commit_status,
        }
    }

    /// Simulate `function` against committed state on a blocking thread.
    ///
    /// The phase timeout bounds the whole call and is also handed to the
    /// simulation as its deadline, so a contract still running when time is
    /// up fails on its next state access.
    async fn simulate(
        &self,
        phase: Phase,
        tx_id: &str,
        function: String,
        args: Vec<String>,
    ) -> Result<(Vec<u8>, ReadWriteSet), GatewayError> {
        let limit = self.phase_timeout(phase);
        let deadline = Instant::now().checked_add(limit);
        let ledger = Arc::clone(&self.ledger);
        let chaincode = self.chaincode;
        let tx_id = tx_id.to_string();

        let task = tokio::task::spawn_blocking(move || {
            run_chaincode(&ledger, chaincode, phase, &tx_id, deadline, function, &args)
        });

        tokio::time::timeout(limit, task)
            .await
            .map_err(|_| GatewayError::Timeout {
                phase,
                timeout: limit,
            })??
    }

    /// Hand an endorsed read/write set to ordering.
    async fn order(&self, tx_id: &str, rwset: ReadWriteSet) -> Result<(), GatewayError> {
        let ledger = Arc::clone(&self.ledger);
        let tx_id = tx_id.to_string();
        let ordered = tokio::task::spawn_blocking(move || ledger.commit(&tx_id, rwset));
        tokio::time::timeout(self.timeouts.submit, ordered)
            .await
            .map_err(|_| GatewayError::Timeout {
                phase: Phase::Submit,
                timeout: self.timeouts.submit,
            })??;
        Ok(())
    }

    /// Wait for the validation code of an ordered transaction.
    async fn wait_for_commit(&self, tx_id: &str) -> Result<TxValidationCode, GatewayError> {
        tokio::time::timeout(
            self.timeouts.commit_status,
            self.ledger.commit_status(tx_id),
        )
        .await
        .map_err(|_| GatewayError::Timeout {
            phase: Phase::CommitStatus,
            timeout: self.timeouts.commit_status,
        })
    }

    async fn submit(&self, function: String, args: Vec<String>) -> Result<Vec<u8>, GatewayError> {
        let tx_id = self.identity.new_tx_id();
        let (payload, rwset) = self
            .simulate(Phase::Endorse, &tx_id, function.clone(), args)
            .await?;
        if rwset.is_read_only() {
            tracing::debug!(tx_id = %tx_id, function = %function, "submitting without writes");
        }

        self.order(&tx_id, rwset).await?;
        let code = self.wait_for_commit(&tx_id).await?;
        if code != TxValidationCode::Valid {
            return Err(GatewayError::Commit { tx_id, code });
        }

        tracing::info!(
            contract = %self.contract,
            function = %function,
            tx_id = %tx_id,
            "Transaction committed"
        );
        Ok(payload)
    }

    async fn evaluate(&self, function: String, args: Vec<String>) -> Result<Vec<u8>, GatewayError> {
        let tx_id = self.identity.new_tx_id();
        let (payload, _) = self.simulate(Phase::Evaluate, &tx_id, function, args).await?;
        Ok(payload)
    }
}

/// Invoke the contract against a fresh simulation of `ledger`.
fn run_chaincode(
    ledger: &InMemoryLedger,
    chaincode: Chaincode,
    phase: Phase,
    tx_id: &str,
    deadline: Option<Instant>,
    function: String,
    args: &[String],
) -> Result<(Vec<u8>, ReadWriteSet), GatewayError> {
    let mut simulation = ledger.simulate(tx_id, deadline);
    match chaincode.invoke(&mut simulation, &function, args) {
        Ok(payload) => Ok((payload, simulation.into_rwset())),
        Err(source) => Err(match phase {
            Phase::Evaluate => GatewayError::Evaluate { function, source },
            _ => GatewayError::Endorse { function, source },
        }),
    }
}

impl Gateway for LocalGateway {
    fn submit_transaction(
        &self,
        function: String,
        args: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GatewayError>> + Send + '_>> {
        Box::pin(self.submit(function, args))
    }

    fn evaluate_transaction(
        &self,
        function: String,
        args: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GatewayError>> + Send + '_>> {
        Box::pin(self.evaluate(function, args))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use asset_contract::{Asset, ErrorKind, CREATE_ASSET, READ_ASSET, UPDATE_ASSET};

    fn local_gateway() -> LocalGateway {
        LocalGateway::new(
            Arc::new(InMemoryLedger::new("mychannel")),
            Identity::new("Org1MSP", Vec::new()),
            "asset",
            Timeouts::default(),
        )
    }

    fn args(dealer_id: &str, balance: f64) -> Vec<String> {
        vec![
            dealer_id.to_string(),
            "555".to_string(),
            "0000".to_string(),
            balance.to_string(),
            "A".to_string(),
            "0".to_string(),
            "INIT".to_string(),
            "seed".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_submit_then_evaluate() {
        let gateway = local_gateway();
        gateway
            .submit_transaction(CREATE_ASSET.to_string(), args("D1", 100.0))
            .await
            .unwrap();
        assert_eq!(gateway.ledger().height(), 1);

        let bytes = gateway
            .evaluate_transaction(READ_ASSET.to_string(), vec!["D1".to_string()])
            .await
            .unwrap();
        let asset: Asset = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(asset.balance, 100.0);
    }

    #[tokio::test]
    async fn test_evaluate_does_not_commit() {
        let gateway = local_gateway();
        gateway
            .evaluate_transaction(CREATE_ASSET.to_string(), args("D1", 1.0))
            .await
            .unwrap();
        assert_eq!(gateway.ledger().height(), 0);

        let err = gateway
            .evaluate_transaction(READ_ASSET.to_string(), vec!["D1".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.contract_error().map(|e| e.kind()), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_endorsement_failure_preserves_kind() {
        let gateway = local_gateway();
        let err = gateway
            .submit_transaction(UPDATE_ASSET.to_string(), args("D2", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Endorse { .. }));
        assert_eq!(err.contract_error().map(|e| e.kind()), Some(ErrorKind::NotFound));
        assert!(err.to_string().contains("does not exist"));
        assert_eq!(gateway.ledger().height(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_commit_once() {
        let gateway = Arc::new(local_gateway());
        let mut handles = Vec::new();
        for i in 0..8 {
            let gateway = Arc::clone(&gateway);
            handles.push(tokio::spawn(async move {
                gateway
                    .submit_transaction(CREATE_ASSET.to_string(), args("D1", f64::from(i)))
                    .await
            }));
        }

        let mut committed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(GatewayError::Commit { code, .. }) => {
                    assert_eq!(code, TxValidationCode::MvccReadConflict)
                }
                Err(e) => {
                    assert_eq!(e.contract_error().map(|e| e.kind()), Some(ErrorKind::AlreadyExists))
                }
            }
        }
        assert_eq!(committed, 1);
        assert_eq!(gateway.ledger().height(), 1);
    }

    fn gateway_with(timeouts: Timeouts) -> LocalGateway {
        LocalGateway::new(
            Arc::new(InMemoryLedger::new("mychannel")),
            Identity::new("Org1MSP", Vec::new()),
            "asset",
            timeouts,
        )
    }

    fn timeout_phase(err: GatewayError) -> Option<Phase> {
        match err {
            GatewayError::Timeout { phase, .. } => Some(phase),
            _ => None,
        }
    }

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_evaluate_timeout() {
        let gateway = gateway_with(Timeouts {
            evaluate: SHORT,
            ..Timeouts::default()
        });
        let guard = gateway.ledger().lock_exclusive();
        let err = gateway
            .evaluate_transaction(READ_ASSET.to_string(), vec!["D1".to_string()])
            .await
            .unwrap_err();
        drop(guard);
        assert_eq!(timeout_phase(err), Some(Phase::Evaluate));
    }

    #[tokio::test]
    async fn test_endorse_timeout_never_commits() {
        let gateway = gateway_with(Timeouts {
            endorse: SHORT,
            ..Timeouts::default()
        });
        let guard = gateway.ledger().lock_exclusive();
        let err = gateway
            .submit_transaction(CREATE_ASSET.to_string(), args("D1", 1.0))
            .await
            .unwrap_err();
        drop(guard);
        assert_eq!(timeout_phase(err), Some(Phase::Endorse));
        assert_eq!(gateway.ledger().height(), 0);
    }

    #[tokio::test]
    async fn test_submit_timeout_while_ordering_is_blocked() {
        let gateway = gateway_with(Timeouts {
            submit: SHORT,
            ..Timeouts::default()
        });
        // Shared reads let the simulation through but hold back the commit
        let guard = gateway.ledger().lock_shared();
        let err = gateway
            .submit_transaction(CREATE_ASSET.to_string(), args("D1", 1.0))
            .await
            .unwrap_err();
        drop(guard);
        assert_eq!(timeout_phase(err), Some(Phase::Submit));

        // Ordering already accepted the transaction; it still lands
        tokio::time::timeout(Duration::from_secs(5), async {
            while gateway.ledger().height() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_status_timeout() {
        let gateway = gateway_with(Timeouts {
            commit_status: SHORT,
            ..Timeouts::default()
        });
        let err = gateway.wait_for_commit("never-ordered").await.unwrap_err();
        assert_eq!(timeout_phase(err), Some(Phase::CommitStatus));
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_status_waits_for_late_commit() {
        let gateway = gateway_with(Timeouts {
            commit_status: Duration::from_secs(1),
            ..Timeouts::default()
        });
        let ledger = Arc::clone(gateway.ledger());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            ledger.delete_state("late-tx", "D1");
        });
        let code = gateway.wait_for_commit("late-tx").await.unwrap();
        assert_eq!(code, TxValidationCode::Valid);
    }

    #[test]
    fn test_expired_deadline_surfaces_as_state_read() {
        let ledger = InMemoryLedger::new("mychannel");
        let deadline = Some(Instant::now());

        let err = run_chaincode(
            &ledger,
            Chaincode,
            Phase::Endorse,
            "tx1",
            deadline,
            CREATE_ASSET.to_string(),
            &args("D1", 1.0),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Endorse { .. }));
        assert_eq!(err.contract_error().map(|e| e.kind()), Some(ErrorKind::StateRead));
        assert!(err.to_string().contains("deadline"));

        let err = run_chaincode(
            &ledger,
            Chaincode,
            Phase::Evaluate,
            "tx2",
            deadline,
            READ_ASSET.to_string(),
            &["D1".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Evaluate { .. }));
        assert_eq!(err.contract_error().map(|e| e.kind()), Some(ErrorKind::StateRead));
    }
}
