//! Asset contract: ledger-resident code that owns the `Asset` record.
//!
//! Records live in world state under their `DEALERID`. Creation and update
//! are gated on the key's existence; every committed mutation is visible
//! through the ledger's per-key history, which `GetHistoryForAsset` projects
//! into a JSON array.
//!
//! The contract is stateless: each operation runs against the
//! [`TransactionContext`] supplied by the runtime for that invocation.

mod dispatch;
mod error;
mod stub;
mod types;

#[cfg(any(test, feature = "testing"))]
pub mod mock;

pub use dispatch::{
    Chaincode, ASSET_EXISTS, CREATE_ASSET, GET_HISTORY_FOR_ASSET, READ_ASSET, UPDATE_ASSET,
};
pub use error::{ContractError, ErrorKind};
pub use stub::{ChaincodeStub, HistoryIterator, KeyModification, StubError, TransactionContext};
pub use types::{Asset, HistoryEntry, DELETED_VALUE};

use stub::ScopedHistory;

pub struct AssetContract;

impl AssetContract {
    /// Store a new asset. Fails with `AlreadyExists` if the key is present.
    pub fn create_asset(
        ctx: &mut TransactionContext<'_>,
        asset: Asset,
    ) -> Result<(), ContractError> {
        if Self::asset_exists(ctx, &asset.dealer_id)? {
            return Err(ContractError::AlreadyExists(asset.dealer_id));
        }
        Self::put_asset(ctx, &asset)?;
        tracing::debug!(dealer_id = %asset.dealer_id, tx_id = ctx.tx_id(), "asset created");
        Ok(())
    }

    /// Replace an existing asset wholesale. Fails with `NotFound` if absent.
    pub fn update_asset(
        ctx: &mut TransactionContext<'_>,
        asset: Asset,
    ) -> Result<(), ContractError> {
        if !Self::asset_exists(ctx, &asset.dealer_id)? {
            return Err(ContractError::NotFound(asset.dealer_id));
        }
        Self::put_asset(ctx, &asset)?;
        tracing::debug!(dealer_id = %asset.dealer_id, tx_id = ctx.tx_id(), "asset updated");
        Ok(())
    }

    pub fn read_asset(
        ctx: &mut TransactionContext<'_>,
        dealer_id: &str,
    ) -> Result<Asset, ContractError> {
        let bytes = Self::get_present(ctx, dealer_id)?
            .ok_or_else(|| ContractError::NotFound(dealer_id.to_string()))?;
        Asset::from_json(&bytes)
    }

    /// Existence probe. A missing key is `Ok(false)`; only runtime failures error.
    pub fn asset_exists(
        ctx: &mut TransactionContext<'_>,
        dealer_id: &str,
    ) -> Result<bool, ContractError> {
        Ok(Self::get_present(ctx, dealer_id)?.is_some())
    }

    /// Chronological history of `dealer_id` as a JSON array string.
    ///
    /// Either the full array is produced or the call fails; an iterator error
    /// part-way through discards everything collected so far.
    pub fn get_history_for_asset(
        ctx: &mut TransactionContext<'_>,
        dealer_id: &str,
    ) -> Result<String, ContractError> {
        require_key(dealer_id)?;
        let history_err = |reason: String| ContractError::HistoryIteration {
            key: dealer_id.to_string(),
            reason,
        };

        let iterator = ctx
            .stub()
            .get_history_for_key(dealer_id)
            .map_err(|e| history_err(e.to_string()))?;
        let mut iterator = ScopedHistory::new(iterator, dealer_id);

        let mut history: Vec<HistoryEntry> = Vec::new();
        while iterator.has_next() {
            let modification = iterator.next().map_err(|e| history_err(e.to_string()))?;
            history.push(HistoryEntry::from_modification(modification).map_err(history_err)?);
        }

        tracing::debug!(dealer_id, entries = history.len(), "history projected");
        serde_json::to_string(&history).map_err(|e| ContractError::Encode(e.to_string()))
    }

    /// Fetch the raw value for `key`, treating a zero-length value as absent.
    fn get_present(
        ctx: &mut TransactionContext<'_>,
        key: &str,
    ) -> Result<Option<Vec<u8>>, ContractError> {
        require_key(key)?;
        let value = ctx
            .stub()
            .get_state(key)
            .map_err(|e| ContractError::StateRead(e.to_string()))?;
        Ok(value.filter(|bytes| !bytes.is_empty()))
    }

    fn put_asset(ctx: &mut TransactionContext<'_>, asset: &Asset) -> Result<(), ContractError> {
        require_key(&asset.dealer_id)?;
        let bytes = asset.to_json()?;
        ctx.stub()
            .put_state(&asset.dealer_id, bytes)
            .map_err(|e| ContractError::StateWrite(e.to_string()))
    }
}

/// Every state key is a non-empty `DEALERID`.
fn require_key(dealer_id: &str) -> Result<&str, ContractError> {
    if dealer_id.is_empty() {
        return Err(ContractError::InvalidArgument(
            "DEALERID must not be empty".to_string(),
        ));
    }
    Ok(dealer_id)
}
