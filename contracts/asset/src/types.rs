use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::error::ContractError;
use crate::stub::KeyModification;

/// `Value` placed in a history entry whose ledger event was a deletion.
pub const DELETED_VALUE: &str = "DELETED";

/// The single record managed by the contract, stored under `DEALERID`.
///
/// Amounts are plain `f64`; the contract makes no monetary-exactness promise.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Asset {
    /// Primary key, immutable for the lifetime of the record
    #[serde(rename = "DEALERID")]
    pub dealer_id: String,
    #[serde(rename = "MSISDN")]
    pub msisdn: String,
    /// Stored verbatim; callers treat it as sensitive
    #[serde(rename = "MPIN")]
    pub mpin: String,
    #[serde(rename = "BALANCE")]
    pub balance: f64,
    #[serde(rename = "STATUS")]
    pub status: String,
    /// Amount associated with the latest mutation
    #[serde(rename = "TRANSAMOUNT")]
    pub trans_amount: f64,
    #[serde(rename = "TRANSTYPE")]
    pub trans_type: String,
    #[serde(rename = "REMARKS")]
    pub remarks: String,
}

impl Asset {
    /// Canonical on-ledger encoding.
    pub fn to_json(&self) -> Result<Vec<u8>, ContractError> {
        serde_json::to_vec(self).map_err(|e| ContractError::Encode(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ContractError> {
        serde_json::from_slice(bytes).map_err(|e| ContractError::Decode(e.to_string()))
    }
}

/// One element of the `GetHistoryForAsset` array.
///
/// Members are declared in lexical order so the encoded object lists them
/// the same way a sorted-map encoder would.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    #[serde(rename = "IsDelete")]
    pub is_delete: bool,
    /// RFC 3339, UTC, second precision
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TxId")]
    pub tx_id: String,
    /// Raw stored JSON at this version, or [`DELETED_VALUE`]
    #[serde(rename = "Value")]
    pub value: String,
}

impl HistoryEntry {
    /// Project a runtime key modification into its history entry.
    ///
    /// Fails when a non-deletion entry carries bytes that are not UTF-8.
    pub fn from_modification(modification: KeyModification) -> Result<Self, String> {
        let value = if modification.is_delete {
            DELETED_VALUE.to_string()
        } else {
            String::from_utf8(modification.value)
                .map_err(|e| format!("value at tx {} is not UTF-8: {e}", modification.tx_id))?
        };

        Ok(Self {
            is_delete: modification.is_delete,
            timestamp: modification
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            tx_id: modification.tx_id,
            value,
        })
    }
}
