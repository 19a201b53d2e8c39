//! Operation-name dispatch for the asset contract.
//!
//! The runtime delivers each transaction as an operation name plus string
//! arguments; [`Chaincode::invoke`] routes it through a static table and
//! returns the payload bytes handed back to the caller.

use crate::error::ContractError;
use crate::stub::{ChaincodeStub, TransactionContext};
use crate::types::Asset;
use crate::AssetContract;

pub const CREATE_ASSET: &str = "CreateAsset";
pub const UPDATE_ASSET: &str = "UpdateAsset";
pub const READ_ASSET: &str = "ReadAsset";
pub const GET_HISTORY_FOR_ASSET: &str = "GetHistoryForAsset";
pub const ASSET_EXISTS: &str = "AssetExists";

/// Arguments taken by `CreateAsset` / `UpdateAsset`, in order.
const ASSET_ARITY: usize = 8;

type Handler = fn(&mut TransactionContext<'_>, &[String]) -> Result<Vec<u8>, ContractError>;

const ROUTES: &[(&str, Handler)] = &[
    (CREATE_ASSET, create_asset),
    (UPDATE_ASSET, update_asset),
    (READ_ASSET, read_asset),
    (GET_HISTORY_FOR_ASSET, get_history_for_asset),
    (ASSET_EXISTS, asset_exists),
];

/// Entry point the ledger runtime calls for every transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chaincode;

impl Chaincode {
    /// Names of every registered operation.
    pub fn functions(&self) -> impl Iterator<Item = &'static str> {
        ROUTES.iter().map(|(name, _)| *name)
    }

    pub fn invoke(
        &self,
        stub: &mut dyn ChaincodeStub,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        let Some((_, handler)) = ROUTES.iter().find(|(name, _)| *name == function) else {
            return Err(ContractError::UnknownFunction(function.to_string()));
        };

        let mut ctx = TransactionContext::new(stub);
        let result = handler(&mut ctx, args);
        if let Err(e) = &result {
            tracing::debug!(
                function,
                tx_id = ctx.tx_id(),
                kind = %e.kind(),
                error = %e,
                "invocation failed"
            );
        }
        result
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn create_asset(
    ctx: &mut TransactionContext<'_>,
    args: &[String],
) -> Result<Vec<u8>, ContractError> {
    let asset = asset_from_args(args)?;
    AssetContract::create_asset(ctx, asset)?;
    Ok(Vec::new())
}

fn update_asset(
    ctx: &mut TransactionContext<'_>,
    args: &[String],
) -> Result<Vec<u8>, ContractError> {
    let asset = asset_from_args(args)?;
    AssetContract::update_asset(ctx, asset)?;
    Ok(Vec::new())
}

fn read_asset(
    ctx: &mut TransactionContext<'_>,
    args: &[String],
) -> Result<Vec<u8>, ContractError> {
    let dealer_id = single_key(args)?;
    AssetContract::read_asset(ctx, dealer_id)?.to_json()
}

fn get_history_for_asset(
    ctx: &mut TransactionContext<'_>,
    args: &[String],
) -> Result<Vec<u8>, ContractError> {
    let dealer_id = single_key(args)?;
    AssetContract::get_history_for_asset(ctx, dealer_id).map(String::into_bytes)
}

fn asset_exists(
    ctx: &mut TransactionContext<'_>,
    args: &[String],
) -> Result<Vec<u8>, ContractError> {
    let dealer_id = single_key(args)?;
    let exists = AssetContract::asset_exists(ctx, dealer_id)?;
    serde_json::to_vec(&exists).map_err(|e| ContractError::Encode(e.to_string()))
}

// =============================================================================
// Argument parsing
// =============================================================================

fn single_key(args: &[String]) -> Result<&str, ContractError> {
    match args {
        [dealer_id] => Ok(dealer_id),
        _ => Err(ContractError::InvalidArgument(format!(
            "expected 1 argument, got {}",
            args.len()
        ))),
    }
}

/// Build an [`Asset`] from the eight positional arguments of create/update.
fn asset_from_args(args: &[String]) -> Result<Asset, ContractError> {
    let [dealer_id, msisdn, mpin, balance, status, trans_amount, trans_type, remarks] = args else {
        return Err(ContractError::InvalidArgument(format!(
            "expected {ASSET_ARITY} arguments, got {}",
            args.len()
        )));
    };

    Ok(Asset {
        dealer_id: dealer_id.clone(),
        msisdn: msisdn.clone(),
        mpin: mpin.clone(),
        balance: parse_amount("BALANCE", balance)?,
        status: status.clone(),
        trans_amount: parse_amount("TRANSAMOUNT", trans_amount)?,
        trans_type: trans_type.clone(),
        remarks: remarks.clone(),
    })
}

/// Parse a signed decimal real. Non-finite values are rejected.
pub(crate) fn parse_amount(field: &str, raw: &str) -> Result<f64, ContractError> {
    let value: f64 = raw.trim().parse().map_err(|e| {
        ContractError::InvalidArgument(format!(
            "{field} must be a decimal number, got {raw:?}: {e}"
        ))
    })?;
    if !value.is_finite() {
        return Err(ContractError::InvalidArgument(format!(
            "{field} must be finite, got {raw:?}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("100", 100.0)]
    #[case("100.000000", 100.0)]
    #[case("-42.5", -42.5)]
    #[case("+7", 7.0)]
    #[case("0.1", 0.1)]
    #[case("1e3", 1000.0)]
    #[case(" 12.25 ", 12.25)]
    fn test_parse_amount_accepts_decimals(#[case] raw: &str, #[case] expected: f64) {
        assert_eq!(parse_amount("BALANCE", raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("1,000")]
    #[case("NaN")]
    #[case("inf")]
    #[case("-infinity")]
    #[case("1e400")]
    fn test_parse_amount_rejects(#[case] raw: &str) {
        let err = parse_amount("BALANCE", raw).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    proptest! {
        #[test]
        fn test_rendered_amount_parses_back_exactly(
            x in any::<f64>().prop_filter("finite", |x| x.is_finite())
        ) {
            let parsed = parse_amount("BALANCE", &x.to_string()).unwrap();
            prop_assert_eq!(parsed.to_bits(), x.to_bits());
        }
    }

    #[test]
    fn test_registered_functions() {
        let names: Vec<&str> = Chaincode.functions().collect();
        assert_eq!(
            names,
            vec![CREATE_ASSET, UPDATE_ASSET, READ_ASSET, GET_HISTORY_FOR_ASSET, ASSET_EXISTS]
        );
    }

    #[test]
    fn test_asset_from_args_wrong_arity() {
        let args: Vec<String> = vec!["D1".to_string(), "555".to_string()];
        let err = asset_from_args(&args).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("expected 8 arguments, got 2"));
    }
}
