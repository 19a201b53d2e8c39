//! Request bodies accepted by the REST façade.

use serde::Deserialize;

/// Body of `/create` and `/update`. Absent members take their zero value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetRequest {
    #[serde(rename = "DEALERID")]
    pub dealer_id: String,
    #[serde(rename = "MSISDN")]
    pub msisdn: String,
    #[serde(rename = "MPIN")]
    pub mpin: String,
    #[serde(rename = "BALANCE")]
    pub balance: f64,
    #[serde(rename = "STATUS")]
    pub status: String,
    #[serde(rename = "TRANSAMOUNT")]
    pub trans_amount: f64,
    #[serde(rename = "TRANSTYPE")]
    pub trans_type: String,
    #[serde(rename = "REMARKS")]
    pub remarks: String,
}

impl AssetRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Positional transaction arguments in contract order.
    ///
    /// Amounts are rendered in their shortest round-trip decimal form.
    pub fn into_args(self) -> Vec<String> {
        vec![
            self.dealer_id,
            self.msisdn,
            self.mpin,
            self.balance.to_string(),
            self.status,
            self.trans_amount.to_string(),
            self.trans_type,
            self.remarks,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset_contract::mock::MockStub;
    use asset_contract::{Asset, Chaincode, CREATE_ASSET};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_missing_members_default_to_zero() {
        let request = AssetRequest::from_body(br#"{"DEALERID":"D1"}"#).unwrap();
        assert_eq!(request.dealer_id, "D1");
        assert_eq!(request.balance, 0.0);
        assert!(request.remarks.is_empty());
    }

    #[test]
    fn test_args_are_positional() {
        let request = AssetRequest::from_body(
            br#"{"DEALERID":"D1","MSISDN":"555","MPIN":"1234","BALANCE":50.25,
                 "STATUS":"A","TRANSAMOUNT":12,"TRANSTYPE":"CR","REMARKS":"r"}"#,
        )
        .unwrap();
        assert_eq!(
            request.into_args(),
            ["D1", "555", "1234", "50.25", "A", "12", "CR", "r"]
        );
    }

    #[test]
    fn test_rejects_malformed_body() {
        assert!(AssetRequest::from_body(b"{not json").is_err());
        assert!(AssetRequest::from_body(br#"{"BALANCE":"fifty"}"#).is_err());
        assert!(AssetRequest::from_body(b"").is_err());
    }

    fn finite_amount() -> impl Strategy<Value = f64> {
        any::<f64>().prop_filter("finite", |x| x.is_finite())
    }

    proptest! {
        #[test]
        fn test_body_amounts_reach_the_ledger_unchanged(
            balance in finite_amount(),
            trans_amount in finite_amount()
        ) {
            let body = json!({
                "DEALERID": "D1",
                "BALANCE": balance,
                "TRANSAMOUNT": trans_amount,
            })
            .to_string();
            let request = AssetRequest::from_body(body.as_bytes()).unwrap();

            let mut stub = MockStub::new();
            stub.begin();
            Chaincode
                .invoke(&mut stub, CREATE_ASSET, &request.into_args())
                .unwrap();

            let stored = Asset::from_json(stub.state("D1").unwrap()).unwrap();
            prop_assert_eq!(stored.balance.to_bits(), balance.to_bits());
            prop_assert_eq!(stored.trans_amount.to_bits(), trans_amount.to_bits());
        }
    }
}
