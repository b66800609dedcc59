//! Wire types for the indexer's "full address" endpoint.

use serde::Deserialize;

use crate::ledger::{BitcoinTx, Satoshis, TxInput, TxOutput};

/// Error types for fetch operations.
///
/// A malformed response is handled exactly like a network failure upstream:
/// the scheduler re-queues the address and retries. Nothing here ever
/// surfaces as a hard failure to a caller.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("indexer reported an error: {0}")]
    Indexer(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One transaction as returned by the indexer.
#[derive(Debug, Clone, Deserialize)]
pub struct TxJson {
    pub hash: String,
    #[serde(default)]
    pub inputs: Vec<TxInputJson>,
    #[serde(default)]
    pub outputs: Vec<TxOutputJson>,
}

/// One input row: the value of the output it spends and the addresses that
/// funded it.
#[derive(Debug, Clone, Deserialize)]
pub struct TxInputJson {
    #[serde(default)]
    pub output_value: i64,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// One output row: its value and destination addresses.
#[derive(Debug, Clone, Deserialize)]
pub struct TxOutputJson {
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl TxJson {
    /// Validate the wire row and convert it into the domain transaction.
    pub fn into_tx(self) -> Result<BitcoinTx, FetchError> {
        hex::decode(&self.hash)
            .map_err(|e| FetchError::Malformed(format!("bad txid {}: {}", self.hash, e)))?;
        Ok(BitcoinTx {
            txid: self.hash,
            inputs: self
                .inputs
                .into_iter()
                .map(|input| TxInput {
                    linked_output_value: Satoshis(input.output_value),
                    source_addresses: input.addresses,
                })
                .collect(),
            outputs: self
                .outputs
                .into_iter()
                .map(|output| TxOutput {
                    value: Satoshis(output.value),
                    destination_addresses: output.addresses,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_address_row() {
        let raw = json!({
            "hash": "14b1052855bbf6561bc4db8aa501762e7cc1e86994dda9e782a6b73b1ce0dc1e",
            "inputs": [
                {"output_value": 150_000, "addresses": ["15djifdURkQwpLcfshfZuF6SMcdAAMNTQt"]}
            ],
            "outputs": [
                {"value": 100_000, "addresses": ["19CVKztLHbg6wBpFwGoRwCUmzYEBFocPUf"]},
                {"value": 49_000, "addresses": ["15djifdURkQwpLcfshfZuF6SMcdAAMNTQt"]}
            ]
        });
        let parsed: TxJson = serde_json::from_value(raw).expect("Failed while parsing tx row");
        let tx = parsed.into_tx().expect("Failed while converting tx row");
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].linked_output_value, Satoshis(150_000));
        assert_eq!(tx.outputs.len(), 2);
        assert!(tx.touches("19CVKztLHbg6wBpFwGoRwCUmzYEBFocPUf"));
    }

    #[test]
    fn non_hex_txid_is_a_malformed_response() {
        let parsed: TxJson =
            serde_json::from_value(json!({"hash": "not-hex"})).expect("Failed while parsing");
        assert!(matches!(parsed.into_tx(), Err(FetchError::Malformed(_))));
    }
}
