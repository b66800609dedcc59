use super::amount::Satoshis;

/// One spent output feeding a transaction.
///
/// `source_addresses` can hold several values for multi-signature entries;
/// order follows the indexer's response and is significant for
/// classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub linked_output_value: Satoshis,
    pub source_addresses: Vec<String>,
}

/// One output created by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: Satoshis,
    pub destination_addresses: Vec<String>,
}

/// A raw transaction as reported by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcoinTx {
    pub txid: String,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl BitcoinTx {
    /// True when the transaction touches the given address value on either
    /// side.
    pub fn touches(&self, value: &str) -> bool {
        self.inputs
            .iter()
            .any(|i| i.source_addresses.iter().any(|a| a == value))
            || self
                .outputs
                .iter()
                .any(|o| o.destination_addresses.iter().any(|a| a == value))
    }
}
