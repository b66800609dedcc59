use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Textual form of an on-chain address value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressKind {
    /// Bech32 or bech32m encoding with its human-readable part ("bc", "tb", ...).
    Bech32 { hrp: String },
    /// Legacy base58check form (anything that does not decode as bech32).
    Base58,
}

/// A tracked on-chain address.
///
/// `last_update` is set only after a successful fetch of the address's
/// transaction history; `None` means the address has never been
/// synchronized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinAddress {
    pub value: String,
    pub last_update: Option<i64>,
}

impl BitcoinAddress {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            last_update: None,
        }
    }

    /// Classify the textual form of the address value.
    pub fn kind(&self) -> AddressKind {
        match bech32::decode(&self.value) {
            Ok((hrp, _)) => AddressKind::Bech32 {
                hrp: hrp.as_str().to_string(),
            },
            Err(_) => AddressKind::Base58,
        }
    }

    pub fn is_synchronized(&self) -> bool {
        self.last_update.is_some()
    }
}

// Identity is the address value; the update timestamp is mutable metadata.
impl PartialEq for BitcoinAddress {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for BitcoinAddress {}

impl Hash for BitcoinAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for BitcoinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::{Bech32, Hrp};

    #[test]
    fn test_kind_detection() {
        let encoded = bech32::encode::<Bech32>(
            Hrp::parse("bc").expect("Failed while bech32 parsing"),
            &[1, 2, 3],
        )
        .expect("Failed while bech32 encoding");
        let address = BitcoinAddress::new(encoded);
        assert_eq!(
            address.kind(),
            AddressKind::Bech32 {
                hrp: "bc".to_string()
            }
        );

        let legacy = BitcoinAddress::new("15djifdURkQwpLcfshfZuF6SMcdAAMNTQt");
        assert_eq!(legacy.kind(), AddressKind::Base58);
    }

    #[test]
    fn equality_ignores_update_timestamp() {
        let mut a = BitcoinAddress::new("15djifdURkQwpLcfshfZuF6SMcdAAMNTQt");
        let b = BitcoinAddress::new("15djifdURkQwpLcfshfZuF6SMcdAAMNTQt");
        a.last_update = Some(1_700_000_000);
        assert_eq!(a, b);
        assert!(a.is_synchronized());
        assert!(!b.is_synchronized());
    }
}
