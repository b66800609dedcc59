use itertools::Itertools;
use std::collections::BTreeSet;

use crate::ledger::{Account, AccountId, BitcoinTx, Satoshis, Xpub};

/// One classified transaction input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxIo {
    /// The address is not owned by any registered account.
    External { amount: Satoshis, address: String },
    /// The address is explicitly registered under an account.
    Address {
        amount: Satoshis,
        address: String,
        account: AccountId,
    },
    /// The address belongs to an account's key pool.
    Pool {
        amount: Satoshis,
        address: String,
        account: AccountId,
        xpub: Xpub,
    },
}

impl TxIo {
    pub fn amount(&self) -> Satoshis {
        match self {
            TxIo::External { amount, .. }
            | TxIo::Address { amount, .. }
            | TxIo::Pool { amount, .. } => *amount,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            TxIo::External { address, .. }
            | TxIo::Address { address, .. }
            | TxIo::Pool { address, .. } => address,
        }
    }

    pub fn account(&self) -> Option<AccountId> {
        match self {
            TxIo::External { .. } => None,
            TxIo::Address { account, .. } | TxIo::Pool { account, .. } => Some(*account),
        }
    }

    pub fn is_owned(&self) -> bool {
        self.account().is_some()
    }
}

/// A transaction classified against an ownership snapshot.
///
/// Derived, never stored; `involved_accounts` is the union of every account
/// referenced by any classified leg.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxInfo {
    pub inputs: Vec<TxIo>,
    pub outputs: Vec<TxIo>,
    pub involved_accounts: BTreeSet<AccountId>,
}

impl TxInfo {
    /// Classify every input and output of `tx` against the given account
    /// snapshot.
    ///
    /// For an entry carrying several address values, the first value that
    /// resolves to an owned address decides the whole leg; multi-signature
    /// entries are not split. An explicitly owned address wins over a pool
    /// match for the same value.
    pub fn classify(tx: &BitcoinTx, accounts: &[Account]) -> TxInfo {
        let inputs: Vec<TxIo> = tx
            .inputs
            .iter()
            .map(|input| resolve(input.linked_output_value, &input.source_addresses, accounts))
            .collect();
        let outputs: Vec<TxIo> = tx
            .outputs
            .iter()
            .map(|output| resolve(output.value, &output.destination_addresses, accounts))
            .collect();
        let involved_accounts = inputs
            .iter()
            .chain(outputs.iter())
            .filter_map(|io| io.account())
            .collect();
        TxInfo {
            inputs,
            outputs,
            involved_accounts,
        }
    }

    /// The "net of change" projection.
    ///
    /// When exactly one account owns legs in the transaction, every leg it
    /// owns is internal movement (change, or a self-transfer) and is
    /// removed from both sides; the surviving legs are the externally
    /// visible flow. The netted account stays involved while any leg
    /// survives. A transaction entirely internal to one account yields an
    /// empty projection. With zero or several owning accounts the
    /// projection is the transaction unchanged.
    pub fn without_change(&self) -> TxInfo {
        let owners: BTreeSet<AccountId> = self
            .inputs
            .iter()
            .chain(self.outputs.iter())
            .filter_map(|io| io.account())
            .collect();
        let Ok(&owner) = owners.iter().exactly_one() else {
            return self.clone();
        };

        let inputs: Vec<TxIo> = self
            .inputs
            .iter()
            .filter(|io| io.account() != Some(owner))
            .cloned()
            .collect();
        let outputs: Vec<TxIo> = self
            .outputs
            .iter()
            .filter(|io| io.account() != Some(owner))
            .cloned()
            .collect();

        let mut involved_accounts: BTreeSet<AccountId> = inputs
            .iter()
            .chain(outputs.iter())
            .filter_map(|io| io.account())
            .collect();
        if !(inputs.is_empty() && outputs.is_empty()) {
            involved_accounts.insert(owner);
        }

        TxInfo {
            inputs,
            outputs,
            involved_accounts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

fn resolve(amount: Satoshis, candidates: &[String], accounts: &[Account]) -> TxIo {
    for value in candidates {
        for account in accounts {
            if account
                .addresses()
                .iter()
                .any(|a| a.address().value == *value)
            {
                return TxIo::Address {
                    amount,
                    address: value.clone(),
                    account: account.id(),
                };
            }
        }
        for account in accounts {
            if let Some(pool) = account
                .pools()
                .iter()
                .find(|p| p.addresses().iter().any(|a| a.value == *value))
            {
                return TxIo::Pool {
                    amount,
                    address: value.clone(),
                    account: account.id(),
                    xpub: pool.xpub().clone(),
                };
            }
        }
    }
    TxIo::External {
        amount,
        address: candidates.first().cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BitcoinAddress, KeyPool, OwnedAddress, TxInput, TxOutput};

    fn tx(inputs: &[(&str, i64)], outputs: &[(&str, i64)]) -> BitcoinTx {
        BitcoinTx {
            txid: "t".to_string(),
            inputs: inputs
                .iter()
                .map(|(addr, value)| TxInput {
                    linked_output_value: Satoshis(*value),
                    source_addresses: vec![addr.to_string()],
                })
                .collect(),
            outputs: outputs
                .iter()
                .map(|(addr, value)| TxOutput {
                    value: Satoshis(*value),
                    destination_addresses: vec![addr.to_string()],
                })
                .collect(),
        }
    }

    fn account_with_address(name: &str, value: &str) -> Account {
        let mut account = Account::new(name);
        account
            .insert_address(OwnedAddress::new(BitcoinAddress::new(value)))
            .unwrap();
        account
    }

    #[test]
    fn self_transfer_collapses_to_an_empty_projection() {
        let account = account_with_address("Account #1", "a1");
        let accounts = vec![account];

        let info = TxInfo::classify(&tx(&[("a1", 100)], &[("a1", 100)]), &accounts);
        assert_eq!(info.inputs.len(), 1);
        assert_eq!(info.outputs.len(), 1);
        assert_eq!(info.involved_accounts.len(), 1);

        let projected = info.without_change();
        assert_eq!(projected.inputs.len(), 0);
        assert_eq!(projected.outputs.len(), 0);
        assert_eq!(projected.involved_accounts.len(), 0);
    }

    #[test]
    fn spend_to_external_nets_out_the_owned_input() {
        let account = account_with_address("Account #1", "a1");
        let accounts = vec![account.clone()];

        let info = TxInfo::classify(&tx(&[("a1", 100)], &[("e1", 100)]), &accounts);
        let projected = info.without_change();

        assert!(projected.inputs.iter().all(|io| !io.is_owned()));
        assert!(projected.inputs.is_empty());
        assert_eq!(projected.outputs.len(), 1);
        assert!(matches!(&projected.outputs[0], TxIo::External { address, .. } if address == "e1"));
        // The spender is still the party behind the surviving movement.
        assert_eq!(
            projected.involved_accounts.iter().copied().collect::<Vec<_>>(),
            vec![account.id()]
        );
    }

    #[test]
    fn change_output_is_stripped_alongside_the_spent_input() {
        let account = account_with_address("Account #1", "a1");
        let accounts = vec![account];

        let info = TxInfo::classify(
            &tx(&[("a1", 150)], &[("e1", 100), ("a1", 50)]),
            &accounts,
        );
        let projected = info.without_change();
        assert!(projected.inputs.is_empty());
        assert_eq!(projected.outputs.len(), 1);
        assert_eq!(projected.outputs[0].address(), "e1");
    }

    #[test]
    fn transfer_between_two_accounts_keeps_both_sides() {
        let first = account_with_address("Account #1", "a1");
        let second = account_with_address("Account #2", "a2");
        let accounts = vec![first.clone(), second.clone()];

        let info = TxInfo::classify(&tx(&[("a1", 100)], &[("a2", 100)]), &accounts);
        let projected = info.without_change();
        assert_eq!(projected.inputs.len(), 1);
        assert_eq!(projected.outputs.len(), 1);
        assert_eq!(projected.involved_accounts.len(), 2);
    }

    #[test]
    fn pool_addresses_classify_with_their_xpub() {
        let mut account = Account::new("Account #1");
        account
            .insert_pool(KeyPool::new(
                Xpub::new("xpub1"),
                vec![BitcoinAddress::new("p1")],
            ))
            .unwrap();
        let accounts = vec![account.clone()];

        let info = TxInfo::classify(&tx(&[("e1", 100)], &[("p1", 100)]), &accounts);
        match &info.outputs[0] {
            TxIo::Pool { account: id, xpub, .. } => {
                assert_eq!(*id, account.id());
                assert_eq!(xpub, &Xpub::new("xpub1"));
            }
            other => panic!("expected pool classification, got {other:?}"),
        }
    }

    #[test]
    fn first_matching_owned_address_decides_a_multi_address_entry() {
        let account = account_with_address("Account #1", "a1");
        let accounts = vec![account.clone()];

        let multi = BitcoinTx {
            txid: "t".to_string(),
            inputs: vec![TxInput {
                linked_output_value: Satoshis(100),
                source_addresses: vec!["e1".to_string(), "a1".to_string()],
            }],
            outputs: vec![],
        };
        let info = TxInfo::classify(&multi, &accounts);
        // The entry is not split: the matching value labels the whole leg.
        assert_eq!(info.inputs.len(), 1);
        match &info.inputs[0] {
            TxIo::Address { address, account: id, .. } => {
                assert_eq!(address, "a1");
                assert_eq!(*id, account.id());
            }
            other => panic!("expected owned classification, got {other:?}"),
        }
    }

    #[test]
    fn explicit_address_wins_over_a_pool_match() {
        let mut first = Account::new("Account #1");
        first
            .insert_pool(KeyPool::new(
                Xpub::new("xpub1"),
                vec![BitcoinAddress::new("a1")],
            ))
            .unwrap();
        let second = account_with_address("Account #2", "a1");
        // Pool owner is listed first; the explicit registration still wins.
        let accounts = vec![first, second.clone()];

        let info = TxInfo::classify(&tx(&[("a1", 10)], &[]), &accounts);
        assert!(matches!(&info.inputs[0], TxIo::Address { account, .. } if *account == second.id()));
    }

    #[test]
    fn purely_external_transactions_are_untouched() {
        let info = TxInfo::classify(&tx(&[("e1", 100)], &[("e2", 100)]), &[]);
        assert!(info.involved_accounts.is_empty());
        let projected = info.without_change();
        assert_eq!(projected, info);
    }
}
