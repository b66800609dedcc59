//! Ingestion log for fetched transactions.
//!
//! Every transaction returned by the indexer, from network or cache, lands
//! here. The log is keyed by txid: refresh cycles re-fetch complete address
//! histories, and re-ingesting a known transaction must be a no-op so that
//! balances are never double-counted. Account and address balances are
//! derived on demand from the log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::account::Account;
use super::amount::Satoshis;
use super::tx::BitcoinTx;
use super::types::SubscriberId;

/// Observer notified of newly ingested transactions.
pub trait TransactionObserver: Send + Sync {
    fn transaction_received(&self, tx: &BitcoinTx);
}

/// De-duplicated, insertion-ordered transaction log.
pub struct TransactionStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    order: Vec<String>,
    by_txid: HashMap<String, BitcoinTx>,
    observers: Vec<(SubscriberId, Arc<dyn TransactionObserver>)>,
    next_subscriber: u64,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Ingest a transaction. Returns `false` when the txid is already known;
    /// observers are only notified of genuinely new transactions.
    pub fn ingest(&self, tx: BitcoinTx) -> bool {
        let observers: Vec<Arc<dyn TransactionObserver>>;
        {
            let mut state = self.state.lock().unwrap();
            if state.by_txid.contains_key(&tx.txid) {
                return false;
            }
            debug!("ingesting transaction {}", tx.txid);
            state.order.push(tx.txid.clone());
            state.by_txid.insert(tx.txid.clone(), tx.clone());
            observers = state.observers.iter().map(|(_, o)| o.clone()).collect();
        }
        for observer in observers {
            observer.transaction_received(&tx);
        }
        true
    }

    /// Snapshot of the log in ingestion order.
    pub fn transactions(&self) -> Vec<BitcoinTx> {
        let state = self.state.lock().unwrap();
        state
            .order
            .iter()
            .filter_map(|txid| state.by_txid.get(txid).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self, observer: Arc<dyn TransactionObserver>) -> SubscriberId {
        let mut state = self.state.lock().unwrap();
        let id = SubscriberId(state.next_subscriber);
        state.next_subscriber += 1;
        state.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut state = self.state.lock().unwrap();
        state.observers.retain(|(sid, _)| *sid != id);
    }

    /// Net amount the log attributes to one address value: outputs paying it
    /// minus inputs spending from it.
    pub fn balance_for_address(&self, value: &str) -> Satoshis {
        let state = self.state.lock().unwrap();
        let mut balance = Satoshis::ZERO;
        for txid in &state.order {
            let Some(tx) = state.by_txid.get(txid) else {
                continue;
            };
            for output in &tx.outputs {
                if output.destination_addresses.iter().any(|a| a == value) {
                    balance += output.value;
                }
            }
            for input in &tx.inputs {
                if input.source_addresses.iter().any(|a| a == value) {
                    balance += -input.linked_output_value;
                }
            }
        }
        balance
    }

    /// Sum of the balances of every address the account controls.
    pub fn account_balance(&self, account: &Account) -> Satoshis {
        account
            .all_addresses()
            .iter()
            .map(|a| self.balance_for_address(&a.value))
            .sum()
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::new()
    }
}
