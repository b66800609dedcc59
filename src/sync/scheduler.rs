//! The synchronization scheduler.
//!
//! A long-lived loop that keeps every owned address's transaction history
//! current: a shared FIFO queue of addresses is drained one address at a
//! time with a small pacing delay between fetches, failed addresses are
//! re-queued at the tail, and once the queue runs dry the full address set
//! is re-queued after a longer refresh delay, forming the polling cycle.
//!
//! Failures branch on connectivity: while the network is reachable a failed
//! fetch retries at double the pacing delay; while it is not, scheduling is
//! suspended entirely and a single subscription to the connectivity-restored
//! event resumes the drain. All suspension points are non-blocking timers,
//! and every one of them observes the shutdown flag.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::connectivity::Connectivity;
use crate::indexer::TransactionFetch;
use crate::ledger::{Account, AccountId, AccountRegistry, BitcoinAddress, TransactionStore};
use crate::storage::WalletStore;

/// Pacing configuration for the polling loop.
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Delay between consecutive address fetches.
	pub request_delay: Duration,
	/// Delay before the full address set is re-queued once the queue drains.
	pub refresh_delay: Duration,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			request_delay: Duration::from_millis(100),
			refresh_delay: Duration::from_secs(30),
		}
	}
}

#[derive(Default)]
struct QueueState {
	queue: VecDeque<BitcoinAddress>,
	ready_for_refresh: bool,
	waiting_for_connectivity: bool,
}

/// Queue-driven, retrying, connectivity-aware address synchronizer.
pub struct SyncScheduler {
	inner: Arc<Inner>,
}

struct Inner {
	registry: Arc<AccountRegistry>,
	transactions: Arc<TransactionStore>,
	fetcher: Arc<dyn TransactionFetch>,
	store: Arc<dyn WalletStore>,
	connectivity: Arc<dyn Connectivity>,
	config: SyncConfig,
	state: Mutex<QueueState>,
	shutdown: watch::Sender<bool>,
}

impl SyncScheduler {
	pub fn new(
		registry: Arc<AccountRegistry>,
		transactions: Arc<TransactionStore>,
		fetcher: Arc<dyn TransactionFetch>,
		store: Arc<dyn WalletStore>,
		connectivity: Arc<dyn Connectivity>,
		config: SyncConfig,
	) -> Self {
		let (shutdown, _) = watch::channel(false);
		Self {
			inner: Arc::new(Inner {
				registry,
				transactions,
				fetcher,
				store,
				connectivity,
				config,
				state: Mutex::new(QueueState::default()),
				shutdown,
			}),
		}
	}

	/// Queue every address an account controls.
	pub async fn queue_account(&self, account: &Account) {
		self.queue_addresses(account.all_addresses()).await;
	}

	/// Ingest whatever the local cache holds for the addresses, then append
	/// them to the fetch queue and schedule a drain.
	pub async fn queue_addresses(&self, addresses: Vec<BitcoinAddress>) {
		Inner::queue_addresses(&self.inner, addresses).await;
	}

	/// Consume the registry's pool-rebuild signal: each signalled account
	/// gets its full address set re-queued.
	pub fn watch_rebuilds(&self, mut rebuilds: mpsc::UnboundedReceiver<AccountId>) {
		let inner = self.inner.clone();
		tokio::spawn(async move {
			let mut shutdown = inner.shutdown.subscribe();
			if *shutdown.borrow() {
				return;
			}
			loop {
				tokio::select! {
					changed = rebuilds.recv() => {
						let Some(account_id) = changed else { break };
						if let Some(account) = inner.registry.account(account_id) {
							Inner::queue_addresses(&inner, account.all_addresses()).await;
						}
					}
					_ = shutdown.changed() => break,
				}
			}
		});
	}

	/// Stop scheduling further drains and abandon in-flight timers.
	pub fn shutdown(&self) {
		info!("sync scheduler shutting down");
		// send_replace stores the flag even when no timer is subscribed yet.
		self.inner.shutdown.send_replace(true);
	}
}

impl Inner {
	async fn queue_addresses(inner: &Arc<Inner>, addresses: Vec<BitcoinAddress>) {
		debug!("loading {} addresses from cache", addresses.len());
		for address in &addresses {
			for tx in inner.fetcher.fetch_cached_transactions(address).await {
				inner.transactions.ingest(tx);
			}
		}

		info!("queuing {} addresses", addresses.len());
		{
			let mut state = inner.state.lock().unwrap();
			state.queue.extend(addresses);
			if !state.ready_for_refresh && !state.queue.is_empty() {
				state.ready_for_refresh = true;
			}
		}
		Inner::schedule_drain(inner, inner.config.request_delay);
	}

	/// Schedule the next drain attempt. An empty queue with a refresh due
	/// re-queues every owned address after the refresh delay instead.
	fn schedule_drain(inner: &Arc<Inner>, delay: Duration) {
		let inner = inner.clone();
		tokio::spawn(async move {
			let (empty, refresh_due) = {
				let state = inner.state.lock().unwrap();
				(state.queue.is_empty(), state.ready_for_refresh)
			};
			if empty {
				if refresh_due {
					debug!(
						"queue drained, planning refresh in {:?}",
						inner.config.refresh_delay
					);
					if !inner.pause(inner.config.refresh_delay).await {
						return;
					}
					for account in inner.registry.accounts() {
						Inner::queue_addresses(&inner, account.all_addresses()).await;
					}
				}
			} else {
				if !inner.pause(delay).await {
					return;
				}
				Inner::run_queue(&inner).await;
			}
		});
	}

	async fn run_queue(inner: &Arc<Inner>) {
		let address = { inner.state.lock().unwrap().queue.pop_front() };
		let Some(address) = address else {
			return;
		};

		debug!("fetching transactions for {}", address.value);
		match inner.fetcher.fetch_transactions(&address).await {
			Ok(transactions) => {
				debug!(
					"received {} transactions for {}",
					transactions.len(),
					address.value
				);
				for tx in transactions {
					inner.transactions.ingest(tx);
				}

				let now = chrono::Utc::now().timestamp();
				let stamped = inner
					.registry
					.stamp_address(&address.value, now)
					.unwrap_or_else(|| {
						// Address no longer tracked by any account; still
						// report the update to observers.
						let mut address = address.clone();
						address.last_update = Some(now);
						address
					});
				inner.registry.broadcast_address_update(&stamped);
				if let Err(err) = inner.store.update_address_timestamp(&stamped).await {
					warn!(
						"failed to persist update time for {}: {}",
						stamped.value, err
					);
				}
				Inner::schedule_drain(inner, inner.config.request_delay);
			}
			Err(err) => {
				warn!("fetch failed for {}: {}", address.value, err);
				inner.state.lock().unwrap().queue.push_back(address);

				if inner.connectivity.is_connected() {
					// Transient server error: cheap backoff, keep draining.
					Inner::schedule_drain(inner, inner.config.request_delay * 2);
				} else {
					let first_waiter = {
						let mut state = inner.state.lock().unwrap();
						if state.waiting_for_connectivity {
							false
						} else {
							state.waiting_for_connectivity = true;
							true
						}
					};
					if first_waiter {
						info!("offline, suspending sync until connectivity returns");
						let inner = inner.clone();
						tokio::spawn(async move {
							let mut shutdown = inner.shutdown.subscribe();
							if *shutdown.borrow() {
								return;
							}
							tokio::select! {
								_ = inner.connectivity.wait_until_restored() => {
									inner.state.lock().unwrap().waiting_for_connectivity = false;
									info!("connectivity restored, resuming sync");
									Inner::schedule_drain(&inner, inner.config.request_delay);
								}
								_ = shutdown.changed() => {}
							}
						});
					}
				}
			}
		}
	}

	/// Non-blocking suspension; false when shutdown fired meanwhile.
	async fn pause(&self, delay: Duration) -> bool {
		let mut shutdown = self.shutdown.subscribe();
		if *shutdown.borrow() {
			return false;
		}
		tokio::select! {
			_ = tokio::time::sleep(delay) => true,
			_ = shutdown.changed() => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::indexer::FetchError;
	use crate::ledger::{
		AddressObserver, BitcoinTx, OwnedAddress, Satoshis, TxInput, TxOutput,
	};
	use crate::storage::MemoryStore;
	use async_trait::async_trait;
	use std::collections::HashMap;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::sync::Mutex as StdMutex;

	fn tx(txid: &str, inputs: &[(&str, i64)], outputs: &[(&str, i64)]) -> BitcoinTx {
		BitcoinTx {
			txid: txid.to_string(),
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

	/// Scripted fetch collaborator: per-address failure counts, canned
	/// histories, and a record of every attempt.
	#[derive(Default)]
	struct ScriptedFetcher {
		attempts: StdMutex<Vec<String>>,
		successes: StdMutex<Vec<String>>,
		failures_left: StdMutex<HashMap<String, usize>>,
		histories: StdMutex<HashMap<String, Vec<BitcoinTx>>>,
		cached: StdMutex<HashMap<String, Vec<BitcoinTx>>>,
	}

	impl ScriptedFetcher {
		fn fail_first(&self, address: &str, times: usize) {
			self.failures_left
				.lock()
				.unwrap()
				.insert(address.to_string(), times);
		}

		fn with_history(&self, address: &str, txs: Vec<BitcoinTx>) {
			self.histories
				.lock()
				.unwrap()
				.insert(address.to_string(), txs);
		}

		fn with_cached(&self, address: &str, txs: Vec<BitcoinTx>) {
			self.cached.lock().unwrap().insert(address.to_string(), txs);
		}

		fn attempts(&self) -> Vec<String> {
			self.attempts.lock().unwrap().clone()
		}

		fn successes(&self) -> Vec<String> {
			self.successes.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl TransactionFetch for ScriptedFetcher {
		async fn fetch_transactions(
			&self,
			address: &BitcoinAddress,
		) -> Result<Vec<BitcoinTx>, FetchError> {
			self.attempts.lock().unwrap().push(address.value.clone());
			{
				let mut failures = self.failures_left.lock().unwrap();
				if let Some(left) = failures.get_mut(&address.value) {
					if *left > 0 {
						*left -= 1;
						return Err(FetchError::Indexer("scripted failure".to_string()));
					}
				}
			}
			self.successes.lock().unwrap().push(address.value.clone());
			Ok(self
				.histories
				.lock()
				.unwrap()
				.get(&address.value)
				.cloned()
				.unwrap_or_default())
		}

		async fn fetch_cached_transactions(&self, address: &BitcoinAddress) -> Vec<BitcoinTx> {
			self.cached
				.lock()
				.unwrap()
				.get(&address.value)
				.cloned()
				.unwrap_or_default()
		}
	}

	struct TestConnectivity {
		connected: AtomicBool,
		restored: tokio::sync::Notify,
		waits: AtomicUsize,
	}

	impl TestConnectivity {
		fn new(connected: bool) -> Self {
			Self {
				connected: AtomicBool::new(connected),
				restored: tokio::sync::Notify::new(),
				waits: AtomicUsize::new(0),
			}
		}

		fn restore(&self) {
			self.connected.store(true, Ordering::SeqCst);
			self.restored.notify_waiters();
		}
	}

	#[async_trait]
	impl Connectivity for TestConnectivity {
		fn is_connected(&self) -> bool {
			self.connected.load(Ordering::SeqCst)
		}

		async fn wait_until_restored(&self) {
			self.waits.fetch_add(1, Ordering::SeqCst);
			self.restored.notified().await;
		}
	}

	struct Harness {
		registry: Arc<AccountRegistry>,
		transactions: Arc<TransactionStore>,
		fetcher: Arc<ScriptedFetcher>,
		connectivity: Arc<TestConnectivity>,
		scheduler: SyncScheduler,
	}

	async fn harness(connected: bool) -> Harness {
		let store = Arc::new(MemoryStore::new());
		let registry = Arc::new(AccountRegistry::new(store.clone()));
		let transactions = Arc::new(TransactionStore::new());
		let fetcher = Arc::new(ScriptedFetcher::default());
		let connectivity = Arc::new(TestConnectivity::new(connected));
		let scheduler = SyncScheduler::new(
			registry.clone(),
			transactions.clone(),
			fetcher.clone(),
			store,
			connectivity.clone(),
			SyncConfig::default(),
		);
		Harness {
			registry,
			transactions,
			fetcher,
			connectivity,
			scheduler,
		}
	}

	fn addresses(values: &[&str]) -> Vec<BitcoinAddress> {
		values.iter().map(|v| BitcoinAddress::new(*v)).collect()
	}

	#[tokio::test(start_paused = true)]
	async fn fifo_with_retry_to_tail() {
		let h = harness(true).await;
		h.fetcher.fail_first("x", 1);

		h.scheduler.queue_addresses(addresses(&["x", "y", "z"])).await;
		tokio::time::sleep(Duration::from_secs(2)).await;

		assert_eq!(h.fetcher.attempts(), vec!["x", "y", "z", "x"]);
		assert_eq!(h.fetcher.successes(), vec!["y", "z", "x"]);
		h.scheduler.shutdown();
	}

	#[tokio::test(start_paused = true)]
	async fn offline_failure_suspends_until_connectivity_returns() {
		let h = harness(false).await;
		h.fetcher.fail_first("x", 1);
		h.fetcher.fail_first("y", 1);

		h.scheduler.queue_addresses(addresses(&["x"])).await;
		tokio::time::sleep(Duration::from_secs(10)).await;

		// One failed attempt, then nothing: the loop is suspended.
		assert_eq!(h.fetcher.attempts(), vec!["x"]);

		// A second queue submission while offline fails too, but must not
		// stack another connectivity subscription.
		h.scheduler.queue_addresses(addresses(&["y"])).await;
		tokio::time::sleep(Duration::from_secs(10)).await;
		assert_eq!(h.fetcher.attempts(), vec!["x", "y"]);
		assert_eq!(h.connectivity.waits.load(Ordering::SeqCst), 1);

		h.connectivity.restore();
		tokio::time::sleep(Duration::from_secs(2)).await;

		// Draining resumed from the retried addresses.
		assert_eq!(h.fetcher.successes(), vec!["x", "y"]);
		h.scheduler.shutdown();
	}

	#[tokio::test(start_paused = true)]
	async fn success_stamps_broadcasts_and_persists_the_timestamp() {
		struct SeenAddresses(StdMutex<Vec<String>>);
		impl AddressObserver for SeenAddresses {
			fn address_updated(&self, address: &BitcoinAddress) {
				self.0.lock().unwrap().push(address.value.clone());
			}
		}

		let h = harness(true).await;
		let account = Account::new("Account #1");
		h.registry.add_account(account.clone()).await.unwrap();
		h.registry
			.add_address(account.id(), OwnedAddress::new(BitcoinAddress::new("a1")))
			.await
			.unwrap();

		let seen = Arc::new(SeenAddresses(StdMutex::new(Vec::new())));
		h.registry.subscribe_addresses(seen.clone());

		h.fetcher
			.with_history("a1", vec![tx("t1", &[("e1", 100)], &[("a1", 100)])]);
		h.scheduler.queue_addresses(addresses(&["a1"])).await;
		tokio::time::sleep(Duration::from_secs(1)).await;

		assert_eq!(h.transactions.balance_for_address("a1"), Satoshis(100));
		let stored = h.registry.accounts()[0].addresses()[0].address().clone();
		assert!(stored.is_synchronized());
		assert_eq!(*seen.0.lock().unwrap(), vec!["a1"]);
		h.scheduler.shutdown();
	}

	#[tokio::test(start_paused = true)]
	async fn cached_history_is_ingested_before_any_fetch() {
		let h = harness(true).await;
		h.fetcher.fail_first("a1", usize::MAX);
		h.fetcher
			.with_cached("a1", vec![tx("t1", &[("e1", 40)], &[("a1", 40)])]);

		h.scheduler.queue_addresses(addresses(&["a1"])).await;

		// The cached history is visible immediately, before the drain runs.
		assert_eq!(h.transactions.balance_for_address("a1"), Satoshis(40));
		h.scheduler.shutdown();
	}

	#[tokio::test(start_paused = true)]
	async fn drained_queue_requeues_every_owned_address_after_the_refresh_delay() {
		let h = harness(true).await;
		let account = Account::new("Account #1");
		h.registry.add_account(account.clone()).await.unwrap();
		h.registry
			.add_address(account.id(), OwnedAddress::new(BitcoinAddress::new("a1")))
			.await
			.unwrap();
		h.fetcher
			.with_history("a1", vec![tx("t1", &[("e1", 100)], &[("a1", 100)])]);

		h.scheduler.queue_account(&h.registry.accounts()[0]).await;
		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(h.fetcher.successes(), vec!["a1"]);

		// Past the refresh delay the full set is fetched again, and the
		// re-ingested history does not double-count.
		tokio::time::sleep(Duration::from_secs(35)).await;
		assert!(h.fetcher.successes().len() >= 2);
		assert_eq!(h.transactions.balance_for_address("a1"), Satoshis(100));
		h.scheduler.shutdown();
	}

	#[tokio::test(start_paused = true)]
	async fn rebuild_signal_requeues_the_account() {
		let h = harness(true).await;
		let rebuilds = h.registry.rebuild_signal();
		h.scheduler.watch_rebuilds(rebuilds);

		let account = Account::new("Account #1");
		h.registry.add_account(account.clone()).await.unwrap();
		h.registry
			.add_address(account.id(), OwnedAddress::new(BitcoinAddress::new("a1")))
			.await
			.unwrap();

		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(h.fetcher.successes(), vec!["a1"]);
		h.scheduler.shutdown();
	}

	#[tokio::test(start_paused = true)]
	async fn shutdown_stops_further_drains() {
		let h = harness(true).await;
		h.scheduler.queue_addresses(addresses(&["a1", "a2"])).await;
		h.scheduler.shutdown();
		tokio::time::sleep(Duration::from_secs(5)).await;
		assert!(h.fetcher.attempts().is_empty());
	}
}
