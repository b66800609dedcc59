use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use satledger::classify::{TxInfo, net_amount, subtitles, title};
use satledger::indexer::{BlockCypherClient, FileTransactionCache};
use satledger::ledger::{AccountRegistry, BitcoinTx, TransactionObserver, TransactionStore};
use satledger::storage::FileStore;
use satledger::sync::{HttpConnectivityMonitor, SyncConfig, SyncScheduler};
use satledger::utils::format_btc_amount;

const DEFAULT_INDEXER_URL: &str = "https://api.blockcypher.com/v1/btc/main";

/// Logs a one-line summary for every newly ingested transaction.
struct SummaryLogger {
	registry: Arc<AccountRegistry>,
}

impl TransactionObserver for SummaryLogger {
	fn transaction_received(&self, tx: &BitcoinTx) {
		let accounts = self.registry.accounts();
		let projected = TxInfo::classify(tx, &accounts).without_change();
		if projected.is_empty() {
			// Entirely internal to one account, nothing user-visible moved.
			return;
		}
		info!(
			"{}: {} ({} BTC)",
			tx.txid,
			title(&projected),
			format_btc_amount(net_amount(&projected))
		);
		for line in subtitles(&projected, &accounts) {
			match line.amount {
				Some(amount) => info!("  {} ({} BTC)", line.text, format_btc_amount(amount)),
				None => info!("  {}", line.text),
			}
		}
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting wallet bookkeeping service");

	let data_dir = std::env::var("SATLEDGER_DATA_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|_| PathBuf::from("data"));
	let indexer_url =
		std::env::var("SATLEDGER_INDEXER_URL").unwrap_or_else(|_| DEFAULT_INDEXER_URL.to_string());

	let store = Arc::new(FileStore::new(data_dir.clone()));
	let registry = Arc::new(AccountRegistry::new(store.clone()));
	if let Err(e) = registry.initialize().await {
		error!("Failed to load the ownership registry: {:?}", e);
		return;
	}
	info!("Loaded {} accounts", registry.accounts().len());

	let cache = Arc::new(FileTransactionCache::new(data_dir.join("cache")));
	let indexer_client = Arc::new(BlockCypherClient::new(indexer_url.clone(), cache));
	info!("Created indexer client for {}", indexer_url);

	let connectivity = Arc::new(HttpConnectivityMonitor::start(
		indexer_url,
		Duration::from_secs(15),
	));
	let transactions = Arc::new(TransactionStore::new());
	transactions.subscribe(Arc::new(SummaryLogger {
		registry: registry.clone(),
	}));

	let scheduler = SyncScheduler::new(
		registry.clone(),
		transactions.clone(),
		indexer_client,
		store,
		connectivity,
		SyncConfig::default(),
	);
	scheduler.watch_rebuilds(registry.rebuild_signal());

	for account in registry.accounts() {
		info!(
			"Queueing account {} ({} addresses)",
			account.name(),
			account.all_addresses().len()
		);
		scheduler.queue_account(&account).await;
	}

	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Failed to listen for shutdown signal: {}", e);
	}

	for account in registry.accounts() {
		let synced = match account.last_synchronized() {
			Some(ts) => format!("last synchronized {}", ts),
			None => "never synchronized".to_string(),
		};
		info!(
			"Account {}: {} BTC ({})",
			account.name(),
			format_btc_amount(transactions.account_balance(&account)),
			synced
		);
	}
	scheduler.shutdown();
}
