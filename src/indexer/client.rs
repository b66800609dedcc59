//!
//! HTTP client for the BlockCypher address API.
//!
//! This module provides the async client used to pull full per-address
//! transaction histories from the remote indexer. Successful responses are
//! written through the local cache so the history survives restarts and
//! offline periods. All methods are async and designed for use with Tokio.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::cache::TransactionCache;
use super::types::{FetchError, TxJson};
use crate::ledger::{BitcoinAddress, BitcoinTx};

const TRANSACTIONS_KEY: &str = "txs";
const ERROR_KEY: &str = "error";

/// Fetches per-address transaction history, from network or local cache.
#[async_trait]
pub trait TransactionFetch: Send + Sync {
	/// Fetch the full transaction history from the remote indexer.
	async fn fetch_transactions(
		&self,
		address: &BitcoinAddress,
	) -> Result<Vec<BitcoinTx>, FetchError>;

	/// Best-effort read of the locally cached history. Never fails loudly:
	/// an absent or unreadable cache yields an empty sequence.
	async fn fetch_cached_transactions(&self, address: &BitcoinAddress) -> Vec<BitcoinTx>;
}

/// BlockCypher indexer client.
#[derive(Clone)]
pub struct BlockCypherClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL of the address API, e.g. `https://api.blockcypher.com/v1/btc/main`.
	base_url: String,
	/// Write-through cache for fetched histories.
	cache: Arc<dyn TransactionCache>,
}

impl BlockCypherClient {
	/// Create a new indexer client.
	///
	/// # Arguments
	/// * `base_url` - The HTTP endpoint for the address API.
	/// * `cache` - The local response cache written through on success.
	pub fn new(base_url: String, cache: Arc<dyn TransactionCache>) -> Self {
		let http_client = Client::builder()
			.timeout(Duration::from_secs(30))
			.build()
			.expect("Failed to create HTTP client");

		Self {
			http_client,
			base_url,
			cache,
		}
	}

	fn address_url(&self, address: &BitcoinAddress) -> String {
		format!(
			"{}/addrs/{}/full",
			self.base_url.trim_end_matches('/'),
			address.value
		)
	}

	fn parse_txs(raw: &Value) -> Result<Vec<BitcoinTx>, FetchError> {
		let rows: Vec<TxJson> = serde_json::from_value(raw.clone())?;
		rows.into_iter().map(TxJson::into_tx).collect()
	}
}

#[async_trait]
impl TransactionFetch for BlockCypherClient {
	async fn fetch_transactions(
		&self,
		address: &BitcoinAddress,
	) -> Result<Vec<BitcoinTx>, FetchError> {
		let url = self.address_url(address);
		debug!("GET {}", url);

		let body: Value = self.http_client.get(&url).send().await?.json().await?;
		let object = body
			.as_object()
			.ok_or_else(|| FetchError::Malformed("response is not a JSON object".to_string()))?;
		if let Some(err) = object.get(ERROR_KEY) {
			return Err(FetchError::Indexer(err.to_string()));
		}

		let raw_txs = object
			.get(TRANSACTIONS_KEY)
			.cloned()
			.unwrap_or_else(|| Value::Array(Vec::new()));
		let transactions = Self::parse_txs(&raw_txs)?;
		self.cache.put(&address.value, &raw_txs).await;

		info!(
			"fetched {} transactions for {}",
			transactions.len(),
			address.value
		);
		Ok(transactions)
	}

	async fn fetch_cached_transactions(&self, address: &BitcoinAddress) -> Vec<BitcoinTx> {
		match self.cache.get(&address.value).await {
			Some(raw) => Self::parse_txs(&raw).unwrap_or_default(),
			None => Vec::new(),
		}
	}
}
