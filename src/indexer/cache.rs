//!
//! Local response cache for fetched transaction histories.
//!
//! The cache is strictly best-effort: reads of missing or corrupt entries
//! yield nothing, and write failures are logged and swallowed. It exists so
//! that freshly queued addresses can show their last known history
//! immediately, before the network round trip completes.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::warn;

/// Best-effort store for raw per-address transaction payloads.
#[async_trait]
pub trait TransactionCache: Send + Sync {
	/// Store the raw `txs` payload for an address value.
	async fn put(&self, key: &str, raw: &Value);

	/// Read a previously stored payload. Missing or unreadable entries
	/// yield `None`.
	async fn get(&self, key: &str) -> Option<Value>;
}

/// File-per-address cache under a directory.
///
/// Address values are base58/bech32 strings and are safe as file names.
pub struct FileTransactionCache {
	dir: PathBuf,
}

impl FileTransactionCache {
	pub fn new(dir: PathBuf) -> Self {
		Self { dir }
	}

	fn entry_path(&self, key: &str) -> PathBuf {
		self.dir.join(format!("{key}.json"))
	}

	async fn write(&self, key: &str, raw: &Value) -> std::io::Result<()> {
		tokio::fs::create_dir_all(&self.dir).await?;
		let content = serde_json::to_string(raw).map_err(std::io::Error::other)?;
		tokio::fs::write(self.entry_path(key), content).await
	}
}

#[async_trait]
impl TransactionCache for FileTransactionCache {
	async fn put(&self, key: &str, raw: &Value) {
		if let Err(err) = self.write(key, raw).await {
			warn!("failed to cache transactions for {}: {}", key, err);
		}
	}

	async fn get(&self, key: &str) -> Option<Value> {
		let content = tokio::fs::read_to_string(self.entry_path(key)).await.ok()?;
		serde_json::from_str(&content).ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[tokio::test]
	async fn roundtrips_a_payload_per_key() {
		let dir = tempfile::tempdir().expect("tempdir");
		let cache = FileTransactionCache::new(dir.path().to_path_buf());

		let payload = json!([{"hash": "ff", "inputs": [], "outputs": []}]);
		cache.put("15djifdURkQwpLcfshfZuF6SMcdAAMNTQt", &payload).await;

		assert_eq!(
			cache.get("15djifdURkQwpLcfshfZuF6SMcdAAMNTQt").await,
			Some(payload)
		);
		assert_eq!(cache.get("unknown").await, None);
	}

	#[tokio::test]
	async fn corrupt_entries_read_as_missing() {
		let dir = tempfile::tempdir().expect("tempdir");
		let cache = FileTransactionCache::new(dir.path().to_path_buf());

		tokio::fs::write(dir.path().join("bad.json"), "{not json")
			.await
			.unwrap();
		assert_eq!(cache.get("bad").await, None);
	}
}
