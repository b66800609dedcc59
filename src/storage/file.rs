use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;

use super::store::{AddressOwner, StorageError, WalletStore};
use crate::ledger::{Account, AccountId, BitcoinAddress, Xpub};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
	id: AccountId,
	name: String,
	created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyPoolRecord {
	xpub: Xpub,
	account_id: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AddressRecord {
	value: String,
	last_update: Option<i64>,
	account_id: Option<AccountId>,
	xpub: Option<Xpub>,
}

impl AddressRecord {
	fn to_address(&self) -> BitcoinAddress {
		BitcoinAddress {
			value: self.value.clone(),
			last_update: self.last_update,
		}
	}
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WalletDocument {
	accounts: Vec<AccountRecord>,
	key_pools: Vec<KeyPoolRecord>,
	addresses: Vec<AddressRecord>,
}

/// File-based implementation of [`WalletStore`].
///
/// The whole registry is persisted as one JSON document mirroring the
/// relational shape (accounts, key pools, addresses with owner references).
/// Writers are serialized through a lock so concurrent inserts cannot
/// interleave their read-modify-write cycles.
pub struct FileStore {
	path: PathBuf,
	write_lock: Mutex<()>,
}

impl FileStore {
	pub fn new(data_dir: PathBuf) -> Self {
		Self {
			path: data_dir.join("wallet.json"),
			write_lock: Mutex::new(()),
		}
	}

	async fn load(&self) -> Result<WalletDocument, StorageError> {
		if !self.path.exists() {
			return Ok(WalletDocument::default());
		}
		let content = tokio::fs::read_to_string(&self.path).await?;
		Ok(serde_json::from_str(&content)?)
	}

	async fn save(&self, document: &WalletDocument) -> Result<(), StorageError> {
		if let Some(parent) = self.path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		let content = serde_json::to_string_pretty(document)?;
		tokio::fs::write(&self.path, content).await?;
		Ok(())
	}
}

#[async_trait]
impl WalletStore for FileStore {
	async fn get_accounts(&self) -> Result<Vec<Account>, StorageError> {
		let document = self.load().await?;
		Ok(document
			.accounts
			.iter()
			.map(|r| Account::with_id(r.id, r.name.clone(), r.created_at))
			.collect())
	}

	async fn get_addresses(
		&self,
		account: &AccountId,
	) -> Result<Vec<BitcoinAddress>, StorageError> {
		let document = self.load().await?;
		Ok(document
			.addresses
			.iter()
			.filter(|r| r.account_id.as_ref() == Some(account))
			.map(AddressRecord::to_address)
			.collect())
	}

	async fn get_key_pools(&self, account: &AccountId) -> Result<Vec<Xpub>, StorageError> {
		let document = self.load().await?;
		Ok(document
			.key_pools
			.iter()
			.filter(|r| r.account_id == *account)
			.map(|r| r.xpub.clone())
			.collect())
	}

	async fn get_pool_addresses(&self, xpub: &Xpub) -> Result<Vec<BitcoinAddress>, StorageError> {
		let document = self.load().await?;
		Ok(document
			.addresses
			.iter()
			.filter(|r| r.xpub.as_ref() == Some(xpub))
			.map(AddressRecord::to_address)
			.collect())
	}

	async fn insert_account(&self, account: &Account) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let mut document = self.load().await?;
		document.accounts.push(AccountRecord {
			id: account.id(),
			name: account.name().to_string(),
			created_at: account.created_at(),
		});
		self.save(&document).await?;
		info!("saved account {} to {:?}", account.id(), self.path);
		Ok(())
	}

	async fn insert_key_pool(&self, xpub: &Xpub, account: &AccountId) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let mut document = self.load().await?;
		document.key_pools.push(KeyPoolRecord {
			xpub: xpub.clone(),
			account_id: *account,
		});
		self.save(&document).await
	}

	async fn insert_address(
		&self,
		address: &BitcoinAddress,
		owner: AddressOwner<'_>,
	) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let mut document = self.load().await?;
		let (account_id, xpub) = match owner {
			AddressOwner::Account(id) => (Some(*id), None),
			AddressOwner::Pool(xpub) => (None, Some(xpub.clone())),
		};
		document.addresses.push(AddressRecord {
			value: address.value.clone(),
			last_update: address.last_update,
			account_id,
			xpub,
		});
		self.save(&document).await
	}

	async fn update_address_timestamp(
		&self,
		address: &BitcoinAddress,
	) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let mut document = self.load().await?;
		for record in &mut document.addresses {
			if record.value == address.value {
				record.last_update = address.last_update;
			}
		}
		self.save(&document).await
	}
}
