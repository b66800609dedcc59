use crate::storage::StorageError;

/// Handle returned at subscription time; removal is by id, never by
/// comparing observer instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub(crate) u64);

/// Errors surfaced by ownership-registry mutations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The address value is already registered under this account.
    #[error("address already owned by this account")]
    AddressAlreadyOwned,

    /// The extended public key is already registered under this account.
    #[error("xpub already owned by this account")]
    XpubAlreadyOwned,

    /// The target account is not present in the registry.
    #[error("unknown account")]
    UnknownAccount,

    /// Persistence failed; the triggering mutation was not applied.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
