//! Synchronization of owned addresses against the remote indexer.
//!
//! The [`SyncScheduler`] drains a shared FIFO queue of addresses with
//! pacing, retry and connectivity awareness, and periodically re-queues the
//! full owned set so balances stay current even for transactions this
//! wallet did not initiate. [`Connectivity`] is the reachability seam; the
//! [`HttpConnectivityMonitor`] is the probe-based implementation the
//! service binary uses.

/// Reachability seam and probe-based monitor
pub mod connectivity;
/// The queue-driven polling scheduler
pub mod scheduler;

pub use connectivity::{Connectivity, HttpConnectivityMonitor};
pub use scheduler::{SyncConfig, SyncScheduler};
