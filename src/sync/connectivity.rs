//! Network reachability awareness for the sync scheduler.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Reachability of the remote indexer.
#[async_trait]
pub trait Connectivity: Send + Sync {
	/// Current best-effort connectivity judgement.
	fn is_connected(&self) -> bool;

	/// Resolve once connectivity is available again. Each call observes at
	/// most one restoration; if already connected it resolves immediately.
	async fn wait_until_restored(&self);
}

/// Tracks reachability by probing a URL on a fixed interval.
///
/// The probe result only feeds a watch channel; no response body is read.
/// Any HTTP response at all counts as "connected", since even an error
/// status proves the network path is up.
pub struct HttpConnectivityMonitor {
	connected: watch::Receiver<bool>,
}

impl HttpConnectivityMonitor {
	pub fn start(probe_url: String, interval: Duration) -> Self {
		let http_client = reqwest::Client::builder()
			.timeout(Duration::from_secs(10))
			.build()
			.expect("Failed to create HTTP client");
		let (tx, rx) = watch::channel(true);

		tokio::spawn(async move {
			loop {
				let up = match http_client.head(&probe_url).send().await {
					Ok(_) => true,
					Err(err) => {
						debug!("connectivity probe failed: {}", err);
						false
					}
				};
				if tx.send(up).is_err() {
					// Monitor dropped, stop probing.
					break;
				}
				tokio::time::sleep(interval).await;
			}
		});

		Self { connected: rx }
	}
}

#[async_trait]
impl Connectivity for HttpConnectivityMonitor {
	fn is_connected(&self) -> bool {
		*self.connected.borrow()
	}

	async fn wait_until_restored(&self) {
		let mut rx = self.connected.clone();
		loop {
			if *rx.borrow_and_update() {
				return;
			}
			if rx.changed().await.is_err() {
				return;
			}
		}
	}
}
