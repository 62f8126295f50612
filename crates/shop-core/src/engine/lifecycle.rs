//! Background tasks and shutdown for the order engine.
//!
//! Request handling needs no long-lived tasks. The only periodic work is
//! purging expired entries (review links) from storage.

use super::{EngineError, OrderEngine};
use std::time::Duration;

impl OrderEngine {
	/// Performs any initialization required before running.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(
			shop_id = %self.config.shop.id,
			cancellation_window_minutes = self.config.shop.cancellation_window_minutes,
			"Initializing order engine"
		);
		Ok(())
	}

	/// Runs the storage cleanup task until Ctrl-C.
	pub async fn run(&self) -> Result<(), EngineError> {
		let storage = self.storage.clone();
		let cleanup_interval = tokio::time::interval(Duration::from_secs(
			self.config.storage.cleanup_interval_seconds,
		));
		let cleanup_handle = tokio::spawn(async move {
			let mut interval = cleanup_interval;
			loop {
				interval.tick().await;
				match storage.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!("Storage cleanup: removed {} expired entries", count);
					},
					Err(e) => {
						tracing::warn!("Storage cleanup failed: {}", e);
					},
					_ => {},
				}
			}
		});

		let result = tokio::signal::ctrl_c()
			.await
			.map_err(|e| EngineError::UpstreamUnavailable(format!("signal handler: {}", e)));
		tracing::info!("Shutdown signal received");
		cleanup_handle.abort();
		result
	}

	/// Performs cleanup operations.
	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!("Shutting down order engine");
		let removed = self
			.storage
			.cleanup_expired()
			.await
			.map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;
		if removed > 0 {
			tracing::debug!(removed, "Purged expired entries on shutdown");
		}
		Ok(())
	}
}
