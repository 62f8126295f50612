//! Builder for assembling an `OrderEngine` from configuration.
//!
//! Storage and notification backends are chosen by name from factory maps,
//! so the service binary decides which implementations are available and the
//! configuration decides which one is primary.

use crate::engine::OrderEngine;
use crate::state::{StoredCatalogRepository, StoredOrderRepository};
use shop_config::Config;
use shop_notify::{NotificationService, NotifierInterface, NotifyError, TemplateContext};
use shop_storage::{StorageError, StorageInterface, StorageService};
use shop_types::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while assembling the engine.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by config name.
pub struct ShopFactories<SF, NF> {
	pub storage_factories: HashMap<String, SF>,
	pub notifier_factories: HashMap<String, NF>,
}

/// Builds an `OrderEngine` with pluggable implementations.
pub struct ShopBuilder {
	config: Config,
	clock: Arc<dyn Clock>,
}

impl ShopBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			clock: Arc::new(SystemClock),
		}
	}

	/// Replaces the wall clock, for deterministic tests.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn build<SF, NF>(self, factories: ShopFactories<SF, NF>) -> Result<OrderEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		NF: Fn(&toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError>,
	{
		let storage_backend = {
			let storage = &self.config.storage;
			let config = storage.implementations.get(&storage.primary).ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary storage '{}' has no configuration",
					storage.primary
				))
			})?;
			let factory = factories
				.storage_factories
				.get(&storage.primary)
				.ok_or_else(|| {
					BuilderError::MissingComponent(format!(
						"storage implementation '{}'",
						storage.primary
					))
				})?;
			match factory(config) {
				Ok(implementation) => {
					tracing::info!(component = "storage", implementation = %storage.primary, "Loaded");
					implementation
				},
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %storage.primary,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						storage.primary, e
					)));
				},
			}
		};

		let notifier = {
			let notifications = &self.config.notifications;
			let config = notifications
				.implementations
				.get(&notifications.primary)
				.ok_or_else(|| {
					BuilderError::Config(format!(
						"Primary notifier '{}' has no configuration",
						notifications.primary
					))
				})?;
			let factory = factories
				.notifier_factories
				.get(&notifications.primary)
				.ok_or_else(|| {
					BuilderError::MissingComponent(format!(
						"notifier implementation '{}'",
						notifications.primary
					))
				})?;
			match factory(config) {
				Ok(implementation) => {
					tracing::info!(component = "notifications", implementation = %notifications.primary, "Loaded");
					implementation
				},
				Err(e) => {
					tracing::error!(
						component = "notifications",
						implementation = %notifications.primary,
						error = %e,
						"Failed to create notifier"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create notifier '{}': {}",
						notifications.primary, e
					)));
				},
			}
		};

		let shop = &self.config.shop;
		let storage = Arc::new(StorageService::new(storage_backend));
		let orders = StoredOrderRepository::new(storage.clone(), self.clock.clone())
			.with_order_number_width(shop.order_number_width)
			.with_review_link_window(chrono::Duration::minutes(
				shop.review_link_window_minutes as i64,
			));
		let catalog = StoredCatalogRepository::new(storage.clone());
		let notifications = NotificationService::new(
			notifier,
			self.config.notifications.sender.clone(),
			self.config.notifications.admin_recipients.clone(),
			TemplateContext {
				shop_name: shop.id.clone(),
				public_url: shop.public_url.clone(),
				minor_units: shop.minor_units,
			},
		);

		Ok(OrderEngine::new(
			self.config,
			storage,
			Arc::new(orders),
			Arc::new(catalog),
			Arc::new(notifications),
			self.clock,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::test_support::CONFIG;
	use shop_notify::NotifierFactory;
	use shop_storage::StorageFactory;
	use std::str::FromStr;

	fn factories() -> ShopFactories<StorageFactory, NotifierFactory> {
		ShopFactories {
			storage_factories: shop_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			notifier_factories: shop_notify::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[tokio::test]
	async fn test_builds_with_builtin_implementations() {
		let config = Config::from_str(CONFIG).unwrap();
		let engine = ShopBuilder::new(config).build(factories()).unwrap();
		assert_eq!(engine.config().shop.id, "test-shop");
		assert!(engine.list_fragrances().await.unwrap().is_empty());
	}

	#[test]
	fn test_unknown_primary_is_missing_component() {
		let config = Config::from_str(CONFIG).unwrap();
		let mut factories = factories();
		factories.storage_factories.remove("memory");

		let err = ShopBuilder::new(config).build(factories).err().unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(_)));
	}
}
