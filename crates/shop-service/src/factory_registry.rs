//! Registry of backend factories known to this binary.
//!
//! Every storage and notifier implementation the linked crates export is
//! registered once. Building the engine then looks up each implementation
//! named in the configuration and fails with the list of available names
//! when one is unknown.

use shop_config::Config;
use shop_core::{OrderEngine, ShopBuilder, ShopFactories};
use shop_notify::NotifierFactory;
use shop_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Factories for every pluggable component, keyed by implementation name.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub notifier: HashMap<String, NotifierFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			notifier: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_notifier(&mut self, name: impl Into<String>, factory: NotifierFactory) {
		self.notifier.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, filling it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in shop_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in shop_notify::get_all_implementations() {
			tracing::debug!("Registering notifier implementation: {}", name);
			registry.register_notifier(name, factory);
		}

		registry
	})
}

/// Selects the registered factories for the implementations a config names.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Factories for the implementations configured in `config`.
pub fn factories_for(
	config: &Config,
) -> Result<ShopFactories<StorageFactory, NotifierFactory>, Box<dyn std::error::Error>> {
	let registry = get_registry();
	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let notifier_factories = build_factories!(
		registry,
		config.notifications.implementations,
		notifier,
		"notifier"
	);
	Ok(ShopFactories {
		storage_factories,
		notifier_factories,
	})
}

/// Builds the order engine from configuration using the registry.
pub fn build_engine_from_config(config: Config) -> Result<OrderEngine, Box<dyn std::error::Error>> {
	let factories = factories_for(&config)?;
	Ok(ShopBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	const CONFIG: &str = r#"
[shop]
id = "registry-shop"

[storage]
primary = "memory"
[storage.implementations.memory]

[notifications]
sender = "orders@shop.test"
primary = "log"
[notifications.implementations.log]
"#;

	#[test]
	fn test_registry_contains_builtin_backends() {
		let registry = get_registry();
		assert!(registry.storage.contains_key("memory"));
		assert!(registry.storage.contains_key("file"));
		assert!(registry.notifier.contains_key("log"));
		assert!(registry.notifier.contains_key("http"));
	}

	#[test]
	fn test_builds_engine_from_config() {
		let config = Config::from_str(CONFIG).unwrap();
		let engine = build_engine_from_config(config).unwrap();
		assert_eq!(engine.config().shop.id, "registry-shop");
	}

	#[tokio::test]
	async fn test_builds_engine_from_config_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, CONFIG).unwrap();

		let config = Config::from_file(path.to_str().unwrap()).await.unwrap();
		let engine = build_engine_from_config(config).unwrap();
		assert!(engine.list_fragrances().await.unwrap().is_empty());
	}

	#[test]
	fn test_unknown_implementation_lists_available() {
		let mut config = Config::from_str(CONFIG).unwrap();
		config.storage.implementations.insert(
			"redis".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);

		let err = factories_for(&config).err().unwrap().to_string();
		assert!(err.contains("Unknown storage implementation 'redis'"));
		assert!(err.contains("file, memory"));
	}
}
