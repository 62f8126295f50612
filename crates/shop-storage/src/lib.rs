//! Storage layer for the shop backend.
//!
//! Backends are byte-oriented key-value stores with optional per-key TTL and
//! namespace listing. `StorageService` layers typed JSON access on top, keyed
//! as `<namespace>:<id>`.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use shop_types::{ConfigSchema, ImplementationRegistry, StorageTable};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The backend could not be reached or failed the operation.
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface implemented by every storage backend.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key. Expired entries are `NotFound`.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes. A `None` TTL falls back to the backend's configured
	/// default for the key's namespace, if any.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Deletes a key. Deleting a missing key succeeds.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists the ids (key suffixes after `<namespace>:`) of live entries in
	/// a namespace.
	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError>;

	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired entries and returns how many were removed.
	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		Ok(0)
	}
}

/// Signature of a backend factory.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// All built-in storage backends as (config name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Default TTLs per table, read from `ttl_<table>` keys (seconds, 0 = keep
/// forever) in a backend's configuration table.
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
	ttls: HashMap<StorageTable, Duration>,
}

impl TtlConfig {
	pub fn from_config(config: &toml::Value) -> Self {
		let ttls = StorageTable::all()
			.filter_map(|table| {
				config
					.get(format!("ttl_{}", table.as_str()))
					.and_then(|v| v.as_integer())
					.filter(|secs| *secs > 0)
					.map(|secs| (table, Duration::from_secs(secs as u64)))
			})
			.collect();
		Self { ttls }
	}

	/// TTL for a full `<namespace>:<id>` key, if its table has one.
	pub fn for_key(&self, key: &str) -> Option<Duration> {
		let namespace = key.split(':').next()?;
		let table = namespace.parse::<StorageTable>().ok()?;
		self.ttls.get(&table).copied()
	}

	/// Schema fields for every `ttl_<table>` key.
	pub fn schema_fields() -> Vec<shop_types::Field> {
		StorageTable::all()
			.map(|table| {
				shop_types::Field::new(
					format!("ttl_{}", table.as_str()),
					shop_types::FieldType::Integer {
						min: Some(0),
						max: None,
					},
				)
			})
			.collect()
	}
}

fn storage_key(table: StorageTable, id: &str) -> String {
	format!("{}:{}", table.as_str(), id)
}

/// Typed access to a storage backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a value as JSON under `<table>:<id>` with an optional TTL.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		table: StorageTable,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&storage_key(table, id), bytes, ttl)
			.await
	}

	pub async fn store<T: Serialize>(
		&self,
		table: StorageTable,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.store_with_ttl(table, id, data, None).await
	}

	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		table: StorageTable,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&storage_key(table, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Like `retrieve`, but maps `NotFound` to `None`.
	pub async fn find<T: DeserializeOwned>(
		&self,
		table: StorageTable,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(table, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	pub async fn remove(&self, table: StorageTable, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&storage_key(table, id)).await
	}

	/// Overwrites an existing value. Fails with `NotFound` if the key is absent,
	/// unlike `store` which creates or overwrites.
	pub async fn update<T: Serialize>(
		&self,
		table: StorageTable,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		if !self.exists(table, id).await? {
			return Err(StorageError::NotFound);
		}
		self.store(table, id, data).await
	}

	pub async fn exists(&self, table: StorageTable, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&storage_key(table, id)).await
	}

	/// Loads every live value in a table as `(id, value)` pairs.
	///
	/// Entries that expire or are deleted between listing and reading are
	/// skipped.
	pub async fn list<T: DeserializeOwned>(
		&self,
		table: StorageTable,
	) -> Result<Vec<(String, T)>, StorageError> {
		let ids = self.backend.list_keys(table.as_str()).await?;
		let mut values = Vec::with_capacity(ids.len());
		for id in ids {
			if let Some(value) = self.find(table, &id).await? {
				values.push((id, value));
			}
		}
		Ok(values)
	}

	/// Removes expired entries; a no-op for backends without TTL support.
	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.backend.cleanup_expired().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, Serialize, Deserialize, PartialEq)]
	struct Record {
		name: String,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_store_and_retrieve_typed() {
		let storage = service();
		let record = Record {
			name: "Oud Royale".into(),
		};
		storage
			.store(StorageTable::Fragrances, "1", &record)
			.await
			.unwrap();

		let loaded: Record = storage.retrieve(StorageTable::Fragrances, "1").await.unwrap();
		assert_eq!(loaded, record);
		let missing: Option<Record> = storage.find(StorageTable::Fragrances, "2").await.unwrap();
		assert!(missing.is_none());
	}

	#[tokio::test]
	async fn test_update_requires_existing_key() {
		let storage = service();
		let record = Record { name: "x".into() };
		let result = storage.update(StorageTable::Variants, "9", &record).await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_list_is_scoped_to_table() {
		let storage = service();
		for id in ["1", "2"] {
			storage
				.store(StorageTable::Fragrances, id, &Record { name: id.into() })
				.await
				.unwrap();
		}
		storage
			.store(StorageTable::Variants, "1", &Record { name: "v".into() })
			.await
			.unwrap();

		let mut listed: Vec<(String, Record)> =
			storage.list(StorageTable::Fragrances).await.unwrap();
		listed.sort_by(|a, b| a.0.cmp(&b.0));
		assert_eq!(listed.len(), 2);
		assert_eq!(listed[1].1.name, "2");
	}

	#[test]
	fn test_ttl_config_reads_table_keys() {
		let config: toml::Value =
			toml::from_str("ttl_review_tokens = 43200\nttl_orders = 0").unwrap();
		let ttls = TtlConfig::from_config(&config);
		assert_eq!(
			ttls.for_key("review_tokens:abc"),
			Some(Duration::from_secs(43200))
		);
		assert_eq!(ttls.for_key("orders:1"), None);
		assert_eq!(ttls.for_key("unknown:1"), None);
	}

	#[test]
	fn test_all_backends_registered() {
		let names: Vec<&str> = get_all_implementations().iter().map(|(n, _)| *n).collect();
		assert!(names.contains(&"memory"));
		assert!(names.contains(&"file"));
	}
}
