//! Catalog persistence.

use super::{next_sequence, RepositoryError};
use async_trait::async_trait;
use shop_storage::StorageService;
use shop_types::{Fragrance, StorageTable, Variant};
use std::sync::Arc;
use tokio::sync::Mutex;

const FRAGRANCE_SEQUENCE: &str = "fragrances";
const VARIANT_SEQUENCE: &str = "variants";

/// Read and write access to fragrances and their variants.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
	async fn fragrance(&self, id: u64) -> Result<Option<Fragrance>, RepositoryError>;

	async fn variant(&self, id: u64) -> Result<Option<Variant>, RepositoryError>;

	/// All fragrances, hidden ones included, ordered by id.
	async fn fragrances(&self) -> Result<Vec<Fragrance>, RepositoryError>;

	async fn variants_for(&self, fragrance_id: u64) -> Result<Vec<Variant>, RepositoryError>;

	/// Inserts the fragrance, assigning an id when `id` is zero.
	async fn save_fragrance(&self, fragrance: Fragrance) -> Result<Fragrance, RepositoryError>;

	/// Inserts the variant, assigning an id when `id` is zero.
	async fn save_variant(&self, variant: Variant) -> Result<Variant, RepositoryError>;

	/// Deletes a fragrance and all of its variants.
	async fn delete_fragrance(&self, id: u64) -> Result<(), RepositoryError>;
}

pub struct StoredCatalogRepository {
	storage: Arc<StorageService>,
	write_lock: Mutex<()>,
}

impl StoredCatalogRepository {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
		}
	}
}

#[async_trait]
impl CatalogRepository for StoredCatalogRepository {
	async fn fragrance(&self, id: u64) -> Result<Option<Fragrance>, RepositoryError> {
		Ok(self
			.storage
			.find(StorageTable::Fragrances, &id.to_string())
			.await?)
	}

	async fn variant(&self, id: u64) -> Result<Option<Variant>, RepositoryError> {
		Ok(self
			.storage
			.find(StorageTable::Variants, &id.to_string())
			.await?)
	}

	async fn fragrances(&self) -> Result<Vec<Fragrance>, RepositoryError> {
		let mut fragrances: Vec<Fragrance> = self
			.storage
			.list::<Fragrance>(StorageTable::Fragrances)
			.await?
			.into_iter()
			.map(|(_, f)| f)
			.collect();
		fragrances.sort_by_key(|f| f.id);
		Ok(fragrances)
	}

	async fn variants_for(&self, fragrance_id: u64) -> Result<Vec<Variant>, RepositoryError> {
		let mut variants: Vec<Variant> = self
			.storage
			.list::<Variant>(StorageTable::Variants)
			.await?
			.into_iter()
			.map(|(_, v)| v)
			.filter(|v| v.fragrance_id == fragrance_id)
			.collect();
		variants.sort_by_key(|v| v.id);
		Ok(variants)
	}

	async fn save_fragrance(&self, mut fragrance: Fragrance) -> Result<Fragrance, RepositoryError> {
		let _guard = self.write_lock.lock().await;
		if fragrance.id == 0 {
			fragrance.id = next_sequence(&self.storage, FRAGRANCE_SEQUENCE).await?;
		}
		self.storage
			.store(StorageTable::Fragrances, &fragrance.id.to_string(), &fragrance)
			.await?;
		Ok(fragrance)
	}

	async fn save_variant(&self, mut variant: Variant) -> Result<Variant, RepositoryError> {
		let _guard = self.write_lock.lock().await;
		if variant.id == 0 {
			variant.id = next_sequence(&self.storage, VARIANT_SEQUENCE).await?;
		}
		self.storage
			.store(StorageTable::Variants, &variant.id.to_string(), &variant)
			.await?;
		Ok(variant)
	}

	async fn delete_fragrance(&self, id: u64) -> Result<(), RepositoryError> {
		let _guard = self.write_lock.lock().await;
		let key = id.to_string();
		if !self.storage.exists(StorageTable::Fragrances, &key).await? {
			return Err(RepositoryError::not_found("Fragrance", id));
		}
		for variant in self.variants_for(id).await? {
			self.storage
				.remove(StorageTable::Variants, &variant.id.to_string())
				.await?;
		}
		self.storage.remove(StorageTable::Fragrances, &key).await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use shop_storage::implementations::memory::MemoryStorage;

	fn repo() -> StoredCatalogRepository {
		StoredCatalogRepository::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	fn fragrance(name: &str) -> Fragrance {
		Fragrance {
			id: 0,
			name: name.into(),
			brand: "Maison".into(),
			description: None,
			image_url: None,
			hidden: false,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn variant(fragrance_id: u64, label: &str) -> Variant {
		Variant {
			id: 0,
			fragrance_id,
			size_label: label.into(),
			price_cents: 5000,
			in_stock: true,
			is_whole_bottle: false,
			max_quantity: None,
		}
	}

	#[tokio::test]
	async fn test_save_assigns_ids_once() {
		let repo = repo();
		let saved = repo.save_fragrance(fragrance("Oud Royale")).await.unwrap();
		assert_eq!(saved.id, 1);

		let mut renamed = saved.clone();
		renamed.name = "Oud Royale Intense".into();
		let resaved = repo.save_fragrance(renamed).await.unwrap();
		assert_eq!(resaved.id, 1);
		assert_eq!(repo.fragrances().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_delete_fragrance_cascades_variants() {
		let repo = repo();
		let a = repo.save_fragrance(fragrance("Oud Royale")).await.unwrap();
		let b = repo.save_fragrance(fragrance("Rose Noire")).await.unwrap();
		repo.save_variant(variant(a.id, "5ml")).await.unwrap();
		repo.save_variant(variant(a.id, "10ml")).await.unwrap();
		let kept = repo.save_variant(variant(b.id, "5ml")).await.unwrap();

		repo.delete_fragrance(a.id).await.unwrap();
		assert!(repo.fragrance(a.id).await.unwrap().is_none());
		assert!(repo.variants_for(a.id).await.unwrap().is_empty());
		assert_eq!(repo.variants_for(b.id).await.unwrap(), vec![kept]);
	}

	#[tokio::test]
	async fn test_delete_unknown_fragrance_is_not_found() {
		let err = repo().delete_fragrance(9).await.unwrap_err();
		assert!(matches!(err, RepositoryError::NotFound { entity: "Fragrance", .. }));
	}
}
