//! Catalog operations for the storefront and the admin surface.

use super::{EngineError, OrderEngine};
use shop_types::{
	Fragrance, FragranceWithVariants, UpsertFragranceRequest, UpsertVariantRequest, Variant,
};
use tracing::instrument;
use validator::Validate;

impl OrderEngine {
	/// Visible fragrances with their variants.
	pub async fn list_fragrances(&self) -> Result<Vec<FragranceWithVariants>, EngineError> {
		let mut listed = Vec::new();
		for fragrance in self.catalog.fragrances().await? {
			if fragrance.hidden {
				continue;
			}
			let variants = self.catalog.variants_for(fragrance.id).await?;
			listed.push(FragranceWithVariants {
				fragrance,
				variants,
			});
		}
		Ok(listed)
	}

	/// One visible fragrance. Hidden ones are reported as not found.
	pub async fn fragrance(&self, id: u64) -> Result<FragranceWithVariants, EngineError> {
		let fragrance = self
			.catalog
			.fragrance(id)
			.await?
			.filter(|f| !f.hidden)
			.ok_or_else(|| EngineError::NotFound(format!("Fragrance {}", id)))?;
		let variants = self.catalog.variants_for(id).await?;
		Ok(FragranceWithVariants {
			fragrance,
			variants,
		})
	}

	/// Creates a fragrance, or replaces the one with the given id.
	#[instrument(skip_all, fields(fragrance_id = ?request.id))]
	pub async fn upsert_fragrance(
		&self,
		request: UpsertFragranceRequest,
	) -> Result<Fragrance, EngineError> {
		request
			.validate()
			.map_err(|e| EngineError::Validation(e.to_string()))?;

		let now = self.clock.now();
		let created_at = match request.id {
			Some(id) => {
				self.catalog
					.fragrance(id)
					.await?
					.ok_or_else(|| EngineError::NotFound(format!("Fragrance {}", id)))?
					.created_at
			},
			None => now,
		};
		let saved = self
			.catalog
			.save_fragrance(Fragrance {
				id: request.id.unwrap_or(0),
				name: request.name.trim().to_string(),
				brand: request.brand.trim().to_string(),
				description: request.description,
				image_url: request.image_url,
				hidden: request.hidden,
				created_at,
				updated_at: now,
			})
			.await?;
		tracing::info!(fragrance_id = saved.id, name = %saved.name, "Fragrance saved");
		Ok(saved)
	}

	/// Creates a variant, or replaces the one with the given id. The owning
	/// fragrance must exist.
	#[instrument(skip_all, fields(variant_id = ?request.id, fragrance_id = request.fragrance_id))]
	pub async fn upsert_variant(&self, request: UpsertVariantRequest) -> Result<Variant, EngineError> {
		request
			.validate()
			.map_err(|e| EngineError::Validation(e.to_string()))?;

		if self.catalog.fragrance(request.fragrance_id).await?.is_none() {
			return Err(EngineError::Validation(format!(
				"fragrance {} does not exist",
				request.fragrance_id
			)));
		}
		if let Some(id) = request.id {
			if self.catalog.variant(id).await?.is_none() {
				return Err(EngineError::NotFound(format!("Variant {}", id)));
			}
		}

		let saved = self
			.catalog
			.save_variant(Variant {
				id: request.id.unwrap_or(0),
				fragrance_id: request.fragrance_id,
				size_label: request.size_label.trim().to_string(),
				price_cents: request.price_cents,
				in_stock: request.in_stock,
				is_whole_bottle: request.is_whole_bottle,
				max_quantity: request.max_quantity,
			})
			.await?;
		tracing::info!(variant_id = saved.id, "Variant saved");
		Ok(saved)
	}

	/// Deletes a fragrance and its variants. Existing order items keep their
	/// snapshot.
	#[instrument(skip_all, fields(fragrance_id = id))]
	pub async fn delete_fragrance(&self, id: u64) -> Result<(), EngineError> {
		self.catalog.delete_fragrance(id).await?;
		tracing::info!("Fragrance deleted");
		Ok(())
	}
}
