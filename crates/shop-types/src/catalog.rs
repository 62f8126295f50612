//! Catalog types.
//!
//! The catalog is owned by the admin surface. The order core only reads it to
//! validate requested variants and to snapshot display fields into line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fragrance as shown in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fragrance {
	pub id: u64,
	pub name: String,
	pub brand: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image_url: Option<String>,
	/// Hidden fragrances are kept for admins but not listed publicly.
	#[serde(default)]
	pub hidden: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// A purchasable size of a fragrance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
	pub id: u64,
	pub fragrance_id: u64,
	/// Display label such as "5ml" or "Full bottle".
	pub size_label: String,
	/// Price in minor currency units.
	pub price_cents: i64,
	pub in_stock: bool,
	/// Whole bottles are shown in the catalog but cannot be ordered online.
	#[serde(default)]
	pub is_whole_bottle: bool,
	/// Per-variant quantity cap; the shop default applies when unset.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_quantity: Option<u32>,
}

impl Variant {
	/// Effective quantity cap given the shop-wide default.
	pub fn quantity_cap(&self, default_max: u32) -> u32 {
		self.max_quantity.unwrap_or(default_max)
	}
}

/// A fragrance together with its variants, as served to the storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragranceWithVariants {
	#[serde(flatten)]
	pub fragrance: Fragrance,
	pub variants: Vec<Variant>,
}
