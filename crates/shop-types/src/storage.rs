//! Storage-related types for the shop backend.

use std::str::FromStr;

/// Namespaces for the different collections kept in the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageTable {
	/// Order headers keyed by numeric id
	Orders,
	/// Line items of one order, stored as a list keyed by the order id
	OrderItems,
	/// Active-order pointers keyed by customer session key
	CustomerSessions,
	/// Review-link tokens mapping to order ids
	ReviewTokens,
	Fragrances,
	Variants,
	/// Monotonic id counters
	Counters,
}

impl StorageTable {
	/// Returns the namespace prefix used in storage keys.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageTable::Orders => "orders",
			StorageTable::OrderItems => "order_items",
			StorageTable::CustomerSessions => "customer_sessions",
			StorageTable::ReviewTokens => "review_tokens",
			StorageTable::Fragrances => "fragrances",
			StorageTable::Variants => "variants",
			StorageTable::Counters => "counters",
		}
	}

	/// Returns an iterator over all tables.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::OrderItems,
			Self::CustomerSessions,
			Self::ReviewTokens,
			Self::Fragrances,
			Self::Variants,
			Self::Counters,
		]
		.into_iter()
	}
}

impl FromStr for StorageTable {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|t| t.as_str() == s).ok_or(())
	}
}

impl From<StorageTable> for &'static str {
	fn from(table: StorageTable) -> Self {
		table.as_str()
	}
}
