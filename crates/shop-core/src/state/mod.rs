//! Persistence of orders and the catalog.
//!
//! The repositories are the only code that touches storage keys. Order status
//! changes go through `OrderRepository::update_status`, which re-checks every
//! transition against the structural table in `order`.

pub mod catalog;
pub mod order;

pub use catalog::{CatalogRepository, StoredCatalogRepository};
pub use order::{is_valid_transition, OrderRepository, StoredOrderRepository};

use shop_storage::{StorageError, StorageService};
use shop_types::{OrderStatus, StorageTable};
use thiserror::Error;

/// Errors surfaced by the repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
	#[error("{entity} {id} not found")]
	NotFound { entity: &'static str, id: String },
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Customer already has active order {order_number}")]
	DuplicateActiveOrder { order_id: u64, order_number: String },
	#[error("Order is {0}; only completed or cancelled orders can be deleted")]
	NotTerminal(OrderStatus),
	/// The backing store failed or could not be reached.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl RepositoryError {
	pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
		Self::NotFound {
			entity,
			id: id.to_string(),
		}
	}
}

impl From<StorageError> for RepositoryError {
	fn from(err: StorageError) -> Self {
		RepositoryError::Storage(err.to_string())
	}
}

/// Allocates the next id of a named sequence.
///
/// Callers must hold the write lock that guards the sequence.
pub(crate) async fn next_sequence(
	storage: &StorageService,
	name: &str,
) -> Result<u64, RepositoryError> {
	let current: u64 = storage.find(StorageTable::Counters, name).await?.unwrap_or(0);
	let next = current + 1;
	storage.store(StorageTable::Counters, name, &next).await?;
	Ok(next)
}
