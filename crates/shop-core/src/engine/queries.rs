//! Read operations and order deletion.

use super::{EngineError, OrderEngine, OrderOutcome};
use shop_types::{CustomerIdentity, OrderFilter};
use tracing::instrument;

impl OrderEngine {
	/// The caller's active order, with `can_cancel` computed by the same guard
	/// `cancel_order` applies.
	pub async fn active_order_for(
		&self,
		identity: &CustomerIdentity,
	) -> Result<Option<OrderOutcome>, EngineError> {
		match self.orders.find_active_for_customer(identity).await? {
			Some(order) => Ok(Some(self.outcome(order, None).await?)),
			None => Ok(None),
		}
	}

	/// An order the caller owns. Other customers' orders are `NotOwned`.
	pub async fn order_for(
		&self,
		identity: &CustomerIdentity,
		id: u64,
	) -> Result<OrderOutcome, EngineError> {
		let order = self.load_order(id).await?;
		if !identity.owns(&order) {
			return Err(EngineError::NotOwned(id));
		}
		self.outcome(order, None).await
	}

	/// Any order, for staff.
	pub async fn order(&self, id: u64) -> Result<OrderOutcome, EngineError> {
		let order = self.load_order(id).await?;
		self.outcome(order, None).await
	}

	pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderOutcome>, EngineError> {
		let orders = self.orders.list(filter).await?;
		let mut outcomes = Vec::with_capacity(orders.len());
		for order in orders {
			outcomes.push(self.outcome(order, None).await?);
		}
		Ok(outcomes)
	}

	/// Removes a completed or cancelled order and its items.
	#[instrument(skip_all, fields(order_id = id))]
	pub async fn delete_order(&self, id: u64) -> Result<(), EngineError> {
		self.orders.delete(id).await?;
		tracing::info!("Order deleted");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::super::test_support::{harness, request};
	use super::super::ConflictKind;
	use super::*;
	use chrono::Duration;
	use shop_types::OrderStatus;

	#[tokio::test]
	async fn test_active_order_reports_can_cancel() {
		let h = harness();
		let variant = h.seed_variant().await;
		let guest = CustomerIdentity::guest("10.0.0.1");
		assert!(h.engine.active_order_for(&guest).await.unwrap().is_none());

		h.engine.place_order(&guest, request(variant.id, 1)).await.unwrap();
		let active = h.engine.active_order_for(&guest).await.unwrap().unwrap();
		assert!(active.can_cancel);
		assert_eq!(active.items.len(), 1);

		h.clock.advance(Duration::minutes(61));
		let active = h.engine.active_order_for(&guest).await.unwrap().unwrap();
		assert!(!active.can_cancel);
	}

	#[tokio::test]
	async fn test_order_for_hides_foreign_orders() {
		let h = harness();
		let variant = h.seed_variant().await;
		let placed = h
			.engine
			.place_order(&CustomerIdentity::guest("10.0.0.1"), request(variant.id, 1))
			.await
			.unwrap();

		let err = h
			.engine
			.order_for(&CustomerIdentity::guest("10.0.0.2"), placed.order.id)
			.await
			.unwrap_err();
		assert!(matches!(err, EngineError::NotOwned(_)));
		assert!(h.engine.order(placed.order.id).await.is_ok());
	}

	#[tokio::test]
	async fn test_delete_only_terminal_orders() {
		let h = harness();
		let variant = h.seed_variant().await;
		let placed = h
			.engine
			.place_order(&CustomerIdentity::guest("10.0.0.1"), request(variant.id, 1))
			.await
			.unwrap();
		let id = placed.order.id;

		let err = h.engine.delete_order(id).await.unwrap_err();
		assert!(matches!(
			err,
			EngineError::Conflict(ConflictKind::NotTerminal {
				status: OrderStatus::Pending
			})
		));

		h.engine.admin_cancel(id, None).await.unwrap();
		h.engine.delete_order(id).await.unwrap();
		assert!(matches!(h.engine.order(id).await, Err(EngineError::NotFound(_))));
		assert!(h
			.engine
			.list_orders(&OrderFilter::default())
			.await
			.unwrap()
			.is_empty());
	}
}
