//! Status transitions initiated by customers, staff and review links.

use super::{EngineError, OrderEngine, OrderOutcome, ReviewLinkOutcome};
use shop_types::{Actor, AuditNote, CustomerIdentity, Order, OrderEvent, OrderStatus};
use tracing::instrument;

impl OrderEngine {
	/// Customer self-cancel.
	///
	/// Orders the caller does not own are reported as not found. A refused
	/// cancel carries the reason and the order's age in minutes.
	#[instrument(skip_all, fields(order_id = id, customer = %identity))]
	pub async fn cancel_order(
		&self,
		identity: &CustomerIdentity,
		id: u64,
	) -> Result<OrderOutcome, EngineError> {
		let order = self.load_order(id).await?;
		if !identity.owns(&order) {
			return Err(EngineError::NotOwned(id));
		}

		let now = self.clock.now();
		if let Err(denial) = self.policy.check_customer_cancel(&order, now) {
			tracing::info!(
				reason = %denial.reason,
				elapsed_minutes = denial.elapsed_minutes,
				"Customer cancellation denied"
			);
			return Err(denial.into());
		}

		let elapsed = (now - order.created_at).num_minutes();
		let note = AuditNote::new(Actor::Customer, "cancelled")
			.with_reason(format!("cancelled by customer after {} minutes", elapsed));
		let order = self
			.orders
			.update_status(id, OrderStatus::Cancelled, note)
			.await?;
		tracing::info!(order_number = %order.order_number, "Order cancelled by customer");
		self.dispatch(order, OrderEvent::Cancelled).await
	}

	/// Staff cancel. Not time-boxed; a reviewed order is unmarked in the same
	/// write.
	#[instrument(skip_all, fields(order_id = id))]
	pub async fn admin_cancel(
		&self,
		id: u64,
		reason: Option<String>,
	) -> Result<OrderOutcome, EngineError> {
		let order = self.load_order(id).await?;
		self.policy.check_admin_cancel(&order, self.clock.now())?;

		let action = if order.reviewed {
			"unmarked_and_cancelled"
		} else {
			"cancelled"
		};
		let mut note = AuditNote::new(Actor::Admin, action);
		if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
			note = note.with_reason(reason);
		}
		let order = self
			.orders
			.update_status(id, OrderStatus::Cancelled, note)
			.await?;
		tracing::info!(order_number = %order.order_number, "Order cancelled by staff");
		self.dispatch(order, OrderEvent::Cancelled).await
	}

	/// Sets or clears the review flag.
	///
	/// Marking moves a pending order to reviewed; unmarking returns a reviewed
	/// or processing order to pending. Asking for the state the order is
	/// already in changes nothing and sends nothing.
	#[instrument(skip_all, fields(order_id = id, reviewed = reviewed))]
	pub async fn set_review(&self, id: u64, reviewed: bool) -> Result<OrderOutcome, EngineError> {
		let order = self.load_order(id).await?;
		self.policy.check_review(&order, self.clock.now())?;

		if order.reviewed == reviewed {
			return self.outcome(order, None).await;
		}

		let (to, action) = if reviewed {
			(OrderStatus::Reviewed, "reviewed")
		} else {
			(OrderStatus::Pending, "unmarked")
		};
		let order = self
			.orders
			.update_status(id, to, AuditNote::new(Actor::Admin, action))
			.await?;
		tracing::info!(order_number = %order.order_number, status = %order.status, "Review flag changed");
		self.dispatch(order, OrderEvent::Reviewed).await
	}

	/// Moves a pending or reviewed order into fulfilment.
	#[instrument(skip_all, fields(order_id = id))]
	pub async fn mark_processing(&self, id: u64) -> Result<OrderOutcome, EngineError> {
		let order = self.load_order(id).await?;
		self.policy.check_processing(&order, self.clock.now())?;
		if order.status == OrderStatus::Processing {
			return self.outcome(order, None).await;
		}

		let order = self
			.orders
			.update_status(
				id,
				OrderStatus::Processing,
				AuditNote::new(Actor::Admin, "processing"),
			)
			.await?;
		tracing::info!(order_number = %order.order_number, "Order processing");
		self.dispatch(order, OrderEvent::Reviewed).await
	}

	/// Marks a reviewed or processing order as fulfilled.
	#[instrument(skip_all, fields(order_id = id))]
	pub async fn complete(&self, id: u64) -> Result<OrderOutcome, EngineError> {
		let order = self.load_order(id).await?;
		self.policy.check_complete(&order, self.clock.now())?;

		let order = self
			.orders
			.update_status(
				id,
				OrderStatus::Completed,
				AuditNote::new(Actor::Admin, "completed"),
			)
			.await?;
		tracing::info!(order_number = %order.order_number, "Order completed");
		self.outcome(order, None).await
	}

	/// Follows an emailed review link.
	///
	/// Repeating the link on an order that is already reviewed succeeds
	/// without writing anything.
	#[instrument(skip_all)]
	pub async fn review_by_token(&self, token: &str) -> Result<ReviewLinkOutcome, EngineError> {
		let order = self
			.orders
			.find_by_review_token(token)
			.await?
			.ok_or_else(|| EngineError::NotFound("Review link".into()))?;

		if order.reviewed {
			return Ok(ReviewLinkOutcome {
				order,
				already_reviewed: true,
			});
		}
		self.policy.check_review_link(&order, self.clock.now())?;

		let order = self
			.orders
			.update_status(
				order.id,
				OrderStatus::Reviewed,
				AuditNote::new(Actor::ReviewLink, "reviewed"),
			)
			.await?;
		tracing::info!(order_id = order.id, order_number = %order.order_number, "Order reviewed via link");
		let outcome = self.dispatch(order, OrderEvent::Reviewed).await?;
		Ok(ReviewLinkOutcome {
			order: outcome.order,
			already_reviewed: false,
		})
	}

	/// Sends the event's notifications and builds the outcome.
	async fn dispatch(&self, order: Order, event: OrderEvent) -> Result<OrderOutcome, EngineError> {
		let items = self.orders.items_for(order.id).await?;
		let sent = self.notifications.notify(event, &order, &items).await;
		let can_cancel = self.policy.can_customer_cancel(&order, self.clock.now());
		Ok(OrderOutcome {
			order,
			items,
			notifications_sent: Some(sent),
			can_cancel,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::super::test_support::{harness, request, Harness};
	use super::super::ConflictKind;
	use super::*;
	use chrono::Duration;
	use shop_types::DenialReason;

	async fn placed(h: &Harness, ip: &str) -> Order {
		let variant = h.seed_variant().await;
		h.engine
			.place_order(&CustomerIdentity::guest(ip), request(variant.id, 2))
			.await
			.unwrap()
			.order
	}

	fn assert_denied(err: EngineError, expected: DenialReason) -> i64 {
		match err {
			EngineError::TransitionDenied {
				reason,
				elapsed_minutes,
			} => {
				assert_eq!(reason, expected);
				elapsed_minutes
			},
			other => panic!("expected {} denial, got {:?}", expected, other),
		}
	}

	#[tokio::test]
	async fn test_cancel_within_window() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;
		h.clock.advance(Duration::minutes(10));

		let outcome = h
			.engine
			.cancel_order(&CustomerIdentity::guest("10.0.0.1"), order.id)
			.await
			.unwrap();
		assert_eq!(outcome.order.status, OrderStatus::Cancelled);
		assert!(!outcome.can_cancel);
		assert_eq!(outcome.notifications_sent, Some(true));
		let last = outcome.order.audit_log.last().unwrap();
		assert_eq!(last.actor, Actor::Customer);
		assert_eq!(last.from, Some(OrderStatus::Pending));
	}

	#[tokio::test]
	async fn test_cancel_by_other_identity_is_not_owned() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;
		let err = h
			.engine
			.cancel_order(&CustomerIdentity::guest("10.0.0.9"), order.id)
			.await
			.unwrap_err();
		assert!(matches!(err, EngineError::NotOwned(_)));

		let err = h
			.engine
			.cancel_order(&CustomerIdentity::guest("10.0.0.1"), 404)
			.await
			.unwrap_err();
		assert!(matches!(err, EngineError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_cancel_after_review_is_denied() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;
		h.engine.set_review(order.id, true).await.unwrap();

		let err = h
			.engine
			.cancel_order(&CustomerIdentity::guest("10.0.0.1"), order.id)
			.await
			.unwrap_err();
		assert_denied(err, DenialReason::AlreadyReviewed);
	}

	#[tokio::test]
	async fn test_cancel_after_window_reports_elapsed_time() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;
		h.clock.advance(Duration::minutes(135));

		let err = h
			.engine
			.cancel_order(&CustomerIdentity::guest("10.0.0.1"), order.id)
			.await
			.unwrap_err();
		assert_eq!(assert_denied(err, DenialReason::WindowExpired), 135);
	}

	#[tokio::test]
	async fn test_double_cancel_notifies_once() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;
		let guest = CustomerIdentity::guest("10.0.0.1");
		let after_placement = h.sent_count();

		h.engine.cancel_order(&guest, order.id).await.unwrap();
		let after_cancel = h.sent_count();
		assert!(after_cancel > after_placement);

		for _ in 0..2 {
			let err = h.engine.cancel_order(&guest, order.id).await.unwrap_err();
			assert_denied(err, DenialReason::AlreadyCancelled);
		}
		assert_eq!(h.sent_count(), after_cancel);
	}

	#[tokio::test]
	async fn test_admin_cancel_unmarks_reviewed_order() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;
		h.engine.mark_processing(order.id).await.unwrap();
		h.clock.advance(Duration::days(2));

		let outcome = h
			.engine
			.admin_cancel(order.id, Some("customer called".into()))
			.await
			.unwrap();
		assert_eq!(outcome.order.status, OrderStatus::Cancelled);
		assert!(!outcome.order.reviewed);
		let last = outcome.order.audit_log.last().unwrap();
		assert_eq!(last.action, "unmarked_and_cancelled");
		assert_eq!(last.reason.as_deref(), Some("customer called"));

		// The customer is free to order again.
		let active = h
			.engine
			.orders
			.find_active_for_customer(&CustomerIdentity::guest("10.0.0.1"))
			.await
			.unwrap();
		assert!(active.is_none());
	}

	#[tokio::test]
	async fn test_review_toggle_is_idempotent() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;

		let first = h.engine.set_review(order.id, true).await.unwrap();
		assert_eq!(first.order.status, OrderStatus::Reviewed);
		assert_eq!(first.notifications_sent, Some(true));
		let sent = h.sent_count();

		let again = h.engine.set_review(order.id, true).await.unwrap();
		assert_eq!(again.notifications_sent, None);
		assert_eq!(h.sent_count(), sent);

		let unmarked = h.engine.set_review(order.id, false).await.unwrap();
		assert_eq!(unmarked.order.status, OrderStatus::Pending);
		assert!(!unmarked.order.reviewed);
		// The window still counts from placement.
		assert!(unmarked.can_cancel);
	}

	#[tokio::test]
	async fn test_complete_requires_review() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;

		let err = h.engine.complete(order.id).await.unwrap_err();
		assert_denied(err, DenialReason::NotReviewed);

		h.engine.set_review(order.id, true).await.unwrap();
		let done = h.engine.complete(order.id).await.unwrap();
		assert_eq!(done.order.status, OrderStatus::Completed);
		assert_eq!(done.notifications_sent, None);

		let err = h.engine.mark_processing(order.id).await.unwrap_err();
		assert_denied(err, DenialReason::AlreadyCompleted);
	}

	#[tokio::test]
	async fn test_review_link_marks_once() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;
		let token = order.review_token.clone().unwrap();

		let first = h.engine.review_by_token(&token).await.unwrap();
		assert!(!first.already_reviewed);
		assert_eq!(first.order.status, OrderStatus::Reviewed);
		assert_eq!(first.order.audit_log.last().unwrap().actor, Actor::ReviewLink);

		let second = h.engine.review_by_token(&token).await.unwrap();
		assert!(second.already_reviewed);
	}

	#[tokio::test]
	async fn test_review_link_on_cancelled_order_is_denied() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;
		h.engine.admin_cancel(order.id, None).await.unwrap();

		let err = h
			.engine
			.review_by_token(order.review_token.as_deref().unwrap())
			.await
			.unwrap_err();
		assert_denied(err, DenialReason::AlreadyCancelled);
	}

	#[tokio::test]
	async fn test_review_link_expires() {
		let h = harness();
		let order = placed(&h, "10.0.0.1").await;
		h.clock.advance(Duration::hours(13));

		let err = h
			.engine
			.review_by_token(order.review_token.as_deref().unwrap())
			.await
			.unwrap_err();
		assert!(matches!(err, EngineError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_stale_transition_maps_to_conflict() {
		let err: EngineError = crate::state::RepositoryError::InvalidTransition {
			from: OrderStatus::Cancelled,
			to: OrderStatus::Reviewed,
		}
		.into();
		assert!(matches!(
			err,
			EngineError::Conflict(ConflictKind::AlreadyTerminal {
				status: OrderStatus::Cancelled
			})
		));
	}
}
