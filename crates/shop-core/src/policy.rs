//! Business guards on top of the transition table.
//!
//! The repository only knows which status changes are structurally possible.
//! This module decides who may make them and when, and explains refusals with
//! a `DenialReason`.

use chrono::{DateTime, Duration, Utc};
use shop_types::{DenialReason, Order, OrderStatus};

/// A refused transition together with the order's age when it was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
	pub reason: DenialReason,
	pub elapsed_minutes: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct LifecyclePolicy {
	cancellation_window: Duration,
}

impl LifecyclePolicy {
	pub fn new(cancellation_window: Duration) -> Self {
		Self {
			cancellation_window,
		}
	}

	pub fn cancellation_window(&self) -> Duration {
		self.cancellation_window
	}

	/// Customer self-cancel: pending, not reviewed, and inside the window.
	pub fn check_customer_cancel(&self, order: &Order, now: DateTime<Utc>) -> Result<(), Denial> {
		let elapsed = elapsed_minutes(order, now);
		let deny = |reason| Err(Denial {
			reason,
			elapsed_minutes: elapsed,
		});

		if let Some(reason) = DenialReason::for_terminal(order.status) {
			return deny(reason);
		}
		if order.reviewed || order.status != OrderStatus::Pending {
			return deny(DenialReason::AlreadyReviewed);
		}
		if now - order.created_at >= self.cancellation_window {
			return deny(DenialReason::WindowExpired);
		}
		Ok(())
	}

	pub fn can_customer_cancel(&self, order: &Order, now: DateTime<Utc>) -> bool {
		self.check_customer_cancel(order, now).is_ok()
	}

	/// Admin cancel is not time-boxed; any non-terminal order qualifies.
	pub fn check_admin_cancel(&self, order: &Order, now: DateTime<Utc>) -> Result<(), Denial> {
		not_terminal(order, now)
	}

	pub fn check_processing(&self, order: &Order, now: DateTime<Utc>) -> Result<(), Denial> {
		not_terminal(order, now)
	}

	/// Completion needs staff to have looked at the order first.
	pub fn check_complete(&self, order: &Order, now: DateTime<Utc>) -> Result<(), Denial> {
		not_terminal(order, now)?;
		if order.status == OrderStatus::Pending {
			return Err(Denial {
				reason: DenialReason::NotReviewed,
				elapsed_minutes: elapsed_minutes(order, now),
			});
		}
		Ok(())
	}

	/// Setting or clearing the review flag on a non-terminal order.
	pub fn check_review(&self, order: &Order, now: DateTime<Utc>) -> Result<(), Denial> {
		not_terminal(order, now)
	}

	/// Review-link flow: only a pending order can be marked through the link.
	pub fn check_review_link(&self, order: &Order, now: DateTime<Utc>) -> Result<(), Denial> {
		not_terminal(order, now)?;
		if order.status != OrderStatus::Pending {
			return Err(Denial {
				reason: DenialReason::NotPending,
				elapsed_minutes: elapsed_minutes(order, now),
			});
		}
		Ok(())
	}
}

fn not_terminal(order: &Order, now: DateTime<Utc>) -> Result<(), Denial> {
	match DenialReason::for_terminal(order.status) {
		Some(reason) => Err(Denial {
			reason,
			elapsed_minutes: elapsed_minutes(order, now),
		}),
		None => Ok(()),
	}
}

fn elapsed_minutes(order: &Order, now: DateTime<Utc>) -> i64 {
	(now - order.created_at).num_minutes().max(0)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn order(status: OrderStatus, created_at: DateTime<Utc>) -> Order {
		Order {
			id: 1,
			order_number: "000001".into(),
			user_id: None,
			customer_ip: Some("10.0.0.1".into()),
			customer_name: "Sara".into(),
			phone: "+96550000000".into(),
			email: None,
			address: "Block 1".into(),
			city: "Kuwait City".into(),
			region: None,
			notes: None,
			status,
			reviewed: status.reviewed_flag(),
			total_amount: 10000,
			currency: "KWD".into(),
			review_deadline: created_at + Duration::hours(1),
			review_token: None,
			created_at,
			updated_at: created_at,
			session_keys: Vec::new(),
			audit_log: Vec::new(),
		}
	}

	fn policy() -> LifecyclePolicy {
		LifecyclePolicy::new(Duration::hours(1))
	}

	#[test]
	fn test_customer_cancel_inside_window() {
		let now = Utc::now();
		let o = order(OrderStatus::Pending, now - Duration::minutes(59));
		assert_eq!(policy().check_customer_cancel(&o, now), Ok(()));
	}

	#[test]
	fn test_window_boundary_is_exclusive() {
		let now = Utc::now();
		let o = order(OrderStatus::Pending, now - Duration::hours(1));
		let denial = policy().check_customer_cancel(&o, now).unwrap_err();
		assert_eq!(denial.reason, DenialReason::WindowExpired);
		assert_eq!(denial.elapsed_minutes, 60);
	}

	#[test]
	fn test_reviewed_flag_blocks_customer_cancel() {
		let now = Utc::now();
		let mut o = order(OrderStatus::Pending, now);
		o.reviewed = true;
		assert_eq!(
			policy().check_customer_cancel(&o, now).unwrap_err().reason,
			DenialReason::AlreadyReviewed
		);
		let o = order(OrderStatus::Processing, now);
		assert_eq!(
			policy().check_customer_cancel(&o, now).unwrap_err().reason,
			DenialReason::AlreadyReviewed
		);
	}

	#[test]
	fn test_terminal_reasons_take_precedence() {
		let now = Utc::now();
		let o = order(OrderStatus::Cancelled, now - Duration::days(2));
		assert_eq!(
			policy().check_customer_cancel(&o, now).unwrap_err().reason,
			DenialReason::AlreadyCancelled
		);
		let o = order(OrderStatus::Completed, now);
		assert_eq!(
			policy().check_admin_cancel(&o, now).unwrap_err().reason,
			DenialReason::AlreadyCompleted
		);
	}

	#[test]
	fn test_admin_cancel_ignores_window() {
		let now = Utc::now();
		let o = order(OrderStatus::Reviewed, now - Duration::days(3));
		assert_eq!(policy().check_admin_cancel(&o, now), Ok(()));
	}

	#[test]
	fn test_complete_requires_review() {
		let now = Utc::now();
		let pending = order(OrderStatus::Pending, now);
		assert_eq!(
			policy().check_complete(&pending, now).unwrap_err().reason,
			DenialReason::NotReviewed
		);
		let processing = order(OrderStatus::Processing, now);
		assert_eq!(policy().check_complete(&processing, now), Ok(()));
	}
}
