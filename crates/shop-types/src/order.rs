//! Order types for the shop backend.
//!
//! An order is a single customer purchase request. Its line items are written
//! together with it and never change afterwards; only the header moves through
//! the lifecycle (pending -> reviewed/processing -> completed, or cancelled).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Status of an order in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Order has been placed and awaits staff review.
	Pending,
	/// Staff has looked at the order; the customer can no longer cancel it.
	Reviewed,
	/// Order is being prepared for delivery.
	Processing,
	/// Order has been fulfilled.
	Completed,
	/// Order was cancelled by the customer or by staff.
	Cancelled,
}

impl OrderStatus {
	/// Returns the string representation used in storage and on the wire.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Reviewed => "reviewed",
			OrderStatus::Processing => "processing",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Active orders count towards the one-active-order-per-customer rule.
	pub fn is_active(&self) -> bool {
		matches!(
			self,
			OrderStatus::Pending | OrderStatus::Reviewed | OrderStatus::Processing
		)
	}

	/// Terminal orders accept no further transitions and may be deleted.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}

	/// Value of the `reviewed` flag an order carries once it is in this
	/// status. Cancelling clears the flag, so an admin cancel of a reviewed
	/// order records the unmark in the same write.
	pub fn reviewed_flag(&self) -> bool {
		matches!(
			self,
			OrderStatus::Reviewed | OrderStatus::Processing | OrderStatus::Completed
		)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"pending" => Ok(Self::Pending),
			"reviewed" => Ok(Self::Reviewed),
			"processing" => Ok(Self::Processing),
			"completed" => Ok(Self::Completed),
			"cancelled" | "canceled" => Ok(Self::Cancelled),
			other => Err(format!("unknown order status '{}'", other)),
		}
	}
}

/// Why a requested transition was refused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
	AlreadyCancelled,
	AlreadyCompleted,
	/// Staff has reviewed the order, so the customer can no longer cancel.
	AlreadyReviewed,
	/// The customer cancellation window has closed.
	WindowExpired,
	NotPending,
	/// Completion requires a reviewed or processing order.
	NotReviewed,
}

impl DenialReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			DenialReason::AlreadyCancelled => "already_cancelled",
			DenialReason::AlreadyCompleted => "already_completed",
			DenialReason::AlreadyReviewed => "already_reviewed",
			DenialReason::WindowExpired => "window_expired",
			DenialReason::NotPending => "not_pending",
			DenialReason::NotReviewed => "not_reviewed",
		}
	}

	/// Reason reported when a terminal order is asked to move again.
	pub fn for_terminal(status: OrderStatus) -> Option<Self> {
		match status {
			OrderStatus::Cancelled => Some(DenialReason::AlreadyCancelled),
			OrderStatus::Completed => Some(DenialReason::AlreadyCompleted),
			_ => None,
		}
	}
}

impl fmt::Display for DenialReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Who triggered a lifecycle change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
	Customer,
	Admin,
	ReviewLink,
}

impl fmt::Display for Actor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Actor::Customer => "customer",
			Actor::Admin => "admin",
			Actor::ReviewLink => "review_link",
		};
		f.write_str(s)
	}
}

/// Machine-readable record of a status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
	pub at: DateTime<Utc>,
	pub actor: Actor,
	pub action: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub from: Option<OrderStatus>,
	pub to: OrderStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

/// Audit note supplied alongside a status update.
#[derive(Debug, Clone)]
pub struct AuditNote {
	pub actor: Actor,
	pub action: String,
	pub reason: Option<String>,
}

impl AuditNote {
	pub fn new(actor: Actor, action: impl Into<String>) -> Self {
		Self {
			actor,
			action: action.into(),
			reason: None,
		}
	}

	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());
		self
	}
}

/// A customer purchase request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Numeric identifier assigned by the repository.
	pub id: u64,
	/// Human-facing display form of the id.
	pub order_number: String,
	/// Set for authenticated customers.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	/// Set for guests, and recorded for authenticated customers when known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_ip: Option<String>,
	pub customer_name: String,
	pub phone: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	pub address: String,
	pub city: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub region: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	pub status: OrderStatus,
	/// Staff review guard, kept alongside `status`.
	pub reviewed: bool,
	/// Sum of line totals in minor currency units.
	pub total_amount: i64,
	pub currency: String,
	/// End of the customer cancellation window.
	pub review_deadline: DateTime<Utc>,
	/// Secret used by the emailed review link.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub review_token: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	/// Customer session keys pointed at this order while it is active.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub session_keys: Vec<String>,
	#[serde(default)]
	pub audit_log: Vec<AuditEntry>,
}

/// One purchased variant within an order.
///
/// Fragrance and variant fields are copied at order time so historical
/// orders stay stable when the catalog changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
	pub id: Uuid,
	pub order_id: u64,
	pub fragrance_id: u64,
	pub variant_id: u64,
	pub fragrance_name: String,
	pub fragrance_brand: String,
	pub size_label: String,
	pub quantity: u32,
	pub unit_price_cents: i64,
	pub total_price_cents: i64,
	pub is_whole_bottle: bool,
}

/// Order header fields before the repository assigns an id.
#[derive(Debug, Clone)]
pub struct NewOrder {
	pub user_id: Option<String>,
	pub customer_ip: Option<String>,
	pub customer_name: String,
	pub phone: String,
	pub email: Option<String>,
	pub address: String,
	pub city: String,
	pub region: Option<String>,
	pub notes: Option<String>,
	pub total_amount: i64,
	pub currency: String,
	pub review_token: String,
	pub created_at: DateTime<Utc>,
	pub review_deadline: DateTime<Utc>,
}

/// Line item fields before the repository assigns ids.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
	pub fragrance_id: u64,
	pub variant_id: u64,
	pub fragrance_name: String,
	pub fragrance_brand: String,
	pub size_label: String,
	pub quantity: u32,
	pub unit_price_cents: i64,
}

impl NewOrderItem {
	pub fn total_price_cents(&self) -> i64 {
		self.unit_price_cents * i64::from(self.quantity)
	}
}

/// An order together with its line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
	pub order: Order,
	pub items: Vec<OrderItem>,
}

/// Filter for listing orders on the admin surface.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
	pub status: Option<OrderStatus>,
	pub limit: Option<usize>,
}
