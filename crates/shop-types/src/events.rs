//! Order lifecycle events.
//!
//! Events are emitted by the engine after a successful state change and
//! consumed by the notification dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle moments that trigger customer and admin notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
	/// A new order has been placed.
	Created,
	/// An order has been cancelled by the customer or by staff.
	Cancelled,
	/// Staff review status changed.
	Reviewed,
}

impl OrderEvent {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderEvent::Created => "created",
			OrderEvent::Cancelled => "cancelled",
			OrderEvent::Reviewed => "reviewed",
		}
	}
}

impl fmt::Display for OrderEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
