//! Customer identity and session types.
//!
//! Guests are keyed by IP address, which is weak (shared NAT, spoofable
//! forwarding headers). Authenticated customers carry the user id and email
//! asserted by the upstream auth gateway.

use crate::Order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who is making a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomerIdentity {
	Guest { ip: String },
	Authenticated { user_id: String, email: String },
}

impl CustomerIdentity {
	pub fn guest(ip: impl Into<String>) -> Self {
		Self::Guest { ip: ip.into() }
	}

	pub fn authenticated(user_id: impl Into<String>, email: impl Into<String>) -> Self {
		Self::Authenticated {
			user_id: user_id.into(),
			email: email.into(),
		}
	}

	/// Session keys under which this identity's active order is indexed.
	///
	/// Authenticated customers are indexed both by user id and by email so
	/// that either match finds the order.
	pub fn session_keys(&self) -> Vec<String> {
		match self {
			Self::Guest { ip } => vec![format!("ip:{}", ip)],
			Self::Authenticated { user_id, email } => vec![
				format!("user:{}", user_id),
				format!("email:{}", email.to_lowercase()),
			],
		}
	}

	/// Whether the given order belongs to this identity.
	pub fn owns(&self, order: &Order) -> bool {
		match self {
			Self::Guest { ip } => order.customer_ip.as_deref() == Some(ip.as_str()),
			Self::Authenticated { user_id, email } => {
				order.user_id.as_deref() == Some(user_id.as_str())
					|| order
						.email
						.as_deref()
						.is_some_and(|e| e.eq_ignore_ascii_case(email))
			},
		}
	}

	pub fn user_id(&self) -> Option<&str> {
		match self {
			Self::Authenticated { user_id, .. } => Some(user_id),
			Self::Guest { .. } => None,
		}
	}

	pub fn ip(&self) -> Option<&str> {
		match self {
			Self::Guest { ip } => Some(ip),
			Self::Authenticated { .. } => None,
		}
	}
}

impl fmt::Display for CustomerIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Guest { ip } => write!(f, "guest({})", ip),
			Self::Authenticated { user_id, .. } => write!(f, "user({})", user_id),
		}
	}
}

/// Pointer from a customer key to that customer's active order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerSession {
	pub key: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_ip: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	pub active_order_id: Option<u64>,
	pub updated_at: DateTime<Utc>,
}
