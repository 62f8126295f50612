//! API types for the shop HTTP surface.
//!
//! Request bodies carry `validator` rules that the handlers run before any
//! engine call. Responses never expose the review token.

use crate::{AuditEntry, Order, OrderItem, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Request body for placing an order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlaceOrderRequest {
	#[validate(length(min = 1, max = 200, message = "name is required"))]
	pub customer_name: String,
	#[validate(length(min = 5, max = 32, message = "phone is required"))]
	pub phone: String,
	#[validate(email(message = "email is not valid"))]
	pub email: Option<String>,
	#[validate(length(min = 1, max = 500, message = "address is required"))]
	pub address: String,
	#[validate(length(min = 1, max = 100, message = "city is required"))]
	pub city: String,
	#[validate(length(max = 100))]
	pub region: Option<String>,
	#[validate(length(max = 1000))]
	pub notes: Option<String>,
	#[validate(length(min = 1, max = 50, message = "between 1 and 50 items"), nested)]
	pub items: Vec<OrderLineRequest>,
}

/// One requested line of an order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderLineRequest {
	pub variant_id: u64,
	#[validate(range(min = 1, message = "quantity must be at least 1"))]
	pub quantity: u32,
}

/// Order as returned to customers and admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
	pub id: u64,
	pub order_number: String,
	pub status: OrderStatus,
	pub reviewed: bool,
	pub customer_name: String,
	pub phone: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	pub address: String,
	pub city: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub region: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	pub total_amount: i64,
	pub currency: String,
	pub review_deadline: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub items: Vec<OrderItem>,
	/// Whether the customer may still cancel, computed from the same guard
	/// the cancel operation uses.
	pub can_cancel: bool,
	/// End of the cancellation window while it is still open.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cancel_deadline: Option<DateTime<Utc>>,
	/// Set on operations that dispatch notifications.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notifications_sent: Option<bool>,
	/// Only included on the admin surface.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub audit_log: Option<Vec<AuditEntry>>,
}

impl OrderResponse {
	pub fn new(order: &Order, items: Vec<OrderItem>, can_cancel: bool) -> Self {
		Self {
			id: order.id,
			order_number: order.order_number.clone(),
			status: order.status,
			reviewed: order.reviewed,
			customer_name: order.customer_name.clone(),
			phone: order.phone.clone(),
			email: order.email.clone(),
			address: order.address.clone(),
			city: order.city.clone(),
			region: order.region.clone(),
			notes: order.notes.clone(),
			total_amount: order.total_amount,
			currency: order.currency.clone(),
			review_deadline: order.review_deadline,
			created_at: order.created_at,
			updated_at: order.updated_at,
			items,
			can_cancel,
			cancel_deadline: can_cancel.then_some(order.review_deadline),
			notifications_sent: None,
			audit_log: None,
		}
	}

	pub fn with_notifications(mut self, sent: bool) -> Self {
		self.notifications_sent = Some(sent);
		self
	}

	pub fn with_audit_log(mut self, order: &Order) -> Self {
		self.audit_log = Some(order.audit_log.clone());
		self
	}
}

/// Response for the caller's active order lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveOrderResponse {
	pub has_active_order: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order: Option<OrderResponse>,
}

/// Admin review toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
	pub reviewed: bool,
}

/// Result of following an emailed review link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLinkResponse {
	pub order_number: String,
	pub status: OrderStatus,
	/// True when the order had already been reviewed before this call.
	pub already_reviewed: bool,
}

/// Admin listing query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
	pub status: Option<OrderStatus>,
	pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOrdersResponse {
	pub orders: Vec<OrderResponse>,
	pub count: usize,
}

/// Create (no id) or replace (with id) a fragrance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertFragranceRequest {
	pub id: Option<u64>,
	#[validate(length(min = 1, max = 200))]
	pub name: String,
	#[validate(length(min = 1, max = 200))]
	pub brand: String,
	#[validate(length(max = 5000))]
	pub description: Option<String>,
	#[validate(url)]
	pub image_url: Option<String>,
	#[serde(default)]
	pub hidden: bool,
}

/// Create (no id) or replace (with id) a variant.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertVariantRequest {
	pub id: Option<u64>,
	pub fragrance_id: u64,
	#[validate(length(min = 1, max = 50))]
	pub size_label: String,
	#[validate(range(min = 0))]
	pub price_cents: i64,
	#[serde(default = "default_true")]
	pub in_stock: bool,
	#[serde(default)]
	pub is_whole_bottle: bool,
	#[validate(range(min = 1, max = 1000))]
	pub max_quantity: Option<u32>,
}

fn default_true() -> bool {
	true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub shop_id: String,
}

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Validation errors and denied transitions (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Missing or wrong admin token (401)
	Unauthorized { message: String },
	/// Unknown order, or an order the caller does not own (404)
	NotFound { message: String },
	/// Duplicate active order or terminal order (409)
	Conflict {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Storage backend unreachable (503)
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
}

impl APIError {
	pub fn bad_request(error_type: impl Into<String>, message: impl Into<String>) -> Self {
		APIError::BadRequest {
			error_type: error_type.into(),
			message: message.into(),
			details: None,
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::ServiceUnavailable { .. } => 503,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, details, retry_after) = match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			}
			| APIError::Conflict {
				error_type,
				message,
				details,
			} => (error_type.clone(), message.clone(), details.clone(), None),
			APIError::Unauthorized { message } => {
				("UNAUTHORIZED".to_string(), message.clone(), None, None)
			},
			APIError::NotFound { message } => ("NOT_FOUND".to_string(), message.clone(), None, None),
			APIError::ServiceUnavailable {
				error_type,
				message,
				retry_after,
			} => (error_type.clone(), message.clone(), None, *retry_after),
		};
		ErrorResponse {
			error,
			message,
			details,
			retry_after,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
			APIError::NotFound { message } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl From<validator::ValidationErrors> for APIError {
	fn from(errors: validator::ValidationErrors) -> Self {
		APIError::BadRequest {
			error_type: "VALIDATION_ERROR".to_string(),
			message: "Request validation failed".to_string(),
			details: serde_json::to_value(&errors).ok(),
		}
	}
}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request() -> PlaceOrderRequest {
		PlaceOrderRequest {
			customer_name: "Sara".into(),
			phone: "+96550000000".into(),
			email: Some("sara@example.com".into()),
			address: "Block 1, Street 2".into(),
			city: "Kuwait City".into(),
			region: None,
			notes: None,
			items: vec![OrderLineRequest {
				variant_id: 7,
				quantity: 2,
			}],
		}
	}

	#[test]
	fn test_valid_request_passes() {
		assert!(request().validate().is_ok());
	}

	#[test]
	fn test_empty_items_rejected() {
		let mut req = request();
		req.items.clear();
		assert!(req.validate().is_err());
	}

	#[test]
	fn test_zero_quantity_rejected() {
		let mut req = request();
		req.items[0].quantity = 0;
		assert!(req.validate().is_err());
	}

	#[test]
	fn test_bad_email_rejected() {
		let mut req = request();
		req.email = Some("not-an-email".into());
		assert!(req.validate().is_err());
	}

	#[test]
	fn test_status_codes() {
		assert_eq!(APIError::NotFound { message: "x".into() }.status_code(), 404);
		assert_eq!(APIError::bad_request("X", "y").status_code(), 400);
		let conflict = APIError::Conflict {
			error_type: "DUPLICATE_ACTIVE_ORDER".into(),
			message: "exists".into(),
			details: Some(serde_json::json!({ "order_number": "000001" })),
		};
		assert_eq!(conflict.status_code(), 409);
		assert_eq!(
			conflict.to_error_response().details.unwrap()["order_number"],
			"000001"
		);
	}
}
