//! HTTP handlers.
//!
//! Handlers validate request bodies, call the engine and translate
//! `EngineError` into the `APIError` response taxonomy.

pub mod admin;
pub mod catalog;
pub mod orders;

use serde_json::json;
use shop_core::{ConflictKind, EngineError, OrderOutcome};
use shop_types::{APIError, DenialReason, OrderResponse};

/// Maps an engine failure to its HTTP error, logging it under `operation`.
///
/// Orders owned by someone else are reported exactly like missing ones.
pub(crate) fn engine_error(operation: &'static str) -> impl FnOnce(EngineError) -> APIError {
	move |err| {
		match &err {
			EngineError::UpstreamUnavailable(detail) => {
				tracing::error!(operation, error = %detail, "Request failed upstream");
			},
			_ => tracing::warn!(operation, error = %err, "Request failed"),
		}
		to_api_error(err)
	}
}

fn to_api_error(err: EngineError) -> APIError {
	match err {
		EngineError::NotFound(_) | EngineError::NotOwned(_) => APIError::NotFound {
			message: err.to_string(),
		},
		EngineError::Conflict(kind) => {
			let message = kind.to_string();
			let (error_type, details) = match kind {
				ConflictKind::DuplicateActiveOrder { order_number } => (
					"DUPLICATE_ACTIVE_ORDER",
					Some(json!({ "order_number": order_number })),
				),
				ConflictKind::AlreadyTerminal { status } => {
					("ORDER_TERMINAL", Some(json!({ "status": status })))
				},
				ConflictKind::NotTerminal { status } => {
					("ORDER_NOT_TERMINAL", Some(json!({ "status": status })))
				},
				ConflictKind::InvalidTransition { from, to } => (
					"STALE_TRANSITION",
					Some(json!({ "from": from, "to": to })),
				),
			};
			APIError::Conflict {
				error_type: error_type.to_string(),
				message,
				details,
			}
		},
		EngineError::Validation(message) => APIError::BadRequest {
			error_type: "VALIDATION_ERROR".to_string(),
			message,
			details: None,
		},
		EngineError::TransitionDenied {
			reason,
			elapsed_minutes,
		} => APIError::BadRequest {
			error_type: "TRANSITION_DENIED".to_string(),
			message: denial_message(reason, elapsed_minutes),
			details: Some(json!({
				"reason": reason,
				"elapsed_minutes": elapsed_minutes,
				"elapsed_hours": elapsed_hours(elapsed_minutes),
			})),
		},
		EngineError::UpstreamUnavailable(_) => APIError::ServiceUnavailable {
			error_type: "STORAGE_UNAVAILABLE".to_string(),
			message: "The order store is temporarily unavailable".to_string(),
			retry_after: Some(5),
		},
	}
}

/// Hours rounded to one decimal place.
fn elapsed_hours(elapsed_minutes: i64) -> f64 {
	(elapsed_minutes as f64 / 6.0).round() / 10.0
}

fn denial_message(reason: DenialReason, elapsed_minutes: i64) -> String {
	match reason {
		DenialReason::AlreadyCancelled => "Order is already cancelled".to_string(),
		DenialReason::AlreadyCompleted => "Order is already completed".to_string(),
		DenialReason::AlreadyReviewed => {
			"Order has been reviewed by staff and can no longer be cancelled".to_string()
		},
		DenialReason::WindowExpired => format!(
			"Cancellation window has passed; order was placed {:.1} hours ago",
			elapsed_hours(elapsed_minutes)
		),
		DenialReason::NotPending => "Order is no longer pending".to_string(),
		DenialReason::NotReviewed => "Order must be reviewed before it can be completed".to_string(),
	}
}

/// Customer-facing view of an engine outcome.
pub(crate) fn order_response(outcome: OrderOutcome) -> OrderResponse {
	let response = OrderResponse::new(&outcome.order, outcome.items, outcome.can_cancel);
	match outcome.notifications_sent {
		Some(sent) => response.with_notifications(sent),
		None => response,
	}
}

/// Staff view of an engine outcome, including the audit trail.
pub(crate) fn admin_order_response(outcome: OrderOutcome) -> OrderResponse {
	let order = outcome.order.clone();
	order_response(outcome).with_audit_log(&order)
}
