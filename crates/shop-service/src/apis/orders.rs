//! Customer-facing order endpoints.

use super::{engine_error, order_response};
use crate::{identity::Customer, server::AppState};
use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use shop_types::{
	APIError, ActiveOrderResponse, OrderResponse, PlaceOrderRequest, ReviewLinkResponse,
};
use validator::Validate;

/// Handles POST /api/orders.
pub async fn place_order(
	State(state): State<AppState>,
	Customer(identity): Customer,
	Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), APIError> {
	request.validate()?;
	let outcome = state
		.engine
		.place_order(&identity, request)
		.await
		.map_err(engine_error("place order"))?;
	Ok((StatusCode::CREATED, Json(order_response(outcome))))
}

/// Handles GET /api/orders/active.
pub async fn active_order(
	State(state): State<AppState>,
	Customer(identity): Customer,
) -> Result<Json<ActiveOrderResponse>, APIError> {
	let active = state
		.engine
		.active_order_for(&identity)
		.await
		.map_err(engine_error("active order"))?;
	Ok(Json(ActiveOrderResponse {
		has_active_order: active.is_some(),
		order: active.map(order_response),
	}))
}

/// Handles GET /api/orders/{id}.
pub async fn get_order(
	State(state): State<AppState>,
	Customer(identity): Customer,
	Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, APIError> {
	let outcome = state
		.engine
		.order_for(&identity, id)
		.await
		.map_err(engine_error("get order"))?;
	Ok(Json(order_response(outcome)))
}

/// Handles POST /api/orders/{id}/cancel.
pub async fn cancel_order(
	State(state): State<AppState>,
	Customer(identity): Customer,
	Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, APIError> {
	let outcome = state
		.engine
		.cancel_order(&identity, id)
		.await
		.map_err(engine_error("cancel order"))?;
	Ok(Json(order_response(outcome)))
}

/// Handles GET /api/review/{token}, the link in the admin notification.
pub async fn review_link(
	State(state): State<AppState>,
	Path(token): Path<String>,
) -> Result<Json<ReviewLinkResponse>, APIError> {
	let outcome = state
		.engine
		.review_by_token(&token)
		.await
		.map_err(engine_error("review link"))?;
	Ok(Json(ReviewLinkResponse {
		order_number: outcome.order.order_number,
		status: outcome.order.status,
		already_reviewed: outcome.already_reviewed,
	}))
}
