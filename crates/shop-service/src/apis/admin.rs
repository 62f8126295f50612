//! Staff endpoints. Every handler requires the `Admin` extractor.

use super::{admin_order_response, engine_error};
use crate::{identity::Admin, server::AppState};
use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	Json,
};
use serde::Deserialize;
use shop_types::{
	APIError, Fragrance, ListOrdersQuery, ListOrdersResponse, OrderFilter, OrderResponse,
	ReviewRequest, UpsertFragranceRequest, UpsertVariantRequest, Variant,
};
use validator::Validate;

/// Optional note recorded in the audit trail of an admin cancel.
#[derive(Debug, Default, Deserialize)]
pub struct CancelQuery {
	pub reason: Option<String>,
}

/// Handles GET /api/admin/orders.
pub async fn list_orders(
	_: Admin,
	State(state): State<AppState>,
	Query(query): Query<ListOrdersQuery>,
) -> Result<Json<ListOrdersResponse>, APIError> {
	let filter = OrderFilter {
		status: query.status,
		limit: query.limit,
	};
	let orders: Vec<OrderResponse> = state
		.engine
		.list_orders(&filter)
		.await
		.map_err(engine_error("list orders"))?
		.into_iter()
		.map(admin_order_response)
		.collect();
	Ok(Json(ListOrdersResponse {
		count: orders.len(),
		orders,
	}))
}

/// Handles GET /api/admin/orders/{id}.
pub async fn get_order(
	_: Admin,
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, APIError> {
	let outcome = state
		.engine
		.order(id)
		.await
		.map_err(engine_error("admin get order"))?;
	Ok(Json(admin_order_response(outcome)))
}

/// Handles POST /api/admin/orders/{id}/review.
pub async fn set_review(
	_: Admin,
	State(state): State<AppState>,
	Path(id): Path<u64>,
	Json(request): Json<ReviewRequest>,
) -> Result<Json<OrderResponse>, APIError> {
	let outcome = state
		.engine
		.set_review(id, request.reviewed)
		.await
		.map_err(engine_error("set review"))?;
	Ok(Json(admin_order_response(outcome)))
}

/// Handles POST /api/admin/orders/{id}/processing.
pub async fn mark_processing(
	_: Admin,
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, APIError> {
	let outcome = state
		.engine
		.mark_processing(id)
		.await
		.map_err(engine_error("mark processing"))?;
	Ok(Json(admin_order_response(outcome)))
}

/// Handles POST /api/admin/orders/{id}/complete.
pub async fn complete(
	_: Admin,
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, APIError> {
	let outcome = state
		.engine
		.complete(id)
		.await
		.map_err(engine_error("complete order"))?;
	Ok(Json(admin_order_response(outcome)))
}

/// Handles POST /api/admin/orders/{id}/cancel.
pub async fn cancel(
	_: Admin,
	State(state): State<AppState>,
	Path(id): Path<u64>,
	Query(query): Query<CancelQuery>,
) -> Result<Json<OrderResponse>, APIError> {
	let reason = query
		.reason
		.map(|r| r.trim().to_string())
		.filter(|r| !r.is_empty());
	let outcome = state
		.engine
		.admin_cancel(id, reason)
		.await
		.map_err(engine_error("admin cancel"))?;
	Ok(Json(admin_order_response(outcome)))
}

/// Handles DELETE /api/admin/orders/{id}.
pub async fn delete_order(
	_: Admin,
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<StatusCode, APIError> {
	state
		.engine
		.delete_order(id)
		.await
		.map_err(engine_error("delete order"))?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles PUT /api/admin/fragrances.
pub async fn upsert_fragrance(
	_: Admin,
	State(state): State<AppState>,
	Json(request): Json<UpsertFragranceRequest>,
) -> Result<Json<Fragrance>, APIError> {
	request.validate()?;
	let fragrance = state
		.engine
		.upsert_fragrance(request)
		.await
		.map_err(engine_error("upsert fragrance"))?;
	Ok(Json(fragrance))
}

/// Handles PUT /api/admin/variants.
pub async fn upsert_variant(
	_: Admin,
	State(state): State<AppState>,
	Json(request): Json<UpsertVariantRequest>,
) -> Result<Json<Variant>, APIError> {
	request.validate()?;
	let variant = state
		.engine
		.upsert_variant(request)
		.await
		.map_err(engine_error("upsert variant"))?;
	Ok(Json(variant))
}

/// Handles DELETE /api/admin/fragrances/{id}.
pub async fn delete_fragrance(
	_: Admin,
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<StatusCode, APIError> {
	state
		.engine
		.delete_fragrance(id)
		.await
		.map_err(engine_error("delete fragrance"))?;
	Ok(StatusCode::NO_CONTENT)
}
