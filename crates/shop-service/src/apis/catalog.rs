//! Public catalog endpoints.

use super::engine_error;
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	Json,
};
use shop_types::{APIError, FragranceWithVariants};

/// Handles GET /api/fragrances.
pub async fn list_fragrances(
	State(state): State<AppState>,
) -> Result<Json<Vec<FragranceWithVariants>>, APIError> {
	let fragrances = state
		.engine
		.list_fragrances()
		.await
		.map_err(engine_error("list fragrances"))?;
	Ok(Json(fragrances))
}

/// Handles GET /api/fragrances/{id}.
pub async fn get_fragrance(
	State(state): State<AppState>,
	Path(id): Path<u64>,
) -> Result<Json<FragranceWithVariants>, APIError> {
	let fragrance = state
		.engine
		.fragrance(id)
		.await
		.map_err(engine_error("get fragrance"))?;
	Ok(Json(fragrance))
}
