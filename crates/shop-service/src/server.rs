//! HTTP server for the shop API.
//!
//! Public routes serve the storefront and the customer's own orders. Admin
//! routes live under `/api/admin` and require the `x-admin-token` header.

use crate::apis::{admin, catalog, orders};
use axum::{
	extract::{DefaultBodyLimit, State},
	http::{HeaderName, HeaderValue, Method, StatusCode},
	routing::{delete, get, post, put},
	Json, Router,
};
use shop_config::{ApiConfig, CorsConfig};
use shop_core::OrderEngine;
use shop_types::{HealthResponse, SecretString};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Engine serving every order and catalog operation.
	pub engine: Arc<OrderEngine>,
	/// Expected `x-admin-token` value. Admin routes are closed when unset.
	pub admin_token: Option<SecretString>,
	/// Whether guest IPs are read from forwarding headers.
	pub trust_forwarded_for: bool,
}

impl AppState {
	pub fn new(engine: Arc<OrderEngine>, api_config: &ApiConfig) -> Self {
		Self {
			engine,
			admin_token: api_config.admin_token.clone(),
			trust_forwarded_for: api_config.trust_forwarded_for,
		}
	}
}

/// Builds the application router with its middleware stack.
pub fn router(state: AppState, api_config: &ApiConfig) -> Router {
	let api = Router::new()
		.route("/orders", post(orders::place_order))
		.route("/orders/active", get(orders::active_order))
		.route("/orders/{id}", get(orders::get_order))
		.route("/orders/{id}/cancel", post(orders::cancel_order))
		.route("/review/{token}", get(orders::review_link))
		.route("/fragrances", get(catalog::list_fragrances))
		.route("/fragrances/{id}", get(catalog::get_fragrance))
		.route("/admin/orders", get(admin::list_orders))
		.route(
			"/admin/orders/{id}",
			get(admin::get_order).delete(admin::delete_order),
		)
		.route("/admin/orders/{id}/review", post(admin::set_review))
		.route("/admin/orders/{id}/processing", post(admin::mark_processing))
		.route("/admin/orders/{id}/complete", post(admin::complete))
		.route("/admin/orders/{id}/cancel", post(admin::cancel))
		.route("/admin/fragrances", put(admin::upsert_fragrance))
		.route("/admin/fragrances/{id}", delete(admin::delete_fragrance))
		.route("/admin/variants", put(admin::upsert_variant));

	Router::new()
		.route("/health", get(health))
		.nest("/api", api)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::with_status_code(
					StatusCode::REQUEST_TIMEOUT,
					Duration::from_secs(api_config.timeout_seconds),
				))
				.layer(cors_layer(api_config.cors.as_ref()))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

/// Permissive when no `[api.cors]` section is configured.
fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors else {
		return CorsLayer::permissive();
	};

	let origins = if cors.allowed_origins.iter().any(|o| o == "*") {
		AllowOrigin::from(Any)
	} else {
		AllowOrigin::list(
			cors.allowed_origins
				.iter()
				.filter_map(|o| o.parse::<HeaderValue>().ok()),
		)
	};
	let mut layer = CorsLayer::new().allow_origin(origins);

	if cors.allowed_methods.is_empty() {
		layer = layer.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);
	} else {
		layer = layer.allow_methods(
			cors.allowed_methods
				.iter()
				.filter_map(|m| m.parse::<Method>().ok())
				.collect::<Vec<_>>(),
		);
	}

	if cors.allowed_headers.is_empty() {
		layer.allow_headers(Any)
	} else {
		layer.allow_headers(
			cors.allowed_headers
				.iter()
				.filter_map(|h| h.parse::<HeaderName>().ok())
				.collect::<Vec<_>>(),
		)
	}
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<OrderEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	if api_config.trust_forwarded_for {
		tracing::info!("Guest IPs are taken from x-forwarded-for / x-real-ip");
	}
	if api_config.admin_token.is_none() {
		tracing::warn!("No admin token configured - admin endpoints will reject every request");
	}

	let state = AppState::new(engine, &api_config);
	let app = router(state, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Shop API server starting on {}", bind_address);

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.await?;

	Ok(())
}

/// Handles GET /health.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		shop_id: state.engine.config().shop.id.clone(),
	})
}
