//! Customer identity resolution and admin authentication.
//!
//! Authenticated customers are asserted by the upstream auth gateway through
//! the `x-user-id` and `x-user-email` headers. Everyone else is a guest keyed
//! by IP address. Guest identity is weak: addresses are shared behind NAT,
//! and forwarding headers are only as trustworthy as the proxy in front of
//! this service.

use crate::server::AppState;
use axum::{
	extract::{ConnectInfo, FromRequestParts},
	http::{request::Parts, HeaderMap},
};
use shop_types::{APIError, CustomerIdentity};
use std::net::SocketAddr;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// The identity of the customer making a request.
#[derive(Debug, Clone)]
pub struct Customer(pub CustomerIdentity);

impl FromRequestParts<AppState> for Customer {
	type Rejection = APIError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, APIError> {
		let peer = parts
			.extensions
			.get::<ConnectInfo<SocketAddr>>()
			.map(|ConnectInfo(addr)| *addr);
		resolve(&parts.headers, peer, state.trust_forwarded_for)
			.map(Customer)
			.ok_or_else(|| {
				tracing::warn!("Request without a resolvable customer identity");
				APIError::bad_request("IDENTITY_REQUIRED", "Unable to identify the customer")
			})
	}
}

/// Marker extractor for requests carrying a valid admin token.
#[derive(Debug, Clone, Copy)]
pub struct Admin;

impl FromRequestParts<AppState> for Admin {
	type Rejection = APIError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, APIError> {
		let Some(expected) = state.admin_token.as_ref().filter(|t| !t.is_empty()) else {
			return Err(APIError::Unauthorized {
				message: "Admin access is not configured".to_string(),
			});
		};
		match header(&parts.headers, ADMIN_TOKEN_HEADER) {
			Some(candidate) if expected.matches(candidate) => Ok(Admin),
			_ => {
				tracing::warn!(path = %parts.uri.path(), "Rejected admin request");
				Err(APIError::Unauthorized {
					message: "Invalid or missing admin token".to_string(),
				})
			},
		}
	}
}

/// Resolves the caller's identity from request headers and the peer address.
///
/// Returns `None` only when the caller is unauthenticated and no IP can be
/// determined.
pub fn resolve(
	headers: &HeaderMap,
	peer: Option<SocketAddr>,
	trust_forwarded_for: bool,
) -> Option<CustomerIdentity> {
	if let (Some(user_id), Some(email)) = (
		header(headers, USER_ID_HEADER),
		header(headers, USER_EMAIL_HEADER),
	) {
		return Some(CustomerIdentity::authenticated(user_id, email));
	}

	if trust_forwarded_for {
		let forwarded = header(headers, "x-forwarded-for")
			.and_then(|value| value.split(',').next())
			.map(str::trim)
			.filter(|ip| !ip.is_empty());
		if let Some(ip) = forwarded.or_else(|| header(headers, "x-real-ip")) {
			return Some(CustomerIdentity::guest(ip));
		}
	}

	peer.map(|addr| CustomerIdentity::guest(addr.ip().to_string()))
}

/// A header's trimmed value, if present, valid UTF-8 and non-empty.
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
}
