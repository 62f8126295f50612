//! Configuration for the fragrance shop backend.
//!
//! Configuration is read from TOML. `${VAR}` and `${VAR:-default}` references
//! are substituted from the environment before parsing, and a file may pull in
//! others with `include = ["storage.toml", ...]`. Each top-level section must
//! appear in exactly one file.

mod loader;

pub use loader::ConfigLoader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use shop_types::SecretString;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default Display dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Shop identity and order lifecycle rules.
	pub shop: ShopConfig,
	/// Persistence backend.
	pub storage: StorageConfig,
	/// Admin and customer notifications.
	pub notifications: NotificationsConfig,
	/// HTTP server; the service runs without one when absent.
	pub api: Option<ApiConfig>,
}

/// Shop identity and lifecycle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShopConfig {
	pub id: String,
	/// ISO currency code shown next to amounts.
	#[serde(default = "default_currency")]
	pub currency: String,
	/// Minor units per major unit (1000 fils per dinar).
	#[serde(default = "default_minor_units")]
	pub minor_units: u32,
	/// How long after placement a customer may cancel an unreviewed order.
	#[serde(default = "default_cancellation_window_minutes")]
	pub cancellation_window_minutes: u64,
	/// Lifetime of the review link sent to admins.
	#[serde(default = "default_review_link_window_minutes")]
	pub review_link_window_minutes: u64,
	/// Quantity cap for variants without their own `max_quantity`.
	#[serde(default = "default_max_quantity")]
	pub default_max_quantity: u32,
	/// Zero-padding width of the display order number.
	#[serde(default = "default_order_number_width")]
	pub order_number_width: usize,
	/// Base URL used to build links in notification emails.
	#[serde(default = "default_public_url")]
	pub public_url: String,
}

fn default_currency() -> String {
	"KWD".to_string()
}

fn default_minor_units() -> u32 {
	1000
}

fn default_cancellation_window_minutes() -> u64 {
	60
}

fn default_review_link_window_minutes() -> u64 {
	720 // 12 hours
}

fn default_max_quantity() -> u32 {
	50
}

fn default_order_number_width() -> usize {
	6
}

fn default_public_url() -> String {
	"http://127.0.0.1:3000".to_string()
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Raw per-implementation tables, validated by each backend's schema.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	#[serde(default = "default_cleanup_interval")]
	pub cleanup_interval_seconds: u64,
}

fn default_cleanup_interval() -> u64 {
	3600
}

/// Configuration for notification delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
	/// From-address of outgoing emails.
	pub sender: String,
	/// Staff addresses that receive admin notifications.
	#[serde(default)]
	pub admin_recipients: Vec<String>,
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// Shared secret expected in the `x-admin-token` header.
	pub admin_token: Option<SecretString>,
	/// Take guest IPs from `x-forwarded-for` / `x-real-ip`. Enable only
	/// behind a proxy that overwrites these headers.
	#[serde(default)]
	pub trust_forwarded_for: bool,
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
	#[serde(default)]
	pub allowed_headers: Vec<String>,
	#[serde(default)]
	pub allowed_methods: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Substitutes `${VAR}` and `${VAR:-default}` with environment values.
///
/// Input is capped at 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let result = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let var_name = &caps[1];
		match (std::env::var(var_name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(var_name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			var_name
		))),
		None => Ok(result.into_owned()),
	}
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Cross-field checks that serde defaults cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		let shop = &self.shop;
		if shop.id.trim().is_empty() {
			return Err(ConfigError::Validation("Shop ID cannot be empty".into()));
		}
		if shop.currency.trim().is_empty() {
			return Err(ConfigError::Validation("Shop currency cannot be empty".into()));
		}
		if shop.minor_units == 0 {
			return Err(ConfigError::Validation(
				"minor_units must be at least 1".into(),
			));
		}
		if shop.cancellation_window_minutes == 0 {
			return Err(ConfigError::Validation(
				"cancellation_window_minutes must be greater than 0".into(),
			));
		}
		if shop.review_link_window_minutes == 0 {
			return Err(ConfigError::Validation(
				"review_link_window_minutes must be greater than 0".into(),
			));
		}
		if !(1..=1000).contains(&shop.default_max_quantity) {
			return Err(ConfigError::Validation(
				"default_max_quantity must be between 1 and 1000".into(),
			));
		}
		if shop.order_number_width > 20 {
			return Err(ConfigError::Validation(
				"order_number_width cannot exceed 20".into(),
			));
		}

		// Storage
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		// Notifications
		if self.notifications.sender.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Notification sender cannot be empty".into(),
			));
		}
		if !self
			.notifications
			.implementations
			.contains_key(&self.notifications.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary notifier '{}' not found in implementations",
				self.notifications.primary
			)));
		}

		if let Some(api) = self.api.as_ref().filter(|api| api.enabled) {
			match &api.admin_token {
				Some(token) if !token.is_empty() => {},
				_ => {
					return Err(ConfigError::Validation(
						"api.admin_token is required when the API is enabled".into(),
					))
				},
			}
			if api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"api.max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment references and validating
/// the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[shop]
id = "oud-house"

[storage]
primary = "memory"
cleanup_interval_seconds = 600
[storage.implementations.memory]

[notifications]
sender = "orders@oud-house.test"
admin_recipients = ["staff@oud-house.test"]
primary = "log"
[notifications.implementations.log]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("SHOP_TEST_HOST", "localhost");
		std::env::set_var("SHOP_TEST_PORT", "8080");

		let result = resolve_env_vars("host = \"${SHOP_TEST_HOST}:${SHOP_TEST_PORT}\"").unwrap();
		assert_eq!(result, "host = \"localhost:8080\"");

		std::env::remove_var("SHOP_TEST_HOST");
		std::env::remove_var("SHOP_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let result = resolve_env_vars("value = \"${SHOP_MISSING_VAR:-fallback}\"").unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${SHOP_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("SHOP_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.shop.currency, "KWD");
		assert_eq!(config.shop.minor_units, 1000);
		assert_eq!(config.shop.cancellation_window_minutes, 60);
		assert_eq!(config.shop.review_link_window_minutes, 720);
		assert_eq!(config.shop.default_max_quantity, 50);
		assert_eq!(config.shop.order_number_width, 6);
		assert!(config.api.is_none());
	}

	#[test]
	fn test_unknown_primary_storage_rejected() {
		let input = BASE.replace("primary = \"memory\"", "primary = \"file\"");
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary storage 'file'"));
	}

	#[test]
	fn test_zero_cancellation_window_rejected() {
		let input = BASE.replace(
			"id = \"oud-house\"",
			"id = \"oud-house\"\ncancellation_window_minutes = 0",
		);
		assert!(input.parse::<Config>().is_err());
	}

	#[test]
	fn test_max_quantity_bounds() {
		let input = BASE.replace(
			"id = \"oud-house\"",
			"id = \"oud-house\"\ndefault_max_quantity = 5000",
		);
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("default_max_quantity"));
	}

	#[test]
	fn test_enabled_api_requires_admin_token() {
		let input = format!("{}\n[api]\nenabled = true\n", BASE);
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("admin_token"));

		let input = format!("{}\n[api]\nenabled = true\nadmin_token = \"s3cret\"\n", BASE);
		let config: Config = input.parse().unwrap();
		let api = config.api.unwrap();
		assert!(api.admin_token.unwrap().matches("s3cret"));
		assert_eq!(api.port, 3000);
		assert!(!api.trust_forwarded_for);
	}

	#[test]
	fn test_admin_token_from_env() {
		std::env::set_var("SHOP_TEST_ADMIN_TOKEN", "from-env");
		let input = format!(
			"{}\n[api]\nenabled = true\nadmin_token = \"${{SHOP_TEST_ADMIN_TOKEN}}\"\n",
			BASE
		);
		let config: Config = input.parse().unwrap();
		assert!(config.api.unwrap().admin_token.unwrap().matches("from-env"));
		std::env::remove_var("SHOP_TEST_ADMIN_TOKEN");
	}
}
