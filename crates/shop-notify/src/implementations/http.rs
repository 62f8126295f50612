//! Notifier that posts messages to an email provider's HTTP API.
//!
//! The request is a JSON body `{ from, to, subject, text }` sent with a
//! bearer API key, which matches the transactional-email APIs of the common
//! providers. Each send is a single attempt.

use crate::{EmailMessage, NotifierInterface, NotifyError};
use async_trait::async_trait;
use shop_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SecretString, ValidationError,
};
use std::time::Duration;

pub struct HttpNotifier {
	client: reqwest::Client,
	endpoint: String,
	api_key: SecretString,
}

impl HttpNotifier {
	pub fn new(
		endpoint: String,
		api_key: SecretString,
		timeout: Duration,
	) -> Result<Self, NotifyError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				NotifyError::Configuration(format!("Failed to build HTTP client: {}", e))
			})?;
		Ok(Self {
			client,
			endpoint,
			api_key,
		})
	}
}

#[async_trait]
impl NotifierInterface for HttpNotifier {
	async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
		let response = self
			.client
			.post(&self.endpoint)
			.bearer_auth(self.api_key.expose_secret())
			.json(message)
			.send()
			.await
			.map_err(|e| NotifyError::Delivery(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(NotifyError::Rejected {
				status: status.as_u16(),
				body: body.chars().take(200).collect(),
			});
		}

		tracing::debug!(subject = %message.subject, status = status.as_u16(), "Email accepted");
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpNotifierSchema)
	}
}

pub struct HttpNotifierSchema;

impl ConfigSchema for HttpNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("endpoint", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("endpoint must be an http(s) URL".to_string()),
					}
				}),
				Field::new("api_key", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(key) if !key.trim().is_empty() => Ok(()),
						_ => Err("api_key cannot be empty".to_string()),
					}
				}),
			],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(120),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Configuration parameters:
/// - `endpoint`: provider URL messages are POSTed to
/// - `api_key`: bearer token for the provider
/// - `timeout_seconds`: request timeout (default: 10)
pub fn create_notifier(config: &toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError> {
	HttpNotifierSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;

	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.ok_or_else(|| NotifyError::Configuration("endpoint is required".into()))?;
	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| NotifyError::Configuration("api_key is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(10) as u64;

	Ok(Box::new(HttpNotifier::new(
		endpoint.to_string(),
		SecretString::from(api_key),
		Duration::from_secs(timeout),
	)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = crate::NotifierFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl crate::NotifierRegistry for Registry {}
