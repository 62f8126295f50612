//! Notifier that writes messages to the log instead of sending them.
//!
//! Intended for development and for deployments where email is handled
//! out of band.

use crate::{EmailMessage, NotifierInterface, NotifyError};
use async_trait::async_trait;
use shop_types::{
	truncate_id, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};

pub struct LogNotifier {
	/// Log message bodies as well as headers.
	include_body: bool,
}

impl LogNotifier {
	pub fn new(include_body: bool) -> Self {
		Self { include_body }
	}
}

#[async_trait]
impl NotifierInterface for LogNotifier {
	async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
		let message_id = correlation_id(message);
		if self.include_body {
			tracing::info!(
				message_id = %message_id,
				from = %message.from,
				to = ?message.to,
				subject = %message.subject,
				body = %message.text,
				"Email (log only)"
			);
		} else {
			tracing::info!(
				message_id = %message_id,
				from = %message.from,
				to = ?message.to,
				subject = %message.subject,
				"Email (log only)"
			);
		}
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogNotifierSchema)
	}
}

/// Short stable id so repeated log lines for one message can be correlated.
fn correlation_id(message: &EmailMessage) -> String {
	use std::hash::{DefaultHasher, Hash, Hasher};
	let mut hasher = DefaultHasher::new();
	message.subject.hash(&mut hasher);
	message.to.hash(&mut hasher);
	truncate_id(&format!("{:016x}", hasher.finish()))
}

pub struct LogNotifierSchema;

impl ConfigSchema for LogNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![Field::new("include_body", FieldType::Boolean)]).validate(config)
	}
}

/// Configuration parameters:
/// - `include_body`: also log the message text (default: false)
pub fn create_notifier(config: &toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError> {
	LogNotifierSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;
	let include_body = config
		.get("include_body")
		.and_then(|v| v.as_bool())
		.unwrap_or(false);
	Ok(Box::new(LogNotifier::new(include_body)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = crate::NotifierFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl crate::NotifierRegistry for Registry {}
