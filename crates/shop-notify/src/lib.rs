//! Notification dispatch for order lifecycle events.
//!
//! A `NotifierInterface` backend delivers plain-text emails; the
//! `NotificationService` decides who gets which message for each event.
//! Delivery is best effort: failures are logged and reported as a boolean,
//! never as an error to the caller.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use shop_types::{ConfigSchema, ImplementationRegistry, Order, OrderEvent, OrderItem};
use thiserror::Error;

pub mod templates;

pub mod implementations {
	pub mod http;
	pub mod log;
}

pub use templates::TemplateContext;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
	#[error("Delivery failed: {0}")]
	Delivery(String),
	#[error("Provider rejected message: {status} {body}")]
	Rejected { status: u16, body: String },
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A rendered plain-text email.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailMessage {
	pub from: String,
	pub to: Vec<String>,
	pub subject: String,
	pub text: String,
}

/// Interface implemented by notification delivery backends.
#[async_trait]
pub trait NotifierInterface: Send + Sync {
	async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;

	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

pub type NotifierFactory = fn(&toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError>;

pub trait NotifierRegistry: ImplementationRegistry<Factory = NotifierFactory> {}

/// All built-in notifiers as (config name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, NotifierFactory)> {
	use implementations::{http, log};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(log::Registry::NAME, log::Registry::factory()),
	]
}

/// Routes lifecycle events to admin and customer recipients.
pub struct NotificationService {
	notifier: Box<dyn NotifierInterface>,
	sender: String,
	admin_recipients: Vec<String>,
	context: TemplateContext,
}

impl NotificationService {
	pub fn new(
		notifier: Box<dyn NotifierInterface>,
		sender: String,
		admin_recipients: Vec<String>,
		context: TemplateContext,
	) -> Self {
		Self {
			notifier,
			sender,
			admin_recipients,
			context,
		}
	}

	/// Builds the messages an event produces for this order.
	pub fn messages_for(
		&self,
		event: OrderEvent,
		order: &Order,
		items: &[OrderItem],
	) -> Vec<EmailMessage> {
		let mut messages = Vec::with_capacity(2);
		if !self.admin_recipients.is_empty() {
			let (subject, text) = templates::admin(event, order, items, &self.context);
			messages.push(EmailMessage {
				from: self.sender.clone(),
				to: self.admin_recipients.clone(),
				subject,
				text,
			});
		}
		if let Some(email) = order.email.as_ref().filter(|e| !e.trim().is_empty()) {
			let (subject, text) = templates::customer(event, order, items, &self.context);
			messages.push(EmailMessage {
				from: self.sender.clone(),
				to: vec![email.clone()],
				subject,
				text,
			});
		}
		messages
	}

	/// Sends every message for the event.
	///
	/// Returns true when at least one message went out and none failed.
	pub async fn notify(&self, event: OrderEvent, order: &Order, items: &[OrderItem]) -> bool {
		let messages = self.messages_for(event, order, items);
		if messages.is_empty() {
			tracing::debug!(
				order_id = order.id,
				event = %event,
				"No notification recipients"
			);
			return false;
		}

		let results = join_all(messages.iter().map(|m| self.notifier.send(m))).await;
		let mut all_sent = true;
		for (message, result) in messages.iter().zip(results) {
			if let Err(e) = result {
				all_sent = false;
				tracing::warn!(
					order_id = order.id,
					event = %event,
					subject = %message.subject,
					error = %e,
					"Notification failed"
				);
			}
		}
		all_sent
	}
}
