//! Order lifecycle engine.
//!
//! `OrderEngine` is the single entry point for every order and catalog
//! operation. Each operation loads the current state through the
//! repositories, applies the `LifecyclePolicy` guard, writes through
//! `OrderRepository::update_status` and then dispatches notifications, which
//! can never fail the operation.

pub mod catalog;
pub mod lifecycle;
mod placement;
mod queries;
mod transitions;

use crate::policy::{Denial, LifecyclePolicy};
use crate::state::{CatalogRepository, OrderRepository, RepositoryError};
use shop_config::Config;
use shop_notify::NotificationService;
use shop_storage::StorageService;
use shop_types::{Clock, DenialReason, Order, OrderItem, OrderStatus};
use std::sync::Arc;
use thiserror::Error;

/// Why an operation conflicts with the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictKind {
	#[error("Customer already has active order {order_number}")]
	DuplicateActiveOrder { order_number: String },
	#[error("Order is already {status}")]
	AlreadyTerminal { status: OrderStatus },
	#[error("Order is {status}; only completed or cancelled orders can be deleted")]
	NotTerminal { status: OrderStatus },
	#[error("Order moved from {from} before {to} could be applied")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
}

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("{0} not found")]
	NotFound(String),
	/// The order exists but belongs to someone else. Displays exactly like
	/// the `NotFound` of a missing order.
	#[error("Order {0} not found")]
	NotOwned(u64),
	#[error("{0}")]
	Conflict(ConflictKind),
	#[error("Validation failed: {0}")]
	Validation(String),
	#[error("Transition denied: {reason}")]
	TransitionDenied {
		reason: DenialReason,
		elapsed_minutes: i64,
	},
	#[error("Upstream unavailable: {0}")]
	UpstreamUnavailable(String),
}

impl From<RepositoryError> for EngineError {
	fn from(err: RepositoryError) -> Self {
		match err {
			RepositoryError::NotFound { entity, id } => {
				EngineError::NotFound(format!("{} {}", entity, id))
			},
			RepositoryError::InvalidTransition { from, .. } if from.is_terminal() => {
				EngineError::Conflict(ConflictKind::AlreadyTerminal { status: from })
			},
			RepositoryError::InvalidTransition { from, to } => {
				EngineError::Conflict(ConflictKind::InvalidTransition { from, to })
			},
			RepositoryError::DuplicateActiveOrder { order_number, .. } => {
				EngineError::Conflict(ConflictKind::DuplicateActiveOrder { order_number })
			},
			RepositoryError::NotTerminal(status) => {
				EngineError::Conflict(ConflictKind::NotTerminal { status })
			},
			RepositoryError::Storage(msg) => EngineError::UpstreamUnavailable(msg),
		}
	}
}

impl From<Denial> for EngineError {
	fn from(denial: Denial) -> Self {
		EngineError::TransitionDenied {
			reason: denial.reason,
			elapsed_minutes: denial.elapsed_minutes,
		}
	}
}

/// Result of an operation that changed an order.
#[derive(Debug, Clone)]
pub struct OrderOutcome {
	pub order: Order,
	pub items: Vec<OrderItem>,
	/// Set when the operation dispatched notifications; `false` means at
	/// least one delivery failed or there was nobody to notify.
	pub notifications_sent: Option<bool>,
	/// The customer may still cancel this order.
	pub can_cancel: bool,
}

/// Result of following a review link.
#[derive(Debug, Clone)]
pub struct ReviewLinkOutcome {
	pub order: Order,
	pub already_reviewed: bool,
}

/// Orchestrates the order lifecycle over the repositories.
#[derive(Clone)]
pub struct OrderEngine {
	/// Shop configuration.
	pub(crate) config: Config,
	/// Raw storage, used for periodic cleanup.
	pub(crate) storage: Arc<StorageService>,
	pub(crate) orders: Arc<dyn OrderRepository>,
	pub(crate) catalog: Arc<dyn CatalogRepository>,
	pub(crate) notifications: Arc<NotificationService>,
	pub(crate) policy: LifecyclePolicy,
	pub(crate) clock: Arc<dyn Clock>,
}

impl OrderEngine {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		orders: Arc<dyn OrderRepository>,
		catalog: Arc<dyn CatalogRepository>,
		notifications: Arc<NotificationService>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let policy = LifecyclePolicy::new(chrono::Duration::minutes(
			config.shop.cancellation_window_minutes as i64,
		));
		Self {
			config,
			storage,
			orders,
			catalog,
			notifications,
			policy,
			clock,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn policy(&self) -> &LifecyclePolicy {
		&self.policy
	}

	/// Loads an order or fails with `NotFound`.
	pub(crate) async fn load_order(&self, id: u64) -> Result<Order, EngineError> {
		self.orders
			.find_by_id(id)
			.await?
			.ok_or_else(|| EngineError::NotFound(format!("Order {}", id)))
	}

	/// Builds an outcome for an order, computing `can_cancel` now.
	pub(crate) async fn outcome(
		&self,
		order: Order,
		notifications_sent: Option<bool>,
	) -> Result<OrderOutcome, EngineError> {
		let items = self.orders.items_for(order.id).await?;
		let can_cancel = self.policy.can_customer_cancel(&order, self.clock.now());
		Ok(OrderOutcome {
			order,
			items,
			notifications_sent,
			can_cancel,
		})
	}
}

#[cfg(test)]
pub(crate) mod test_support {
	//! Engine wiring over memory storage, a manual clock and a recording
	//! notifier.

	use super::*;
	use crate::state::{StoredCatalogRepository, StoredOrderRepository};
	use async_trait::async_trait;
	use chrono::Utc;
	use shop_notify::{EmailMessage, NotifierInterface, NotifyError, TemplateContext};
	use shop_storage::implementations::memory::MemoryStorage;
	use shop_storage::StorageInterface;
	use shop_types::{
		ConfigSchema, Fragrance, ManualClock, OrderLineRequest, PlaceOrderRequest, Schema,
		ValidationError, Variant,
	};
	use std::str::FromStr;
	use std::sync::Mutex;

	pub(crate) const CONFIG: &str = r#"
[shop]
id = "test-shop"
cancellation_window_minutes = 60

[storage]
primary = "memory"
[storage.implementations.memory]

[notifications]
sender = "orders@shop.test"
admin_recipients = ["staff@shop.test"]
primary = "log"
[notifications.implementations.log]
"#;

	#[derive(Default)]
	pub(crate) struct RecordingNotifier {
		pub(crate) sent: Arc<Mutex<Vec<EmailMessage>>>,
	}

	struct NoSchema;

	impl ConfigSchema for NoSchema {
		fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
			Schema::default().validate(config)
		}
	}

	#[async_trait]
	impl NotifierInterface for RecordingNotifier {
		async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
			self.sent.lock().unwrap().push(message.clone());
			Ok(())
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoSchema)
		}
	}

	pub(crate) struct Harness {
		pub(crate) engine: OrderEngine,
		pub(crate) clock: Arc<ManualClock>,
		pub(crate) sent: Arc<Mutex<Vec<EmailMessage>>>,
	}

	impl Harness {
		pub(crate) fn sent_count(&self) -> usize {
			self.sent.lock().unwrap().len()
		}

		/// Adds a fragrance with one orderable 10ml variant priced 5000.
		pub(crate) async fn seed_variant(&self) -> Variant {
			let fragrance = self
				.engine
				.catalog
				.save_fragrance(Fragrance {
					id: 0,
					name: "Oud Royale".into(),
					brand: "Maison".into(),
					description: None,
					image_url: None,
					hidden: false,
					created_at: Utc::now(),
					updated_at: Utc::now(),
				})
				.await
				.unwrap();
			self.seed_variant_for(fragrance.id, |_| {}).await
		}

		pub(crate) async fn seed_variant_for(
			&self,
			fragrance_id: u64,
			adjust: impl FnOnce(&mut Variant),
		) -> Variant {
			let mut variant = Variant {
				id: 0,
				fragrance_id,
				size_label: "10ml".into(),
				price_cents: 5000,
				in_stock: true,
				is_whole_bottle: false,
				max_quantity: None,
			};
			adjust(&mut variant);
			self.engine.catalog.save_variant(variant).await.unwrap()
		}
	}

	pub(crate) fn harness() -> Harness {
		harness_with_storage(Box::new(MemoryStorage::new()))
	}

	pub(crate) fn harness_with_storage(backend: Box<dyn StorageInterface>) -> Harness {
		let config = Config::from_str(CONFIG).unwrap();
		let clock = Arc::new(ManualClock::new(Utc::now()));
		let storage = Arc::new(StorageService::new(backend));
		let recorder = RecordingNotifier::default();
		let sent = recorder.sent.clone();
		let notifications = NotificationService::new(
			Box::new(recorder),
			config.notifications.sender.clone(),
			config.notifications.admin_recipients.clone(),
			TemplateContext::default(),
		);
		let orders = StoredOrderRepository::new(storage.clone(), clock.clone())
			.with_review_link_window(chrono::Duration::minutes(
				config.shop.review_link_window_minutes as i64,
			));
		let catalog = StoredCatalogRepository::new(storage.clone());
		let engine = OrderEngine::new(
			config,
			storage,
			Arc::new(orders),
			Arc::new(catalog),
			Arc::new(notifications),
			clock.clone(),
		);
		Harness {
			engine,
			clock,
			sent,
		}
	}

	pub(crate) fn request(variant_id: u64, quantity: u32) -> PlaceOrderRequest {
		PlaceOrderRequest {
			customer_name: "Sara Al-Sabah".into(),
			phone: "+96550000000".into(),
			email: Some("sara@example.com".into()),
			address: "Block 1, Street 2, House 3".into(),
			city: "Kuwait City".into(),
			region: Some("Capital".into()),
			notes: None,
			items: vec![OrderLineRequest {
				variant_id,
				quantity,
			}],
		}
	}
}
