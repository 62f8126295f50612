//! Order persistence and the structural transition table.
//!
//! Orders live under `orders:<id>`, their line items as one list under
//! `order_items:<id>`, review links under `review_tokens:<token>` and the
//! one-active-order index under `customer_sessions:<key>`. Writes are
//! serialised behind a single async mutex, which makes the active-order
//! re-check in `create` authoritative within one process.

use super::{next_sequence, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use shop_storage::StorageService;
use shop_types::{
	format_order_number, Actor, AuditEntry, AuditNote, Clock, CustomerIdentity, CustomerSession,
	NewOrder, NewOrderItem, Order, OrderFilter, OrderItem, OrderStatus, OrderWithItems,
	StorageTable,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const ORDER_SEQUENCE: &str = "orders";

/// Checks a status change against the transition table.
///
/// This is purely structural. Business guards (ownership, the cancellation
/// window, who may act) live in the engine's policy.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
	static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(
			OrderStatus::Pending,
			HashSet::from([
				OrderStatus::Reviewed,
				OrderStatus::Processing,
				OrderStatus::Cancelled,
			]),
		);
		m.insert(
			OrderStatus::Reviewed,
			HashSet::from([
				OrderStatus::Pending,
				OrderStatus::Processing,
				OrderStatus::Completed,
				OrderStatus::Cancelled,
			]),
		);
		m.insert(
			OrderStatus::Processing,
			HashSet::from([
				OrderStatus::Pending,
				OrderStatus::Completed,
				OrderStatus::Cancelled,
			]),
		);
		m.insert(OrderStatus::Completed, HashSet::new()); // terminal
		m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
		m
	});

	TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
}

/// Persistence contract for orders and their line items.
#[async_trait]
pub trait OrderRepository: Send + Sync {
	async fn find_by_id(&self, id: u64) -> Result<Option<Order>, RepositoryError>;

	async fn items_for(&self, order_id: u64) -> Result<Vec<OrderItem>, RepositoryError>;

	/// The identity's order in pending, reviewed or processing state, if any.
	async fn find_active_for_customer(
		&self,
		identity: &CustomerIdentity,
	) -> Result<Option<Order>, RepositoryError>;

	/// Writes the header, its items, the review link and the session pointers
	/// as one logical operation. Anything already written is removed again
	/// when a later write fails.
	async fn create(
		&self,
		order: NewOrder,
		items: Vec<NewOrderItem>,
		identity: &CustomerIdentity,
	) -> Result<OrderWithItems, RepositoryError>;

	/// The only way to change an order's status. Re-validates the transition
	/// against the current stored status.
	async fn update_status(
		&self,
		id: u64,
		to: OrderStatus,
		note: AuditNote,
	) -> Result<Order, RepositoryError>;

	/// Deletes a completed or cancelled order with its items.
	async fn delete(&self, id: u64) -> Result<(), RepositoryError>;

	/// Orders matching the filter, newest first.
	async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError>;

	/// Resolves an unexpired review link to its order.
	async fn find_by_review_token(&self, token: &str) -> Result<Option<Order>, RepositoryError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct ReviewTokenRecord {
	order_id: u64,
	expires_at: DateTime<Utc>,
}

/// `OrderRepository` on top of a `StorageService` backend.
pub struct StoredOrderRepository {
	storage: Arc<StorageService>,
	clock: Arc<dyn Clock>,
	order_number_width: usize,
	review_link_window: Duration,
	write_lock: Mutex<()>,
}

impl StoredOrderRepository {
	pub fn new(storage: Arc<StorageService>, clock: Arc<dyn Clock>) -> Self {
		Self {
			storage,
			clock,
			order_number_width: 6,
			review_link_window: Duration::hours(12),
			write_lock: Mutex::new(()),
		}
	}

	pub fn with_order_number_width(mut self, width: usize) -> Self {
		self.order_number_width = width;
		self
	}

	pub fn with_review_link_window(mut self, window: Duration) -> Self {
		self.review_link_window = window;
		self
	}

	async fn load(&self, id: u64) -> Result<Order, RepositoryError> {
		self.storage
			.find(StorageTable::Orders, &id.to_string())
			.await?
			.ok_or_else(|| RepositoryError::not_found("Order", id))
	}

	/// Applies `updater` to the stored order and persists it, bumping
	/// `updated_at`. Callers must hold the write lock.
	async fn update_order_with<F>(&self, id: u64, updater: F) -> Result<Order, RepositoryError>
	where
		F: FnOnce(&mut Order),
	{
		let mut order = self.load(id).await?;
		updater(&mut order);
		order.updated_at = self.clock.now();
		self.storage
			.update(StorageTable::Orders, &id.to_string(), &order)
			.await?;
		Ok(order)
	}

	/// The order a session key points at, if it is still active and owned by
	/// `identity`. Stale pointers are ignored.
	async fn active_for_key(
		&self,
		key: &str,
		identity: &CustomerIdentity,
	) -> Result<Option<Order>, RepositoryError> {
		let session: Option<CustomerSession> = self
			.storage
			.find(StorageTable::CustomerSessions, key)
			.await?;
		let Some(order_id) = session.and_then(|s| s.active_order_id) else {
			return Ok(None);
		};
		let order: Option<Order> = self
			.storage
			.find(StorageTable::Orders, &order_id.to_string())
			.await?;
		Ok(order.filter(|o| o.status.is_active() && identity.owns(o)))
	}

	async fn active_for_identity(
		&self,
		identity: &CustomerIdentity,
	) -> Result<Option<Order>, RepositoryError> {
		for key in identity.session_keys() {
			if let Some(order) = self.active_for_key(&key, identity).await? {
				return Ok(Some(order));
			}
		}
		Ok(None)
	}

	async fn point_sessions(
		&self,
		identity: &CustomerIdentity,
		order: &Order,
	) -> Result<(), RepositoryError> {
		for key in identity.session_keys() {
			let session = CustomerSession {
				key: key.clone(),
				customer_ip: order.customer_ip.clone(),
				user_id: order.user_id.clone(),
				phone: Some(order.phone.clone()),
				email: order.email.clone(),
				active_order_id: Some(order.id),
				updated_at: order.created_at,
			};
			self.storage
				.store(StorageTable::CustomerSessions, &key, &session)
				.await?;
		}
		Ok(())
	}

	/// Clears session pointers to an order that left the active set.
	async fn release_sessions(&self, order: &Order) -> Result<(), RepositoryError> {
		for key in &order.session_keys {
			let session: Option<CustomerSession> = self
				.storage
				.find(StorageTable::CustomerSessions, key)
				.await?;
			if let Some(mut session) = session {
				if session.active_order_id == Some(order.id) {
					session.active_order_id = None;
					session.updated_at = self.clock.now();
					self.storage
						.store(StorageTable::CustomerSessions, key, &session)
						.await?;
				}
			}
		}
		Ok(())
	}

	/// Best-effort removal of a partially created order.
	async fn rollback(&self, id: u64, review_token: &str) {
		let key = id.to_string();
		let removals = [
			(StorageTable::ReviewTokens, review_token),
			(StorageTable::OrderItems, key.as_str()),
			(StorageTable::Orders, key.as_str()),
		];
		for (table, id) in removals {
			if let Err(e) = self.storage.remove(table, id).await {
				tracing::warn!(table = %table.as_str(), id = %id, error = %e, "Rollback write failed");
			}
		}
	}

	async fn write_new(
		&self,
		order: &Order,
		items: &[OrderItem],
		review_token: &str,
		identity: &CustomerIdentity,
	) -> Result<(), RepositoryError> {
		let key = order.id.to_string();
		self.storage
			.store(StorageTable::OrderItems, &key, &items)
			.await?;
		let record = ReviewTokenRecord {
			order_id: order.id,
			expires_at: order.created_at + self.review_link_window,
		};
		self.storage
			.store_with_ttl(
				StorageTable::ReviewTokens,
				review_token,
				&record,
				self.review_link_window.to_std().ok(),
			)
			.await?;
		self.point_sessions(identity, order).await
	}
}

#[async_trait]
impl OrderRepository for StoredOrderRepository {
	async fn find_by_id(&self, id: u64) -> Result<Option<Order>, RepositoryError> {
		Ok(self.storage.find(StorageTable::Orders, &id.to_string()).await?)
	}

	async fn items_for(&self, order_id: u64) -> Result<Vec<OrderItem>, RepositoryError> {
		let items: Option<Vec<OrderItem>> = self
			.storage
			.find(StorageTable::OrderItems, &order_id.to_string())
			.await?;
		Ok(items.unwrap_or_default())
	}

	async fn find_active_for_customer(
		&self,
		identity: &CustomerIdentity,
	) -> Result<Option<Order>, RepositoryError> {
		self.active_for_identity(identity).await
	}

	async fn create(
		&self,
		new: NewOrder,
		items: Vec<NewOrderItem>,
		identity: &CustomerIdentity,
	) -> Result<OrderWithItems, RepositoryError> {
		let _guard = self.write_lock.lock().await;

		if let Some(existing) = self.active_for_identity(identity).await? {
			return Err(RepositoryError::DuplicateActiveOrder {
				order_id: existing.id,
				order_number: existing.order_number,
			});
		}

		let id = next_sequence(&self.storage, ORDER_SEQUENCE).await?;
		let order = Order {
			id,
			order_number: format_order_number(id, self.order_number_width),
			user_id: new.user_id,
			customer_ip: new.customer_ip,
			customer_name: new.customer_name,
			phone: new.phone,
			email: new.email,
			address: new.address,
			city: new.city,
			region: new.region,
			notes: new.notes,
			status: OrderStatus::Pending,
			reviewed: false,
			total_amount: new.total_amount,
			currency: new.currency,
			review_deadline: new.review_deadline,
			review_token: Some(new.review_token.clone()),
			created_at: new.created_at,
			updated_at: new.created_at,
			session_keys: identity.session_keys(),
			audit_log: vec![AuditEntry {
				at: new.created_at,
				actor: Actor::Customer,
				action: "placed".into(),
				from: None,
				to: OrderStatus::Pending,
				reason: None,
			}],
		};
		let items: Vec<OrderItem> = items
			.into_iter()
			.map(|item| OrderItem {
				id: Uuid::new_v4(),
				order_id: id,
				total_price_cents: item.total_price_cents(),
				fragrance_id: item.fragrance_id,
				variant_id: item.variant_id,
				fragrance_name: item.fragrance_name,
				fragrance_brand: item.fragrance_brand,
				size_label: item.size_label,
				quantity: item.quantity,
				unit_price_cents: item.unit_price_cents,
				is_whole_bottle: false,
			})
			.collect();

		self.storage
			.store(StorageTable::Orders, &id.to_string(), &order)
			.await?;

		if let Err(e) = self
			.write_new(&order, &items, &new.review_token, identity)
			.await
		{
			tracing::warn!(order_id = %id, error = %e, "Order creation failed, rolling back");
			self.rollback(id, &new.review_token).await;
			return Err(e);
		}

		Ok(OrderWithItems { order, items })
	}

	async fn update_status(
		&self,
		id: u64,
		to: OrderStatus,
		note: AuditNote,
	) -> Result<Order, RepositoryError> {
		let _guard = self.write_lock.lock().await;

		let current = self.load(id).await?;
		let from = current.status;
		if !is_valid_transition(from, to) {
			return Err(RepositoryError::InvalidTransition { from, to });
		}
		// Customers may only withdraw an order staff have not touched yet.
		if note.actor == Actor::Customer
			&& to == OrderStatus::Cancelled
			&& (from != OrderStatus::Pending || current.reviewed)
		{
			return Err(RepositoryError::InvalidTransition { from, to });
		}

		let at = self.clock.now();
		let order = self
			.update_order_with(id, |order| {
				order.status = to;
				order.reviewed = to.reviewed_flag();
				order.audit_log.push(AuditEntry {
					at,
					actor: note.actor,
					action: note.action,
					from: Some(from),
					to,
					reason: note.reason,
				});
			})
			.await?;

		// A stale pointer is harmless: lookups re-check the order's status.
		if to.is_terminal() {
			if let Err(e) = self.release_sessions(&order).await {
				tracing::warn!(order_id = %id, error = %e, "Failed to release customer session");
			}
		}
		Ok(order)
	}

	async fn delete(&self, id: u64) -> Result<(), RepositoryError> {
		let _guard = self.write_lock.lock().await;

		let order = self.load(id).await?;
		if !order.status.is_terminal() {
			return Err(RepositoryError::NotTerminal(order.status));
		}
		let key = id.to_string();
		self.storage.remove(StorageTable::OrderItems, &key).await?;
		if let Some(token) = &order.review_token {
			self.storage.remove(StorageTable::ReviewTokens, token).await?;
		}
		self.storage.remove(StorageTable::Orders, &key).await?;
		Ok(())
	}

	async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError> {
		let mut orders: Vec<Order> = self
			.storage
			.list::<Order>(StorageTable::Orders)
			.await?
			.into_iter()
			.map(|(_, order)| order)
			.filter(|order| filter.status.is_none_or(|status| order.status == status))
			.collect();
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
		if let Some(limit) = filter.limit {
			orders.truncate(limit);
		}
		Ok(orders)
	}

	async fn find_by_review_token(&self, token: &str) -> Result<Option<Order>, RepositoryError> {
		let record: Option<ReviewTokenRecord> =
			self.storage.find(StorageTable::ReviewTokens, token).await?;
		let Some(record) = record else {
			return Ok(None);
		};
		if record.expires_at <= self.clock.now() {
			return Ok(None);
		}
		let order = self.find_by_id(record.order_id).await?;
		Ok(order.filter(|o| o.review_token.as_deref() == Some(token)))
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use shop_storage::implementations::memory::MemoryStorage;
	use shop_storage::{StorageError, StorageInterface};
	use shop_types::{ConfigSchema, ManualClock};

	/// Memory storage that refuses writes to keys with a given prefix.
	pub(crate) struct FailingStorage {
		pub(crate) inner: MemoryStorage,
		pub(crate) fail_prefix: &'static str,
	}

	#[async_trait]
	impl StorageInterface for FailingStorage {
		async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
			self.inner.get_bytes(key).await
		}

		async fn set_bytes(
			&self,
			key: &str,
			value: Vec<u8>,
			ttl: Option<std::time::Duration>,
		) -> Result<(), StorageError> {
			if key.starts_with(self.fail_prefix) {
				return Err(StorageError::Backend("disk full".into()));
			}
			self.inner.set_bytes(key, value, ttl).await
		}

		async fn delete(&self, key: &str) -> Result<(), StorageError> {
			self.inner.delete(key).await
		}

		async fn exists(&self, key: &str) -> Result<bool, StorageError> {
			self.inner.exists(key).await
		}

		async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
			self.inner.list_keys(namespace).await
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			self.inner.config_schema()
		}
	}

	fn repo_with(storage: StorageService) -> (StoredOrderRepository, Arc<ManualClock>) {
		let clock = Arc::new(ManualClock::default());
		let repo = StoredOrderRepository::new(Arc::new(storage), clock.clone());
		(repo, clock)
	}

	fn repo() -> (StoredOrderRepository, Arc<ManualClock>) {
		repo_with(StorageService::new(Box::new(MemoryStorage::new())))
	}

	fn new_order(ip: &str, now: DateTime<Utc>) -> NewOrder {
		NewOrder {
			user_id: None,
			customer_ip: Some(ip.into()),
			customer_name: "Sara".into(),
			phone: "+96550000000".into(),
			email: None,
			address: "Block 1, Street 2".into(),
			city: "Kuwait City".into(),
			region: None,
			notes: None,
			total_amount: 10000,
			currency: "KWD".into(),
			review_token: Uuid::new_v4().to_string(),
			created_at: now,
			review_deadline: now + Duration::hours(1),
		}
	}

	fn line() -> NewOrderItem {
		NewOrderItem {
			fragrance_id: 1,
			variant_id: 7,
			fragrance_name: "Oud Royale".into(),
			fragrance_brand: "Maison".into(),
			size_label: "10ml".into(),
			quantity: 2,
			unit_price_cents: 5000,
		}
	}

	#[test]
	fn test_terminal_states_have_no_transitions() {
		for to in [
			OrderStatus::Pending,
			OrderStatus::Reviewed,
			OrderStatus::Processing,
			OrderStatus::Completed,
			OrderStatus::Cancelled,
		] {
			assert!(!is_valid_transition(OrderStatus::Completed, to));
			assert!(!is_valid_transition(OrderStatus::Cancelled, to));
		}
		assert!(is_valid_transition(OrderStatus::Pending, OrderStatus::Cancelled));
		assert!(!is_valid_transition(OrderStatus::Pending, OrderStatus::Completed));
	}

	#[tokio::test]
	async fn test_create_assigns_sequential_numbers() {
		let (repo, clock) = repo();
		let first = repo
			.create(new_order("10.0.0.1", clock.now()), vec![line()], &CustomerIdentity::guest("10.0.0.1"))
			.await
			.unwrap();
		let second = repo
			.create(new_order("10.0.0.2", clock.now()), vec![line()], &CustomerIdentity::guest("10.0.0.2"))
			.await
			.unwrap();

		assert_eq!(first.order.order_number, "000001");
		assert_eq!(second.order.order_number, "000002");
		assert_eq!(first.items.len(), 1);
		assert_eq!(first.items[0].total_price_cents, 10000);
		assert_eq!(repo.items_for(1).await.unwrap(), first.items);
	}

	#[tokio::test]
	async fn test_second_active_order_is_rejected() {
		let (repo, clock) = repo();
		let guest = CustomerIdentity::guest("10.0.0.1");
		repo.create(new_order("10.0.0.1", clock.now()), vec![line()], &guest)
			.await
			.unwrap();

		let err = repo
			.create(new_order("10.0.0.1", clock.now()), vec![line()], &guest)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			RepositoryError::DuplicateActiveOrder { order_id: 1, ref order_number } if order_number == "000001"
		));
	}

	#[tokio::test]
	async fn test_terminal_order_releases_session() {
		let (repo, clock) = repo();
		let guest = CustomerIdentity::guest("10.0.0.1");
		repo.create(new_order("10.0.0.1", clock.now()), vec![line()], &guest)
			.await
			.unwrap();
		repo.update_status(1, OrderStatus::Cancelled, AuditNote::new(Actor::Customer, "cancelled"))
			.await
			.unwrap();

		assert!(repo.find_active_for_customer(&guest).await.unwrap().is_none());
		let again = repo
			.create(new_order("10.0.0.1", clock.now()), vec![line()], &guest)
			.await
			.unwrap();
		assert_eq!(again.order.id, 2);
	}

	#[tokio::test]
	async fn test_update_status_revalidates_and_audits() {
		let (repo, clock) = repo();
		repo.create(new_order("10.0.0.1", clock.now()), vec![line()], &CustomerIdentity::guest("10.0.0.1"))
			.await
			.unwrap();
		clock.advance(Duration::minutes(5));

		let order = repo
			.update_status(1, OrderStatus::Reviewed, AuditNote::new(Actor::Admin, "reviewed"))
			.await
			.unwrap();
		assert!(order.reviewed);
		assert_eq!(order.updated_at, clock.now());
		assert_eq!(order.audit_log.len(), 2);
		assert_eq!(order.audit_log[1].from, Some(OrderStatus::Pending));

		repo.update_status(1, OrderStatus::Completed, AuditNote::new(Actor::Admin, "completed"))
			.await
			.unwrap();
		let err = repo
			.update_status(1, OrderStatus::Cancelled, AuditNote::new(Actor::Admin, "cancelled"))
			.await
			.unwrap_err();
		assert!(matches!(err, RepositoryError::InvalidTransition { .. }));
	}

	#[tokio::test]
	async fn test_customer_cannot_cancel_reviewed_order() {
		let (repo, clock) = repo();
		repo.create(new_order("10.0.0.1", clock.now()), vec![line()], &CustomerIdentity::guest("10.0.0.1"))
			.await
			.unwrap();
		repo.update_status(1, OrderStatus::Reviewed, AuditNote::new(Actor::Admin, "reviewed"))
			.await
			.unwrap();
		clock.advance(Duration::hours(5));

		let err = repo
			.update_status(1, OrderStatus::Cancelled, AuditNote::new(Actor::Customer, "cancelled"))
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			RepositoryError::InvalidTransition {
				from: OrderStatus::Reviewed,
				to: OrderStatus::Cancelled
			}
		));
		let order = repo.find_by_id(1).await.unwrap().unwrap();
		assert_eq!(order.status, OrderStatus::Reviewed);
		assert_eq!(order.audit_log.len(), 2);

		repo.update_status(1, OrderStatus::Cancelled, AuditNote::new(Actor::Admin, "cancelled"))
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_release_clears_gateway_email_session() {
		let (repo, clock) = repo();
		let identity = CustomerIdentity::authenticated("u-1", "Gateway@Shop.test");
		let mut new = new_order("10.0.0.1", clock.now());
		new.user_id = Some("u-1".into());
		new.email = Some("other@shop.test".into());
		let placed = repo.create(new, vec![line()], &identity).await.unwrap();
		assert_eq!(placed.order.session_keys, identity.session_keys());

		repo.update_status(1, OrderStatus::Cancelled, AuditNote::new(Actor::Admin, "cancelled"))
			.await
			.unwrap();

		for key in ["user:u-1", "email:gateway@shop.test"] {
			let session: CustomerSession = repo
				.storage
				.find(StorageTable::CustomerSessions, key)
				.await
				.unwrap()
				.unwrap();
			assert_eq!(session.active_order_id, None, "{}", key);
		}
		assert!(repo.find_active_for_customer(&identity).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_item_write_failure_rolls_back_header() {
		let storage = StorageService::new(Box::new(FailingStorage {
			inner: MemoryStorage::new(),
			fail_prefix: "order_items:",
		}));
		let (repo, clock) = repo_with(storage);
		let guest = CustomerIdentity::guest("10.0.0.1");

		let err = repo
			.create(new_order("10.0.0.1", clock.now()), vec![line()], &guest)
			.await
			.unwrap_err();
		assert!(matches!(err, RepositoryError::Storage(_)));
		assert!(repo.find_by_id(1).await.unwrap().is_none());
		assert!(repo.list(&OrderFilter::default()).await.unwrap().is_empty());
		assert!(repo.find_active_for_customer(&guest).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_delete_requires_terminal_state() {
		let (repo, clock) = repo();
		let placed = repo
			.create(new_order("10.0.0.1", clock.now()), vec![line()], &CustomerIdentity::guest("10.0.0.1"))
			.await
			.unwrap();
		assert!(matches!(repo.delete(1).await, Err(RepositoryError::NotTerminal(OrderStatus::Pending))));

		repo.update_status(1, OrderStatus::Cancelled, AuditNote::new(Actor::Admin, "cancelled"))
			.await
			.unwrap();
		repo.delete(1).await.unwrap();
		assert!(repo.find_by_id(1).await.unwrap().is_none());
		assert!(repo.items_for(1).await.unwrap().is_empty());
		let token = placed.order.review_token.unwrap();
		assert!(repo.find_by_review_token(&token).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_review_token_expires() {
		let (repo, clock) = repo();
		let placed = repo
			.create(new_order("10.0.0.1", clock.now()), vec![line()], &CustomerIdentity::guest("10.0.0.1"))
			.await
			.unwrap();
		let token = placed.order.review_token.unwrap();

		assert_eq!(repo.find_by_review_token(&token).await.unwrap().map(|o| o.id), Some(1));
		assert!(repo.find_by_review_token("unknown").await.unwrap().is_none());
		clock.advance(Duration::hours(12));
		assert!(repo.find_by_review_token(&token).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_list_filters_and_sorts_newest_first() {
		let (repo, clock) = repo();
		for i in 1..=3 {
			let ip = format!("10.0.0.{}", i);
			repo.create(new_order(&ip, clock.now()), vec![line()], &CustomerIdentity::guest(ip.as_str()))
				.await
				.unwrap();
			clock.advance(Duration::minutes(1));
		}
		repo.update_status(2, OrderStatus::Cancelled, AuditNote::new(Actor::Admin, "cancelled"))
			.await
			.unwrap();

		let all = repo.list(&OrderFilter::default()).await.unwrap();
		assert_eq!(all.iter().map(|o| o.id).collect::<Vec<_>>(), vec![3, 2, 1]);

		let pending = repo
			.list(&OrderFilter {
				status: Some(OrderStatus::Pending),
				limit: Some(1),
			})
			.await
			.unwrap();
		assert_eq!(pending.iter().map(|o| o.id).collect::<Vec<_>>(), vec![3]);
	}
}
