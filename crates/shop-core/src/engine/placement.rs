//! Order placement.

use super::{ConflictKind, EngineError, OrderEngine, OrderOutcome};
use shop_types::{
	CustomerIdentity, NewOrder, NewOrderItem, OrderEvent, OrderLineRequest, PlaceOrderRequest,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Trims an optional text field, dropping it when blank.
fn optional(value: &Option<String>) -> Option<String> {
	value
		.as_deref()
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(String::from)
}

fn required(field: &str, value: &str) -> Result<String, EngineError> {
	let value = value.trim();
	if value.is_empty() {
		return Err(EngineError::Validation(format!("{} is required", field)));
	}
	Ok(value.to_string())
}

/// Collapses repeated variants into one line, keeping first-seen order.
fn merge_lines(lines: &[OrderLineRequest]) -> Result<Vec<(u64, u32)>, EngineError> {
	let mut merged: Vec<(u64, u32)> = Vec::with_capacity(lines.len());
	for line in lines {
		match merged.iter_mut().find(|(id, _)| *id == line.variant_id) {
			Some((_, quantity)) => {
				*quantity = quantity.checked_add(line.quantity).ok_or_else(|| {
					EngineError::Validation(format!(
						"quantity for variant {} is out of range",
						line.variant_id
					))
				})?;
			},
			None => merged.push((line.variant_id, line.quantity)),
		}
	}
	Ok(merged)
}

impl OrderEngine {
	/// Places a new order for `identity`.
	///
	/// Nothing is persisted unless every line resolves to an orderable
	/// variant within its quantity cap and the customer has no active order.
	#[instrument(skip_all, fields(customer = %identity))]
	pub async fn place_order(
		&self,
		identity: &CustomerIdentity,
		request: PlaceOrderRequest,
	) -> Result<OrderOutcome, EngineError> {
		request
			.validate()
			.map_err(|e| EngineError::Validation(e.to_string()))?;

		let customer_name = required("name", &request.customer_name)?;
		let phone = required("phone", &request.phone)?;
		let address = required("address", &request.address)?;
		let city = required("city", &request.city)?;

		// Fast path; the repository repeats this check under its write lock.
		if let Some(existing) = self.orders.find_active_for_customer(identity).await? {
			return Err(EngineError::Conflict(ConflictKind::DuplicateActiveOrder {
				order_number: existing.order_number,
			}));
		}

		let lines = self.resolve_lines(&request.items).await?;
		let total_amount = lines
			.iter()
			.try_fold(0i64, |acc, line| {
				line.unit_price_cents
					.checked_mul(i64::from(line.quantity))
					.and_then(|total| acc.checked_add(total))
			})
			.ok_or_else(|| EngineError::Validation("order total is out of range".into()))?;

		let email = match identity {
			CustomerIdentity::Authenticated { email, .. } => {
				optional(&request.email).or_else(|| Some(email.clone()))
			},
			CustomerIdentity::Guest { .. } => optional(&request.email),
		};

		let now = self.clock.now();
		let new_order = NewOrder {
			user_id: identity.user_id().map(String::from),
			customer_ip: identity.ip().map(String::from),
			customer_name,
			phone,
			email,
			address,
			city,
			region: optional(&request.region),
			notes: optional(&request.notes),
			total_amount,
			currency: self.config.shop.currency.clone(),
			review_token: Uuid::new_v4().to_string(),
			created_at: now,
			review_deadline: now + self.policy.cancellation_window(),
		};

		let placed = self.orders.create(new_order, lines, identity).await?;
		tracing::info!(
			order_id = placed.order.id,
			order_number = %placed.order.order_number,
			total_amount = placed.order.total_amount,
			items = placed.items.len(),
			"Order placed"
		);

		let sent = self
			.notifications
			.notify(OrderEvent::Created, &placed.order, &placed.items)
			.await;
		let can_cancel = self.policy.can_customer_cancel(&placed.order, now);
		Ok(OrderOutcome {
			order: placed.order,
			items: placed.items,
			notifications_sent: Some(sent),
			can_cancel,
		})
	}

	/// Looks up every requested variant and snapshots its display fields.
	async fn resolve_lines(
		&self,
		requested: &[OrderLineRequest],
	) -> Result<Vec<NewOrderItem>, EngineError> {
		let default_cap = self.config.shop.default_max_quantity;
		let mut lines = Vec::with_capacity(requested.len());

		for (variant_id, quantity) in merge_lines(requested)? {
			let variant = self.catalog.variant(variant_id).await?.ok_or_else(|| {
				EngineError::Validation(format!("variant {} does not exist", variant_id))
			})?;
			if variant.is_whole_bottle {
				return Err(EngineError::Validation(format!(
					"variant {} is a whole bottle and cannot be ordered online",
					variant_id
				)));
			}
			if !variant.in_stock {
				return Err(EngineError::Validation(format!(
					"variant {} is out of stock",
					variant_id
				)));
			}
			let cap = variant.quantity_cap(default_cap);
			if quantity == 0 || quantity > cap {
				return Err(EngineError::Validation(format!(
					"quantity for variant {} must be between 1 and {}",
					variant_id, cap
				)));
			}
			let fragrance = self
				.catalog
				.fragrance(variant.fragrance_id)
				.await?
				.filter(|f| !f.hidden)
				.ok_or_else(|| {
					EngineError::Validation(format!("variant {} is not available", variant_id))
				})?;

			lines.push(NewOrderItem {
				fragrance_id: fragrance.id,
				variant_id,
				fragrance_name: fragrance.name,
				fragrance_brand: fragrance.brand,
				size_label: variant.size_label,
				quantity,
				unit_price_cents: variant.price_cents,
			});
		}
		Ok(lines)
	}
}
