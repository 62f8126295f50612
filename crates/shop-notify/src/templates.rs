//! Plain-text email templates.

use chrono::{DateTime, Utc};
use shop_types::{format_amount, Actor, Order, OrderEvent, OrderItem, OrderStatus};
use std::fmt::Write;

/// Shop-wide values the templates need.
#[derive(Debug, Clone)]
pub struct TemplateContext {
	pub shop_name: String,
	/// Base URL the review link is built from, without trailing slash.
	pub public_url: String,
	pub minor_units: u32,
}

impl Default for TemplateContext {
	fn default() -> Self {
		Self {
			shop_name: "Shop".to_string(),
			public_url: "http://127.0.0.1:3000".to_string(),
			minor_units: 1000,
		}
	}
}

impl TemplateContext {
	pub fn review_link(&self, token: &str) -> String {
		format!("{}/api/review/{}", self.public_url.trim_end_matches('/'), token)
	}

	fn amount(&self, order: &Order, minor: i64) -> String {
		format_amount(minor, self.minor_units, &order.currency)
	}
}

fn timestamp(at: DateTime<Utc>) -> String {
	at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn write_items(out: &mut String, order: &Order, items: &[OrderItem], ctx: &TemplateContext) {
	for item in items {
		let _ = writeln!(
			out,
			"  - {} {} ({}) x{} = {}",
			item.fragrance_brand,
			item.fragrance_name,
			item.size_label,
			item.quantity,
			ctx.amount(order, item.total_price_cents)
		);
	}
	let _ = writeln!(out, "Total: {}", ctx.amount(order, order.total_amount));
}

/// Who performed the latest transition, as recorded in the audit log.
fn last_actor(order: &Order) -> Option<Actor> {
	order.audit_log.last().map(|entry| entry.actor)
}

/// Subject and body of the staff email for an event.
pub fn admin(
	event: OrderEvent,
	order: &Order,
	items: &[OrderItem],
	ctx: &TemplateContext,
) -> (String, String) {
	let mut body = String::new();
	let subject = match event {
		OrderEvent::Created => {
			let _ = writeln!(body, "New order #{} was placed.\n", order.order_number);
			let _ = writeln!(body, "Customer: {}", order.customer_name);
			let _ = writeln!(body, "Phone: {}", order.phone);
			if let Some(email) = &order.email {
				let _ = writeln!(body, "Email: {}", email);
			}
			let _ = write!(body, "Address: {}, {}", order.address, order.city);
			if let Some(region) = &order.region {
				let _ = write!(body, ", {}", region);
			}
			let _ = writeln!(body);
			if let Some(notes) = &order.notes {
				let _ = writeln!(body, "Notes: {}", notes);
			}
			let _ = writeln!(body, "\nItems:");
			write_items(&mut body, order, items, ctx);
			if let Some(token) = &order.review_token {
				let _ = writeln!(
					body,
					"\nMark as reviewed (locks customer cancellation):\n{}",
					ctx.review_link(token)
				);
			}
			format!("[{}] New order #{}", ctx.shop_name, order.order_number)
		},
		OrderEvent::Cancelled => {
			let by = match last_actor(order) {
				Some(Actor::Customer) => "the customer",
				_ => "staff",
			};
			let _ = writeln!(
				body,
				"Order #{} for {} was cancelled by {} at {}.",
				order.order_number,
				order.customer_name,
				by,
				timestamp(order.updated_at)
			);
			let _ = writeln!(body, "\nItems:");
			write_items(&mut body, order, items, ctx);
			format!("[{}] Order #{} cancelled", ctx.shop_name, order.order_number)
		},
		OrderEvent::Reviewed => {
			let state = if order.reviewed {
				"marked as reviewed"
			} else {
				"returned to pending"
			};
			let _ = writeln!(
				body,
				"Order #{} was {} at {}.",
				order.order_number,
				state,
				timestamp(order.updated_at)
			);
			format!("[{}] Order #{} {}", ctx.shop_name, order.order_number, state)
		},
	};
	(subject, body)
}

/// Subject and body of the customer email for an event.
pub fn customer(
	event: OrderEvent,
	order: &Order,
	items: &[OrderItem],
	ctx: &TemplateContext,
) -> (String, String) {
	let mut body = format!("Hello {},\n\n", order.customer_name);
	let subject = match event {
		OrderEvent::Created => {
			let _ = writeln!(
				body,
				"Thank you for your order #{}. We have received it and will contact you to arrange delivery.\n",
				order.order_number
			);
			write_items(&mut body, order, items, ctx);
			let _ = writeln!(
				body,
				"\nYou can cancel this order until {} unless we have already started reviewing it.",
				timestamp(order.review_deadline)
			);
			format!("Your {} order #{}", ctx.shop_name, order.order_number)
		},
		OrderEvent::Cancelled => {
			let _ = writeln!(
				body,
				"Your order #{} has been cancelled. Nothing will be delivered or charged.",
				order.order_number
			);
			format!("Order #{} cancelled", order.order_number)
		},
		OrderEvent::Reviewed => {
			let line = match (order.reviewed, order.status) {
				(true, OrderStatus::Processing) => "is now being prepared",
				(true, _) => "has been confirmed by our team",
				(false, _) => "is back in our queue and will be confirmed shortly",
			};
			let _ = writeln!(body, "Your order #{} {}.", order.order_number, line);
			format!("Order #{} update", order.order_number)
		},
	};
	let _ = write!(body, "\n{}", ctx.shop_name);
	(subject, body)
}
