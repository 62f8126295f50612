//! Display helpers shared by the engine, notifications and the API layer.

pub mod formatting;

pub use formatting::{format_amount, format_order_number, truncate_id};
