//! Common types for the fragrance shop backend.
//!
//! This crate defines the data model shared by every other crate in the
//! workspace: orders and their line items, the catalog, customer identities,
//! lifecycle events, HTTP request/response shapes and configuration schemas.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Catalog types: fragrances and their purchasable variants.
pub mod catalog;
/// Time source abstraction so lifecycle rules can be tested deterministically.
pub mod clock;
/// Customer identity and guest session tracking.
pub mod customer;
/// Lifecycle events that trigger notifications.
pub mod events;
/// Order, order item and audit trail types.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secure string wrapper for tokens and API keys.
pub mod secret_string;
/// Storage namespaces.
pub mod storage;
/// Formatting helpers for display values.
pub mod utils;
/// Configuration validation types.
pub mod validation;

pub use api::*;
pub use catalog::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use customer::*;
pub use events::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{format_amount, format_order_number, truncate_id};
pub use validation::*;
