//! Order lifecycle core for the fragrance shop.
//!
//! Ties the order and catalog repositories, the lifecycle policy and the
//! notification dispatcher together behind `OrderEngine`. `ShopBuilder`
//! assembles an engine from configuration and a set of backend factories.

pub mod builder;
pub mod engine;
pub mod policy;
pub mod state;

pub use builder::{BuilderError, ShopBuilder, ShopFactories};
pub use engine::{ConflictKind, EngineError, OrderEngine, OrderOutcome, ReviewLinkOutcome};
pub use policy::{Denial, LifecyclePolicy};
pub use state::RepositoryError;
