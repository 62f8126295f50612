//! Registration trait for pluggable backends.

/// Implemented by every backend module (storage, notifications) so the
/// builder can map a configuration name to a factory function.
pub trait ImplementationRegistry {
	/// Key under `<section>.implementations` in the TOML configuration,
	/// e.g. "memory" for `storage.implementations.memory`.
	const NAME: &'static str;

	/// Factory function type of the owning module.
	type Factory;

	fn factory() -> Self::Factory;
}
