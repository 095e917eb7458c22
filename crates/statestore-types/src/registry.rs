//! Self-registration for backends.
//!
//! A backend module names itself and hands out its constructor, so adding a
//! backend means adding one line to the list of implementations.

/// Associates a configuration name with a constructor.
pub trait ImplementationRegistry {
	/// Key under `[state.implementations]`, e.g. `"redis"` for
	/// `[state.implementations.redis]`.
	const NAME: &'static str;

	/// Constructor type, usually a plain function pointer.
	type Factory;

	fn factory() -> Self::Factory;
}
