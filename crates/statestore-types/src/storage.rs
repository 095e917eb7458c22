//! Storage-related types for the statestore system.

/// Keys under which state is persisted.
///
/// The service keeps a single logical record, so there is exactly one
/// variant. Backends receive the string form via [`StateKey::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
	/// Key for the current order envelope
	Order,
}

impl StateKey {
	/// Returns the string representation of the state key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StateKey::Order => "order",
		}
	}
}
