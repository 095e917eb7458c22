//! Configuration builder for creating test and development configurations.

use crate::{Config, ServerConfig, StateConfig};
use statestore_types::DecodePolicy;
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to the in-memory backend so tests need no running services.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	state_primary: String,
	timeout_seconds: u64,
	decode_policy: DecodePolicy,
	implementations: HashMap<String, toml::Value>,
	server: ServerConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		let mut implementations = HashMap::new();
		implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);

		Self {
			state_primary: "memory".to_string(),
			timeout_seconds: 5,
			decode_policy: DecodePolicy::Lenient,
			implementations,
			server: ServerConfig::default(),
		}
	}

	/// Sets the primary state store implementation.
	pub fn state_primary(mut self, primary: impl Into<String>) -> Self {
		self.state_primary = primary.into();
		self
	}

	/// Adds or replaces an implementation table.
	pub fn implementation(mut self, name: impl Into<String>, config: toml::Value) -> Self {
		self.implementations.insert(name.into(), config);
		self
	}

	/// Sets the state call timeout in seconds.
	pub fn timeout_seconds(mut self, timeout: u64) -> Self {
		self.timeout_seconds = timeout;
		self
	}

	/// Sets the decode policy for inbound orders.
	pub fn decode_policy(mut self, policy: DecodePolicy) -> Self {
		self.decode_policy = policy;
		self
	}

	/// Sets the maximum request body size.
	pub fn max_request_size(mut self, size: usize) -> Self {
		self.server.max_request_size = size;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		Config {
			server: self.server,
			state: StateConfig {
				primary: self.state_primary,
				timeout_seconds: self.timeout_seconds,
				decode_policy: self.decode_policy,
				implementations: self.implementations,
			},
		}
	}
}
