//! Factory registry for state store implementations.
//!
//! Backends register themselves through `statestore_storage::get_all_implementations`;
//! this module resolves the configured primary to a factory and builds the
//! [`StateService`] the HTTP layer runs on.

use statestore_config::Config;
use statestore_storage::{StateService, StateStoreFactory};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while wiring the state service.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Unknown state implementation '{name}'. Available: [{available}]")]
	UnknownImplementation { name: String, available: String },
	#[error("Failed to create state implementation '{name}': {reason}")]
	Creation { name: String, reason: String },
}

/// Registry of all known backend factories, keyed by configuration name.
pub struct FactoryRegistry {
	pub state: HashMap<String, StateStoreFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			state: HashMap::new(),
		}
	}

	/// Register a state store implementation
	pub fn register_state(&mut self, name: impl Into<String>, factory: StateStoreFactory) {
		self.state.insert(name.into(), factory);
	}

	fn available(&self) -> String {
		let mut names: Vec<_> = self.state.keys().cloned().collect();
		names.sort();
		names.join(", ")
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Get the global factory registry, initializing it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in statestore_storage::get_all_implementations() {
			tracing::debug!("Registering state implementation: {}", name);
			registry.register_state(name, factory);
		}

		registry
	})
}

/// Builds the state service for the configured primary implementation.
///
/// Every configured implementation name must be known, but only the primary
/// is instantiated.
pub fn build_state_service(
	registry: &FactoryRegistry,
	config: &Config,
) -> Result<StateService, BuilderError> {
	for name in config.state.implementations.keys() {
		if !registry.state.contains_key(name) {
			return Err(BuilderError::UnknownImplementation {
				name: name.clone(),
				available: registry.available(),
			});
		}
	}

	let name = &config.state.primary;
	let factory = registry
		.state
		.get(name)
		.ok_or_else(|| BuilderError::UnknownImplementation {
			name: name.clone(),
			available: registry.available(),
		})?;
	let table = config
		.state
		.primary_config()
		.cloned()
		.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()));

	match factory(&table) {
		Ok(backend) => {
			tracing::info!(component = "state", implementation = %name, "Loaded");
			Ok(StateService::new(
				backend,
				Duration::from_secs(config.state.timeout_seconds),
			))
		},
		Err(e) => {
			tracing::error!(
				component = "state",
				implementation = %name,
				error = %e,
				"Failed to create state implementation"
			);
			Err(BuilderError::Creation {
				name: name.clone(),
				reason: e.to_string(),
			})
		},
	}
}
