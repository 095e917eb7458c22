//! State store module for the statestore system.
//!
//! This module provides the abstraction the HTTP front end persists orders
//! through, together with its backends: a direct Redis client, a proxy to a
//! sidecar's state HTTP API, and an in-memory store for tests and local runs.

use async_trait::async_trait;
use statestore_types::{
	encode_entries, ConfigSchema, ImplementationRegistry, OrderRecord, StateEntry, StateKey,
	ValidationError,
};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
	pub mod redis;
	pub mod sidecar;
}

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateStoreError {
	/// The backend connection or endpoint could not be reached.
	#[error("State store unreachable: {0}")]
	Unreachable(String),
	/// The backend was reached but refused the operation.
	#[error("State store rejected the request{}: {message}", .status.map(|s| format!(" with status {}", s)).unwrap_or_default())]
	Rejected {
		status: Option<u16>,
		message: String,
	},
	/// The operation did not complete within the configured bound.
	#[error("State store operation timed out after {0:?}")]
	Timeout(Duration),
	/// Error that occurs during serialization of the stored envelope.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl StateStoreError {
	/// Returns true when the backend could not be reached in time, as opposed
	/// to answering with a failure.
	pub fn is_unavailable(&self) -> bool {
		matches!(
			self,
			StateStoreError::Unreachable(_) | StateStoreError::Timeout(_)
		)
	}
}

impl From<ValidationError> for StateStoreError {
	fn from(err: ValidationError) -> Self {
		StateStoreError::Configuration(err.to_string())
	}
}

/// Trait defining the low-level interface for state store backends.
///
/// Values are opaque bytes: the serialized envelope array on write, and
/// whatever the backend holds for the key on read.
#[async_trait]
pub trait StateStoreInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	///
	/// A key that was never written yields an empty vector, not an error.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StateStoreError>;

	/// Replaces the value stored under the given key. No expiration is set.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StateStoreError>;

	/// Probes backend connectivity.
	async fn health(&self) -> Result<(), StateStoreError> {
		Ok(())
	}

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for state store factory functions.
pub type StateStoreFactory =
	fn(&toml::Value) -> Result<Box<dyn StateStoreInterface>, StateStoreError>;

/// Registry trait for state store implementations.
pub trait StateStoreRegistry: ImplementationRegistry<Factory = StateStoreFactory> {}

/// Get all registered state store implementations.
///
/// Returns a vector of (name, factory) tuples for all available backends.
pub fn get_all_implementations() -> Vec<(&'static str, StateStoreFactory)> {
	use implementations::{memory, redis, sidecar};

	vec![
		(memory::Registry::NAME, memory::Registry::factory()),
		(redis::Registry::NAME, redis::Registry::factory()),
		(sidecar::Registry::NAME, sidecar::Registry::factory()),
	]
}

/// High-level state service that reads and writes the order envelope.
///
/// The StateService wraps a single backend chosen at startup. Each public
/// operation performs exactly one backend call, bounded by `timeout`.
pub struct StateService {
	/// The underlying state store backend implementation.
	backend: Box<dyn StateStoreInterface>,
	/// Upper bound for every backend call.
	timeout: Duration,
}

impl StateService {
	/// Creates a new StateService with the specified backend and call timeout.
	pub fn new(backend: Box<dyn StateStoreInterface>, timeout: Duration) -> Self {
		Self { backend, timeout }
	}

	/// Wraps the record in the stored envelope and replaces the stored value.
	pub async fn write_order(&self, record: &OrderRecord) -> Result<(), StateStoreError> {
		let entry = StateEntry::for_order(record.clone());
		let bytes = encode_entries(std::slice::from_ref(&entry))
			.map_err(|e| StateStoreError::Serialization(e.to_string()))?;

		self.bounded(self.backend.set_bytes(StateKey::Order.as_str(), bytes))
			.await
	}

	/// Returns the raw stored bytes for the order key, unchanged.
	pub async fn read_order(&self) -> Result<Vec<u8>, StateStoreError> {
		self.bounded(self.backend.get_bytes(StateKey::Order.as_str()))
			.await
	}

	/// Probes the backend.
	pub async fn health(&self) -> Result<(), StateStoreError> {
		self.bounded(self.backend.health()).await
	}

	async fn bounded<T>(
		&self,
		operation: impl Future<Output = Result<T, StateStoreError>>,
	) -> Result<T, StateStoreError> {
		match tokio::time::timeout(self.timeout, operation).await {
			Ok(result) => result,
			Err(_) => Err(StateStoreError::Timeout(self.timeout)),
		}
	}
}
