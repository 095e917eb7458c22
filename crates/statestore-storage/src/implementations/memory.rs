//! In-memory state store backend.
//!
//! Keeps state in a process-local map. Nothing survives a restart, which
//! makes it the backend of choice for tests and local development.

use crate::{StateStoreError, StateStoreFactory, StateStoreInterface, StateStoreRegistry};
use async_trait::async_trait;
use statestore_types::{ConfigSchema, ImplementationRegistry, Schema};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory state store implementation.
#[derive(Clone, Default)]
pub struct MemoryStorage {
	/// The in-memory store protected by a read-write lock.
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	/// Creates a new, empty MemoryStorage instance.
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StateStoreInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StateStoreError> {
		let store = self.store.read().await;
		Ok(store.get(key).cloned().unwrap_or_default())
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StateStoreError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	/// Accepts any table; there is nothing to configure.
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(Schema::new())
	}
}

/// Builds an empty store. The table must still be a table.
pub fn create_state_store(
	config: &toml::Value,
) -> Result<Box<dyn StateStoreInterface>, StateStoreError> {
	let storage = MemoryStorage::new();
	storage.config_schema().validate(config)?;
	Ok(Box::new(storage))
}

/// Registry for the memory backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StateStoreFactory;

	fn factory() -> Self::Factory {
		create_state_store
	}
}

impl StateStoreRegistry for Registry {}
