//! Direct Redis state store backend.
//!
//! Talks to a Redis-compatible server through a single long-lived [`fred`]
//! client created at startup. The client multiplexes concurrent commands over
//! its connection, so one handle is shared by every in-flight request.

use crate::{StateStoreError, StateStoreFactory, StateStoreInterface, StateStoreRegistry};
use async_trait::async_trait;
use fred::error::{Error as FredError, ErrorKind};
use fred::prelude::{Builder, Client, ClientLike, Config, KeysInterface, ReconnectPolicy};
use statestore_types::{
	ConfigSchema, Field, FieldKind, ImplementationRegistry, Schema, ValidationError,
};
use std::time::Duration;

/// Address used when the configuration does not name one.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";

const DEFAULT_CONNECTION_TIMEOUT_SECONDS: u64 = 5;

/// Delay between reconnection attempts, in milliseconds.
const RECONNECT_DELAY_MS: u32 = 1000;

/// Redis-backed state store.
pub struct RedisStateStore {
	client: Client,
}

impl RedisStateStore {
	/// Builds a client for `url` and starts connecting in the background.
	///
	/// Must be called from within a Tokio runtime. The connection task keeps
	/// reconnecting when the server goes away; commands issued while
	/// disconnected wait for the next connection or for the caller's timeout.
	pub fn connect(url: &str, connection_timeout: Duration) -> Result<Self, StateStoreError> {
		if tokio::runtime::Handle::try_current().is_err() {
			return Err(StateStoreError::Configuration(
				"Redis backend must be created inside a Tokio runtime".into(),
			));
		}

		let config = Config::from_url(url).map_err(|e| {
			StateStoreError::Configuration(format!("Invalid Redis URL '{}': {}", url, e))
		})?;

		let client = Builder::from_config(config)
			.with_connection_config(|connection| {
				connection.connection_timeout = connection_timeout;
			})
			.set_policy(ReconnectPolicy::new_constant(0, RECONNECT_DELAY_MS))
			.build()
			.map_err(|e| StateStoreError::Configuration(e.to_string()))?;

		// The handle resolves only when the client shuts down for good
		let _connection_task = client.connect();
		tracing::info!(component = "state", implementation = "redis", %url, "Connecting");

		Ok(Self { client })
	}
}

/// Maps a client error to the state store taxonomy.
///
/// Transport-level failures mean the server could not be reached; anything
/// else is an answer from the server.
fn map_redis_error(err: FredError) -> StateStoreError {
	match err.kind() {
		ErrorKind::IO | ErrorKind::Timeout | ErrorKind::Canceled => {
			StateStoreError::Unreachable(err.to_string())
		},
		_ => StateStoreError::Rejected {
			status: None,
			message: err.to_string(),
		},
	}
}

#[async_trait]
impl StateStoreInterface for RedisStateStore {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StateStoreError> {
		let value: Option<Vec<u8>> = self.client.get(key).await.map_err(map_redis_error)?;
		// Missing key is a valid, empty result
		Ok(value.unwrap_or_default())
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StateStoreError> {
		let _: () = self
			.client
			.set(key, value, None, None, false)
			.await
			.map_err(map_redis_error)?;
		Ok(())
	}

	async fn health(&self) -> Result<(), StateStoreError> {
		self.client
			.wait_for_connect()
			.await
			.map_err(map_redis_error)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RedisStateStoreSchema)
	}
}

/// Configuration schema for RedisStateStore.
pub struct RedisStateStoreSchema;

impl ConfigSchema for RedisStateStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new()
			.optional(Field::new("url", FieldKind::Text).validated_by(|value| {
				let url = value.as_str().unwrap_or_default();
				if url.starts_with("redis://") || url.starts_with("rediss://") {
					Ok(())
				} else {
					Err("must use the redis:// or rediss:// scheme".to_string())
				}
			}))
			.optional(Field::new("connection_timeout_seconds", FieldKind::seconds()))
			.validate(config)
	}
}

/// Factory function to create a Redis backend from configuration.
///
/// Configuration parameters:
/// - `url`: server URL (default: "redis://localhost:6379/0")
/// - `connection_timeout_seconds`: connect timeout (default: 5)
pub fn create_state_store(
	config: &toml::Value,
) -> Result<Box<dyn StateStoreInterface>, StateStoreError> {
	RedisStateStoreSchema.validate(config)?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_REDIS_URL);

	let connection_timeout = config
		.get("connection_timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(u64::try_from)
		.transpose()
		.map_err(|e| {
			StateStoreError::Configuration(format!("Invalid 'connection_timeout_seconds': {}", e))
		})?
		.unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECONDS);

	Ok(Box::new(RedisStateStore::connect(
		url,
		Duration::from_secs(connection_timeout),
	)?))
}

/// Registry for the Redis backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "redis";
	type Factory = StateStoreFactory;

	fn factory() -> Self::Factory {
		create_state_store
	}
}

impl StateStoreRegistry for Registry {}
