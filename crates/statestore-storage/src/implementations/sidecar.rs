//! Sidecar state store backend.
//!
//! Persists state through a co-located sidecar that exposes the state API
//! over HTTP:
//!
//! - write: `POST http://<host>:<port>/v1.0/state/<store>` with the envelope
//!   array as the JSON body; only the configured status (201 by default)
//!   counts as success.
//! - read: `GET http://<host>:<port>/v1.0/state/<store>/<key>`; `204` means
//!   the key holds nothing. A `404` means the state endpoint itself is
//!   missing and is reported as a rejection.
//!
//! The HTTP client keeps no idle connections, so every operation opens a
//! fresh connection to the sidecar.

use crate::{StateStoreError, StateStoreFactory, StateStoreInterface, StateStoreRegistry};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use statestore_types::{
	ConfigSchema, Field, FieldKind, ImplementationRegistry, Schema, ValidationError,
};
use std::time::Duration;

const DEFAULT_SIDECAR_HOST: &str = "127.0.0.1";
const DEFAULT_SIDECAR_PORT: u16 = 3500;
const DEFAULT_STORE_NAME: &str = "statestore";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 5;

/// Sidecar-backed state store.
pub struct SidecarStateStore {
	client: reqwest::Client,
	/// `http://<host>:<port>/v1.0/state/<store>`
	state_url: String,
	/// `http://<host>:<port>/v1.0/healthz`
	health_url: String,
	expected_write_status: StatusCode,
}

impl SidecarStateStore {
	/// Creates a store talking to the sidecar at `host:port`.
	pub fn new(
		host: &str,
		port: u16,
		store_name: &str,
		expected_write_status: StatusCode,
		request_timeout: Duration,
	) -> Result<Self, StateStoreError> {
		let client = reqwest::Client::builder()
			.pool_max_idle_per_host(0)
			.timeout(request_timeout)
			.build()
			.map_err(|e| StateStoreError::Configuration(e.to_string()))?;

		let base = format!("http://{}:{}", host, port);

		Ok(Self {
			client,
			state_url: format!("{}/v1.0/state/{}", base, store_name),
			health_url: format!("{}/v1.0/healthz", base),
			expected_write_status,
		})
	}

	/// Returns the state endpoint writes are posted to.
	pub fn state_url(&self) -> &str {
		&self.state_url
	}

	async fn rejected(response: reqwest::Response) -> StateStoreError {
		let status = response.status();
		let body = response.text().await.unwrap_or_default();
		StateStoreError::Rejected {
			status: Some(status.as_u16()),
			message: if body.is_empty() {
				status.to_string()
			} else {
				body
			},
		}
	}
}

fn unreachable(err: reqwest::Error) -> StateStoreError {
	StateStoreError::Unreachable(format!("Failed to request sidecar state: {}", err))
}

#[async_trait]
impl StateStoreInterface for SidecarStateStore {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StateStoreError> {
		let url = format!("{}/{}", self.state_url, key);
		let response = self.client.get(&url).send().await.map_err(unreachable)?;

		match response.status() {
			StatusCode::NO_CONTENT => Ok(Vec::new()),
			status if status.is_success() => {
				let body = response.bytes().await.map_err(unreachable)?;
				Ok(body.to_vec())
			},
			_ => Err(Self::rejected(response).await),
		}
	}

	async fn set_bytes(&self, _key: &str, value: Vec<u8>) -> Result<(), StateStoreError> {
		// The envelope already carries its key
		let response = self
			.client
			.post(&self.state_url)
			.header(CONTENT_TYPE, "application/json")
			.body(value)
			.send()
			.await
			.map_err(unreachable)?;

		if response.status() == self.expected_write_status {
			Ok(())
		} else {
			Err(Self::rejected(response).await)
		}
	}

	async fn health(&self) -> Result<(), StateStoreError> {
		let response = self
			.client
			.get(&self.health_url)
			.send()
			.await
			.map_err(unreachable)?;

		if response.status().is_success() {
			Ok(())
		} else {
			Err(Self::rejected(response).await)
		}
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SidecarStateStoreSchema)
	}
}

/// Configuration schema for SidecarStateStore.
pub struct SidecarStateStoreSchema;

impl ConfigSchema for SidecarStateStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new()
			.optional(Field::non_empty_text("host"))
			.optional(Field::new("port", FieldKind::port()))
			.optional(Field::non_empty_text("store_name"))
			.optional(Field::new("expected_write_status", FieldKind::Integer(200..=299)))
			.optional(Field::new("request_timeout_seconds", FieldKind::seconds()))
			.validate(config)
	}
}

/// Factory function to create a sidecar backend from configuration.
///
/// Configuration parameters:
/// - `host`: sidecar host (default: "127.0.0.1")
/// - `port`: sidecar HTTP port (default: 3500)
/// - `store_name`: state store component name (default: "statestore")
/// - `expected_write_status`: status that marks a write as persisted (default: 201)
/// - `request_timeout_seconds`: per-request timeout (default: 5)
pub fn create_state_store(
	config: &toml::Value,
) -> Result<Box<dyn StateStoreInterface>, StateStoreError> {
	SidecarStateStoreSchema.validate(config)?;

	let host = config
		.get("host")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_SIDECAR_HOST);

	let port = integer_setting(config, "port")?.unwrap_or(DEFAULT_SIDECAR_PORT);

	let store_name = config
		.get("store_name")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORE_NAME);

	let expected_write_status = integer_setting::<u16>(config, "expected_write_status")?
		.map(StatusCode::from_u16)
		.transpose()
		.map_err(|e| StateStoreError::Configuration(e.to_string()))?
		.unwrap_or(StatusCode::CREATED);

	let request_timeout = integer_setting(config, "request_timeout_seconds")?
		.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS);

	let store = SidecarStateStore::new(
		host,
		port,
		store_name,
		expected_write_status,
		Duration::from_secs(request_timeout),
	)?;
	tracing::info!(
		component = "state",
		implementation = "sidecar",
		url = %store.state_url(),
		"Configured"
	);

	Ok(Box::new(store))
}

/// Reads an optional integer key, converting it to the target width.
fn integer_setting<T: TryFrom<i64>>(
	config: &toml::Value,
	key: &str,
) -> Result<Option<T>, StateStoreError>
where
	T::Error: std::fmt::Display,
{
	config
		.get(key)
		.and_then(|v| v.as_integer())
		.map(T::try_from)
		.transpose()
		.map_err(|e| StateStoreError::Configuration(format!("Invalid '{}': {}", key, e)))
}

/// Registry for the sidecar backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "sidecar";
	type Factory = StateStoreFactory;

	fn factory() -> Self::Factory {
		create_state_store
	}
}

impl StateStoreRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::StateService;
	use axum::{
		extract::{Path, State},
		response::{IntoResponse, Response},
		routing::{get, post},
		Json, Router,
	};
	use statestore_types::OrderRecord;
	use std::collections::HashMap;
	use std::sync::{Arc, Mutex};
	use tokio::net::TcpListener;

	type FakeStore = Arc<Mutex<HashMap<String, serde_json::Value>>>;

	#[derive(Clone)]
	struct FakeSidecar {
		store: FakeStore,
		write_status: StatusCode,
	}

	async fn save_state(
		State(sidecar): State<FakeSidecar>,
		Json(entries): Json<Vec<serde_json::Value>>,
	) -> StatusCode {
		if sidecar.write_status == StatusCode::CREATED {
			let mut store = sidecar.store.lock().unwrap();
			for entry in entries {
				let key = entry["key"].as_str().unwrap_or_default().to_string();
				store.insert(key, entry["value"].clone());
			}
		}
		sidecar.write_status
	}

	async fn get_state(State(sidecar): State<FakeSidecar>, Path(key): Path<String>) -> Response {
		let value = sidecar.store.lock().unwrap().get(&key).cloned();
		match value {
			Some(value) => (StatusCode::OK, value.to_string()).into_response(),
			None => StatusCode::NO_CONTENT.into_response(),
		}
	}

	/// Serves a minimal sidecar state API on an ephemeral port.
	async fn spawn_fake_sidecar(write_status: StatusCode) -> u16 {
		let sidecar = FakeSidecar {
			store: Arc::new(Mutex::new(HashMap::new())),
			write_status,
		};
		let app = Router::new()
			.route("/v1.0/state/statestore", post(save_state))
			.route("/v1.0/state/statestore/{key}", get(get_state))
			.route("/v1.0/healthz", get(|| async { StatusCode::NO_CONTENT }))
			.with_state(sidecar);

		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		port
	}

	fn service_for_port(port: u16) -> StateService {
		let config: toml::Value = toml::from_str(&format!("port = {}", port)).unwrap();
		let backend = create_state_store(&config)
			.map_err(|e| e.to_string())
			.unwrap();
		StateService::new(backend, Duration::from_secs(5))
	}

	#[test]
	fn test_state_url_layout() {
		let store = SidecarStateStore::new(
			DEFAULT_SIDECAR_HOST,
			DEFAULT_SIDECAR_PORT,
			DEFAULT_STORE_NAME,
			StatusCode::CREATED,
			Duration::from_secs(1),
		)
		.unwrap();
		assert_eq!(store.state_url(), "http://127.0.0.1:3500/v1.0/state/statestore");
	}

	#[test]
	fn test_schema_rejects_bad_values() {
		let bad_port: toml::Value = toml::from_str("port = 0").unwrap();
		assert!(SidecarStateStoreSchema.validate(&bad_port).is_err());

		let empty_store: toml::Value = toml::from_str("store_name = \" \"").unwrap();
		assert!(SidecarStateStoreSchema.validate(&empty_store).is_err());

		let bad_status: toml::Value = toml::from_str("expected_write_status = 500").unwrap();
		assert!(SidecarStateStoreSchema.validate(&bad_status).is_err());
	}

	#[tokio::test]
	async fn test_read_before_write_is_empty() {
		let port = spawn_fake_sidecar(StatusCode::CREATED).await;
		let service = service_for_port(port);

		assert!(service.read_order().await.unwrap().is_empty());
		assert!(service.health().await.is_ok());
	}

	#[tokio::test]
	async fn test_write_then_read_round_trip_and_overwrite() {
		let port = spawn_fake_sidecar(StatusCode::CREATED).await;
		let service = service_for_port(port);

		service.write_order(&OrderRecord::new("42")).await.unwrap();
		let bytes = service.read_order().await.unwrap();
		let record: OrderRecord = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(record, OrderRecord::new("42"));

		service.write_order(&OrderRecord::new("43")).await.unwrap();
		let bytes = service.read_order().await.unwrap();
		let record: OrderRecord = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(record.order_id(), "43");
	}

	#[tokio::test]
	async fn test_non_created_write_is_rejected() {
		let port = spawn_fake_sidecar(StatusCode::NO_CONTENT).await;
		let service = service_for_port(port);

		let err = service
			.write_order(&OrderRecord::new("1"))
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			StateStoreError::Rejected {
				status: Some(204),
				..
			}
		));
	}

	#[tokio::test]
	async fn test_missing_state_endpoint_is_rejected() {
		// An HTTP server with no state routes, e.g. the wrong port
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		tokio::spawn(async move {
			axum::serve(listener, Router::new()).await.unwrap();
		});
		let service = service_for_port(port);

		assert!(matches!(
			service.read_order().await,
			Err(StateStoreError::Rejected {
				status: Some(404),
				..
			})
		));
	}

	#[test]
	fn test_integer_setting_rejects_out_of_width_values() {
		let config: toml::Value = toml::from_str("port = 70000").unwrap();
		assert!(matches!(
			integer_setting::<u16>(&config, "port"),
			Err(StateStoreError::Configuration(_))
		));
		assert_eq!(integer_setting::<u16>(&config, "missing").unwrap(), None);

		let config: toml::Value = toml::from_str("port = 3501").unwrap();
		assert_eq!(integer_setting::<u16>(&config, "port").unwrap(), Some(3501));
	}

	#[tokio::test]
	async fn test_unreachable_sidecar() {
		// Reserve a port, then free it so nothing is listening
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		drop(listener);

		let service = service_for_port(port);

		assert!(matches!(
			service.read_order().await,
			Err(StateStoreError::Unreachable(_))
		));
		assert!(matches!(
			service.write_order(&OrderRecord::new("1")).await,
			Err(StateStoreError::Unreachable(_))
		));
	}
}
