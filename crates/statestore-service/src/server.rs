//! HTTP server for the statestore front end.
//!
//! Exposes exactly two routes, `GET /order` and `POST /neworder`. Anything
//! else falls through to axum's default 404/405 handling.

use axum::{
	body::Bytes,
	extract::{DefaultBodyLimit, State},
	response::Response,
	routing::{get, post},
	Router,
};
use statestore_config::ServerConfig;
use statestore_storage::StateService;
use statestore_types::{APIError, DecodePolicy};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::apis::order::{self, OrderError};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// State service backed by the configured primary implementation.
	pub state: Arc<StateService>,
	/// How malformed order bodies are treated.
	pub decode_policy: DecodePolicy,
}

/// Builds the router with both order routes and request middleware.
pub fn build_router(app_state: AppState, max_request_size: usize) -> Router {
	Router::new()
		.route("/order", get(handle_get_order))
		.route("/neworder", post(handle_new_order))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(DefaultBodyLimit::max(max_request_size)),
		)
		.with_state(app_state)
}

/// Binds the listener and serves requests until the process stops.
pub async fn start_server(
	server_config: ServerConfig,
	app_state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(app_state, server_config.max_request_size);

	let bind_address = format!("{}:{}", server_config.host, server_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("statestore API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /order requests.
async fn handle_get_order(State(state): State<AppState>) -> Result<Response, APIError> {
	order::get_order(&state.state).await
}

/// Handles POST /neworder requests.
async fn handle_new_order(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Response, OrderError> {
	order::create_order(&state.state, &body, state.decode_policy).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use axum::{
		body::{self, Body},
		http::{Request, StatusCode},
	};
	use statestore_storage::{
		implementations::memory::MemoryStorage, StateStoreError, StateStoreInterface,
	};
	use statestore_types::{ConfigSchema, Schema, StateEntry};
	use std::time::Duration;
	use tower::ServiceExt;

	const MAX_BODY: usize = 1024;

	fn app_with(backend: Box<dyn StateStoreInterface>, policy: DecodePolicy) -> Router {
		let app_state = AppState {
			state: Arc::new(StateService::new(backend, Duration::from_secs(5))),
			decode_policy: policy,
		};
		build_router(app_state, MAX_BODY)
	}

	fn memory_app(policy: DecodePolicy) -> Router {
		app_with(Box::new(MemoryStorage::new()), policy)
	}

	fn post_order(body: impl Into<Body>) -> Request<Body> {
		Request::post("/neworder")
			.header("content-type", "application/json")
			.body(body.into())
			.expect("request")
	}

	fn get_order() -> Request<Body> {
		Request::get("/order").body(Body::empty()).expect("request")
	}

	async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
		let response = app.clone().oneshot(request).await.expect("response");
		let status = response.status();
		let body = body::to_bytes(response.into_body(), usize::MAX)
			.await
			.expect("body");
		(status, body.to_vec())
	}

	/// Backend whose every call fails with a fixed error.
	struct BrokenStore {
		unreachable: bool,
	}

	impl BrokenStore {
		fn error(&self) -> StateStoreError {
			if self.unreachable {
				StateStoreError::Unreachable("connection refused".to_string())
			} else {
				StateStoreError::Rejected {
					status: Some(500),
					message: "ERR internal".to_string(),
				}
			}
		}
	}

	#[async_trait]
	impl StateStoreInterface for BrokenStore {
		async fn get_bytes(&self, _key: &str) -> Result<Vec<u8>, StateStoreError> {
			Err(self.error())
		}

		async fn set_bytes(&self, _key: &str, _value: Vec<u8>) -> Result<(), StateStoreError> {
			Err(self.error())
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(Schema::new())
		}
	}

	#[tokio::test]
	async fn test_new_order_then_get_returns_envelope() {
		let app = memory_app(DecodePolicy::Lenient);

		let (status, body) = send(&app, post_order(r#"{"data":{"orderId":"42"}}"#)).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, b"Succeeded to store your request.\n");

		let (status, body) = send(&app, get_order()).await;
		assert_eq!(status, StatusCode::OK);
		let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
		assert_eq!(
			json,
			serde_json::json!([{"key": "order", "value": {"data": {"orderId": "42"}}}])
		);
	}

	#[tokio::test]
	async fn test_get_before_any_write_is_empty_ok() {
		let app = memory_app(DecodePolicy::Lenient);

		let (status, body) = send(&app, get_order()).await;
		assert_eq!(status, StatusCode::OK);
		assert!(body.is_empty());
	}

	#[tokio::test]
	async fn test_latest_write_wins() {
		let app = memory_app(DecodePolicy::Lenient);

		send(&app, post_order(r#"{"data":{"orderId":"1"}}"#)).await;
		send(&app, post_order(r#"{"data":{"orderId":"2"}}"#)).await;

		let (_, body) = send(&app, get_order()).await;
		let entries: Vec<StateEntry> = serde_json::from_slice(&body).expect("json");
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].value.order_id(), "2");
	}

	#[tokio::test]
	async fn test_malformed_body_is_stored_as_empty_order_when_lenient() {
		let app = memory_app(DecodePolicy::Lenient);

		let (status, body) = send(&app, post_order("this is not json")).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, b"Succeeded to store your request.\n");

		let (_, body) = send(&app, get_order()).await;
		let entries: Vec<StateEntry> = serde_json::from_slice(&body).expect("json");
		assert_eq!(entries[0].value.order_id(), "");
	}

	#[tokio::test]
	async fn test_malformed_body_is_rejected_when_strict() {
		let app = memory_app(DecodePolicy::Strict);

		let (status, body) = send(&app, post_order("this is not json")).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
		assert_eq!(json["error"], "INVALID_ORDER");

		// Nothing was written
		let (status, body) = send(&app, get_order()).await;
		assert_eq!(status, StatusCode::OK);
		assert!(body.is_empty());
	}

	#[tokio::test]
	async fn test_empty_body_stores_empty_order_under_either_policy() {
		for policy in [DecodePolicy::Lenient, DecodePolicy::Strict] {
			let app = memory_app(policy);
			let (status, _) = send(&app, post_order(Body::empty())).await;
			assert_eq!(status, StatusCode::OK);
		}
	}

	#[tokio::test]
	async fn test_unreachable_backend_yields_5xx_and_service_keeps_running() {
		let app = app_with(Box::new(BrokenStore { unreachable: true }), DecodePolicy::Lenient);

		let (status, body) = send(&app, get_order()).await;
		assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
		let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
		assert_eq!(json["error"], "STATE_STORE_UNAVAILABLE");
		assert!(json["message"].as_str().unwrap().contains("connection refused"));

		let (status, body) = send(&app, post_order(r#"{"data":{"orderId":"42"}}"#)).await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(body, b"Failed to store your request.\n");

		// Still serving after the failures
		let (status, body) = send(&app, get_order()).await;
		assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
		assert!(!body.is_empty());
	}

	#[tokio::test]
	async fn test_rejected_read_yields_internal_error() {
		let app = app_with(Box::new(BrokenStore { unreachable: false }), DecodePolicy::Lenient);

		let (status, body) = send(&app, get_order()).await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
		assert_eq!(json["error"], "STATE_STORE_ERROR");
	}

	#[tokio::test]
	async fn test_unknown_routes_are_not_handled() {
		let app = memory_app(DecodePolicy::Lenient);

		let request = Request::get("/orders").body(Body::empty()).expect("request");
		let (status, _) = send(&app, request).await;
		assert_eq!(status, StatusCode::NOT_FOUND);

		let request = Request::get("/neworder").body(Body::empty()).expect("request");
		let (status, _) = send(&app, request).await;
		assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
	}

	#[tokio::test]
	async fn test_oversized_body_is_rejected() {
		let app = memory_app(DecodePolicy::Lenient);

		let (status, _) = send(&app, post_order(vec![b' '; MAX_BODY + 1])).await;
		assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
	}

	#[tokio::test]
	async fn test_router_built_from_config_honours_limits_and_policy() {
		let config = statestore_config::builders::config::ConfigBuilder::new()
			.timeout_seconds(1)
			.decode_policy(DecodePolicy::Strict)
			.max_request_size(64)
			.build();
		let service = crate::factory_registry::build_state_service(
			crate::factory_registry::get_registry(),
			&config,
		)
		.expect("memory service");
		let app = build_router(
			AppState {
				state: Arc::new(service),
				decode_policy: config.state.decode_policy,
			},
			config.server.max_request_size,
		);

		let (status, _) = send(&app, post_order("{")).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);

		let (status, _) = send(&app, post_order(vec![b' '; 65])).await;
		assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

		let (status, _) = send(&app, post_order(r#"{"data":{"orderId":"7"}}"#)).await;
		assert_eq!(status, StatusCode::OK);
	}
}
