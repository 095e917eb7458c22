//! Configuration module for the statestore system.
//!
//! Configuration is TOML. Before parsing, `${VAR}` and `${VAR:-default}`
//! placeholders are replaced with environment values, which is how the
//! built-in defaults pick up `APP_PORT`, `DAPR_HTTP_PORT`, `REDIS_URL` and
//! `STATE_STORE`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use statestore_types::DecodePolicy;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
pub mod builders {
	pub mod config;
}

/// Built-in configuration used when no file is given.
pub const DEFAULT_CONFIG_TOML: &str = r#"
[server]
host = "${APP_HOST:-0.0.0.0}"
port = ${APP_PORT:-8080}

[state]
primary = "${STATE_STORE:-redis}"
timeout_seconds = 5
decode_policy = "lenient"

[state.implementations.redis]
url = "${REDIS_URL:-redis://localhost:6379/0}"

[state.implementations.sidecar]
host = "127.0.0.1"
port = ${DAPR_HTTP_PORT:-3500}
store_name = "statestore"

[state.implementations.memory]
"#;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// HTTP listener settings.
	#[serde(default)]
	pub server: ServerConfig,
	/// State store selection and backend settings.
	pub state: StateConfig,
}

/// Configuration for the HTTP listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
	/// Host address to bind the server to.
	#[serde(default = "default_server_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_server_port")]
	pub port: u16,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: default_server_host(),
			port: default_server_port(),
			max_request_size: default_max_request_size(),
		}
	}
}

/// Configuration for the state store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateConfig {
	/// Which implementation serves requests.
	pub primary: String,
	/// Upper bound for every state store call, in seconds.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	/// How malformed order bodies are handled.
	#[serde(default)]
	pub decode_policy: DecodePolicy,
	/// Map of implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

impl StateConfig {
	/// Returns the table configured for the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}
}

fn default_server_host() -> String {
	"0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
	8080
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

fn default_timeout_seconds() -> u64 {
	5
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Builds the configuration from [`DEFAULT_CONFIG_TOML`].
	pub fn from_defaults() -> Result<Self, ConfigError> {
		DEFAULT_CONFIG_TOML.parse()
	}

	/// Selects a different primary implementation and re-validates.
	pub fn set_primary(&mut self, primary: impl Into<String>) -> Result<(), ConfigError> {
		self.state.primary = primary.into();
		self.validate()
	}

	/// Validates the configuration.
	///
	/// - The primary implementation is named and configured
	/// - The state call timeout is between 1 and 300 seconds
	/// - The listener port is non-zero and the body limit positive
	fn validate(&self) -> Result<(), ConfigError> {
		if self.state.primary.is_empty() {
			return Err(ConfigError::Validation(
				"State primary implementation cannot be empty".into(),
			));
		}
		if self.state.primary_config().is_none() {
			let mut available: Vec<_> = self.state.implementations.keys().cloned().collect();
			available.sort();
			return Err(ConfigError::Validation(format!(
				"Primary state store '{}' not found in implementations. Configured: [{}]",
				self.state.primary,
				available.join(", ")
			)));
		}
		if self.state.timeout_seconds == 0 || self.state.timeout_seconds > 300 {
			return Err(ConfigError::Validation(
				"State timeout_seconds must be between 1 and 300".into(),
			));
		}

		if self.server.port == 0 {
			return Err(ConfigError::Validation(
				"Server port must be greater than 0".into(),
			));
		}
		if self.server.max_request_size == 0 {
			return Err(ConfigError::Validation(
				"Server max_request_size must be greater than 0".into(),
			));
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved first and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
