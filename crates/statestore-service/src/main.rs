//! Main entry point for the statestore service.
//!
//! This binary accepts orders over HTTP and keeps the latest one in a state
//! store, either a Redis server reached directly or a sidecar's state API.

use clap::Parser;
use statestore_config::Config;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the statestore service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file; built-in defaults are used when omitted
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// State store implementation to use, overriding the configured primary
	#[arg(short, long)]
	backend: Option<String>,
}

/// Main entry point for the statestore service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file or built-in defaults
/// 4. Builds the state service for the primary backend
/// 5. Serves HTTP until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started statestore");

	let config = load_config(&args).await?;
	tracing::info!(
		primary = %config.state.primary,
		decode_policy = ?config.state.decode_policy,
		"Loaded configuration"
	);

	let state = factory_registry::build_state_service(factory_registry::get_registry(), &config)?;

	// Startup probe is informational only
	match state.health().await {
		Ok(()) => tracing::info!(component = "state", "State store reachable"),
		Err(e) => tracing::warn!(component = "state", error = %e, "State store not reachable yet"),
	}

	let app_state = server::AppState {
		state: Arc::new(state),
		decode_policy: config.state.decode_policy,
	};

	tokio::select! {
		result = server::start_server(config.server.clone(), app_state) => {
			result?;
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Shutdown signal received");
		}
	}

	tracing::info!("Stopped statestore");
	Ok(())
}

/// Loads the configuration named on the command line, or the built-in
/// defaults, then applies the backend override.
async fn load_config(args: &Args) -> Result<Config, statestore_config::ConfigError> {
	let mut config = match &args.config {
		Some(path) => Config::from_file(path).await?,
		None => Config::from_defaults()?,
	};

	if let Some(backend) = &args.backend {
		config.set_primary(backend.clone())?;
	}

	Ok(config)
}
