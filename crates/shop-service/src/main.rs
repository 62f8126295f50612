//! Main entry point for the fragrance shop backend.
//!
//! Loads the configuration, assembles the order engine from the registered
//! storage and notification backends, and serves the HTTP API alongside the
//! engine's background cleanup task until interrupted.

use clap::Parser;
use shop_config::Config;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod identity;
mod server;

/// Command-line arguments for the shop service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "SHOP_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

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

	tracing::info!("Started shop service");

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!("Loaded configuration [{}]", config.shop.id);

	let engine = factory_registry::build_engine_from_config(config.clone())?;
	engine.initialize().await?;
	let engine = Arc::new(engine);

	match config.api.clone().filter(|api| api.enabled) {
		Some(api_config) => {
			let api_engine = Arc::clone(&engine);
			tokio::select! {
				result = engine.run() => {
					tracing::info!("Engine finished");
					result?;
				}
				result = server::start_server(api_config, api_engine) => {
					tracing::info!("API server finished");
					result?;
				}
			}
		},
		None => {
			tracing::warn!("API disabled; running background tasks only");
			engine.run().await?;
		},
	}

	engine.shutdown().await?;
	tracing::info!("Stopped shop service");
	Ok(())
}
