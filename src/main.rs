use std::path::Path;

use anyhow::Result;
use clap::Parser;
use clap_serde_derive::ClapSerde;
use tokio::net::TcpListener;
use tracing::{error, info};

use sentiment_api::api::{create_router, AppState};
use sentiment_api::config::{Config, DEFAULT_CONFIG_FILE};
use sentiment_api::exit_err;
use sentiment_api::inference::service::PredictionService;
use sentiment_api::telemetry::init_telemetry;

#[cfg(unix)]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config_file, args.config_file == DEFAULT_CONFIG_FILE)?
        .merge(args.opt_config);

    init_telemetry(config.otlp_endpoint(), config.console_log)?;

    // The listener is only bound once the model is in memory
    let service = match PredictionService::from_artifact(Path::new(&config.model_path)) {
        Ok(service) => service,
        Err(err) => exit_err!(1, "Failed to load model: {:#}", err),
    };

    let router = create_router(AppState::new(service), &config.cors_origin)?;
    let listener = TcpListener::bind(format!("{}:{}", config.address, config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    info!("Allowing cross-origin requests from {}", config.cors_origin);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if config.otlp_endpoint().is_some() {
        opentelemetry::global::shutdown_tracer_provider();
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
