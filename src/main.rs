use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use solar_forecast::config::Config;
use solar_forecast::ml::ModelStore;
use solar_forecast::telemetry;
use solar_forecast::web::PredictionServer;

#[derive(Parser)]
#[command(name = "solar-forecast-service")]
#[command(about = "HTTP prediction service for solar irradiance forecasts")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Overrides `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Overrides `server.port`
    #[arg(long)]
    port: Option<u16>,

    /// Overrides `model.artifact_path`
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(model) = cli.model {
        config.model.artifact_path = model;
    }

    info!("Starting solar irradiance prediction service");

    // A bad artifact stops the process before anything is served.
    let store = ModelStore::from_config(&config.model)
        .with_context(|| format!("failed to load model from {}", config.model.artifact_path))?;
    info!(
        "Serving model {} from {} (inference timeout {:?}, horizon {} days)",
        store.model_version(),
        store.artifact_path().display(),
        store.inference_timeout(),
        store.max_horizon_days()
    );

    let metrics = telemetry::install_recorder()?;
    let server = PredictionServer::new(store).with_metrics(metrics);

    server.start(&config.bind_address()).await
}
