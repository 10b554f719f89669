//! Casino Engine Server Binary

use casino_engine::{api::ApiServer, CasinoEngine, ConfigLoader};
use clap::Parser;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "casino-engine")]
#[command(about = "Two-phase dice wagering server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Database directory (overrides the config file)
    #[arg(long)]
    db_path: Option<String>,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Allowed CORS origins (comma-separated, use * for all)
    #[arg(long)]
    cors_origins: Option<String>,

    /// Disable daily limits and cooldown gating
    #[arg(long)]
    no_enforce: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casino_engine=info,tower_http=info".into()),
        )
        .init();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;

    if let Some(db_path) = args.db_path {
        config.storage.data_directory = db_path;
    }
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(origins) = args.cors_origins {
        config.api.allowed_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
    }
    if args.no_enforce {
        config.limits.enforce = false;
    }

    tracing::info!(data_directory = %config.storage.data_directory, "Opening casino database");
    let api_config = config.api.clone();
    let engine = Arc::new(CasinoEngine::open(config)?);

    ApiServer::new(api_config, engine).run().await?;
    Ok(())
}
