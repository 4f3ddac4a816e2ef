use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avatar_relay::{
    broadcast::Broadcaster,
    config::Config,
    database::Database,
    enrichment::EnrichmentPipeline,
    profile_images::{HttpProfileFetcher, ProfileImageResolver},
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "avatar-relay")]
#[command(version = "0.1.0")]
#[command(about = "Relays live avatar positions with cached profile images and blur hashes")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("avatar_relay={},tower_http=trace", cli.log_level)
    } else {
        format!("avatar_relay={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting avatar relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from specified file
    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    info!("Using database: {}", config.database.url);

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let fetcher = Arc::new(HttpProfileFetcher::new(&config.profiles)?);
    let resolver = ProfileImageResolver::new(database.clone(), fetcher, &config.profiles);
    info!("Profile image resolver initialized");

    let broadcaster = Arc::new(Broadcaster::new());
    let pipeline = EnrichmentPipeline::new(resolver, broadcaster.clone());

    let web_server = WebServer::new(&config, pipeline, broadcaster)?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}
