//! Venue server binary: loads configuration, sets up logging, and runs
//! until ctrl-c.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use venue_engine::config::VenueConfig;
use venue_engine::server::VenueServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = VenueConfig::load(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    VenueServer::run(config).await?;
    Ok(())
}
