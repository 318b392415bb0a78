//! kafkatest: standalone mock Kafka broker
//!
//! Runs the mock broker with only the default responder registered:
//! - Fetch and Produce answer with "unknown topic or partition"
//! - Metadata advertises this process as the only broker
//!
//! Handy for pointing a client at a broker that is reachable but empty.
//! Configuration via CLI arguments or TOML file.

mod config;

use config::Config;
use kafkatest::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(listen = %config.listen, "Starting kafkatest mock broker");

    let server = Server::with_listen(config.listen);
    server.start().await?;
    info!(address = %server.address()?, "Ready");

    tokio::signal::ctrl_c().await?;
    server.close();

    info!(
        processed = server.processed(),
        failures = server.failures().len(),
        "Shut down"
    );
    Ok(())
}
