//! Prism Daemon
//!
//! Chain mirror and discovery API for projected assets.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p prismd
//!
//! # Start with custom environment
//! PRISM_ENV=test PRISM_API_PORT=8081 cargo run -p prismd
//! ```
//!
//! # Environment Variables
//!
//! - `PRISM_ENV`: Environment (test, development, production)
//! - `PRISM_API_HOST`: API host (default: 0.0.0.0)
//! - `PRISM_API_PORT`: API port (default: 8080)
//! - `PRISM_MAKER_FEE_BP`: Default maker rate in basis points (default: 0)
//! - `PRISM_TAKER_FEE_BP`: Default taker rate in basis points (default: 0)
//! - `PRISM_CREATION_FEE`: Flat per-order creation fee (default: 0)
//! - `PRISM_FEE_COLLECTOR`: Fee collector address
//! - `PRISM_INVALID_VISIBILITY`: hidden or tagged (default: hidden)
//! - `PRISM_ACCEPTED_STANDARDS`: comma-separated standards (default: erc1155)

use prismd::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("prismd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        "Prism Daemon"
    );

    // Create and run daemon; the feed sender is where a chain
    // subscription would hand over finalized event batches.
    let (daemon, _feed) = Daemon::new_memory(config)?;
    daemon.run().await?;

    Ok(())
}
