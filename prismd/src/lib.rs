//! Prism Daemon Library
//!
//! Runtime orchestrator for the projection and settlement mirror.
//!
//! # Architecture
//!
//! ```text
//! Chain feed → Event Source → Synchronizer → Engine mirror
//!                                   ↓             ↑ (reads)
//!                             Fact log        Discovery API
//! ```
//!
//! # Components
//!
//! - **Daemon**: main runtime orchestrator
//! - **ChannelEventSource**: channel-backed feed of finalized events
//! - **API**: read-only HTTP endpoints over mirror state
//! - **Config**: environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use prismd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let (daemon, _feed) = Daemon::new_memory(config).expect("Failed to build daemon");
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;

// Re-exports for convenience
pub use config::{ApiConfig, Config, Environment, FeeConfig, InvalidVisibility};
pub use daemon::{ChannelEventSource, Daemon};
pub use error::{DaemonError, DaemonResult};
