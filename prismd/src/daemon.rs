//! Daemon: runtime orchestrator.
//!
//! Wires the engine mirror, the synchronizer loop and the discovery
//! API together:
//!
//! 1. Load configuration
//! 2. Build the engine from the configured fee schedule and validator
//! 3. Resume the synchronizer from the persisted cursor
//! 4. Drive it from a channel-backed event source as a background task
//! 5. Serve the discovery API until SIGINT

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};

use prism_engine::Engine;
use prism_store::{MemoryCheckpointStore, MemoryFactLog};
use prism_sync::{EventEnvelope, EventSource, SyncError, Synchronizer};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::error::DaemonResult;

// =============================================================================
// Event source
// =============================================================================

/// An `EventSource` fed through a tokio channel.
///
/// Whatever ingests chain deliveries (a node subscription, a bridge
/// process, a test) pushes ordered batches into the sender; the stream
/// ends when the last sender is dropped.
pub struct ChannelEventSource {
    receiver: mpsc::Receiver<Vec<EventEnvelope>>,
}

impl ChannelEventSource {
    /// Create a bounded channel and its source end.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Vec<EventEnvelope>>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self { receiver })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<EventEnvelope>>, SyncError> {
        Ok(self.receiver.recv().await)
    }
}

// =============================================================================
// Daemon
// =============================================================================

/// The main Prism daemon.
pub struct Daemon {
    config: Config,
    engine: Arc<RwLock<Engine>>,
    source: ChannelEventSource,
}

impl Daemon {
    /// Create a daemon with in-memory stores.
    ///
    /// Returns the daemon and the sender that feeds it event batches.
    pub fn new_memory(config: Config) -> DaemonResult<(Self, mpsc::Sender<Vec<EventEnvelope>>)> {
        let engine = Arc::new(RwLock::new(config.build_engine()?));
        let (sender, source) = ChannelEventSource::channel(256);
        Ok((Self { config, engine, source }, sender))
    }

    /// The shared engine handle.
    pub fn engine(&self) -> Arc<RwLock<Engine>> {
        Arc::clone(&self.engine)
    }

    /// Run the daemon.
    ///
    /// Blocks until shutdown is requested (SIGINT) or the API server
    /// fails. A synchronizer fault halts the sync task and is logged;
    /// the discovery API keeps serving the last consistent state.
    pub async fn run(self) -> DaemonResult<()> {
        let Daemon { config, engine, mut source } = self;

        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %config.environment,
            "Starting Prism daemon"
        );

        let mut synchronizer = Synchronizer::resume(
            Arc::clone(&engine),
            MemoryCheckpointStore::new(),
            MemoryFactLog::new(),
        )
        .await?;

        let sync_task = tokio::spawn(async move {
            if let Err(e) = prism_sync::run(&mut synchronizer, &mut source).await {
                error!(error = %e, "Synchronizer halted");
            }
        });

        let state = Arc::new(ApiState {
            engine,
            invalid_visibility: config.invalid_visibility,
        });
        let router = create_router(state);

        let addr = format!("{}:{}", config.api.host, config.api.port);
        let listener = TcpListener::bind(&addr).await?;
        info!(api_addr = %listener.local_addr()?, "Discovery API started");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // The feed sender side may still be alive; the sync task ends
        // with the process.
        sync_task.abort();
        info!("Daemon stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_store::{CheckpointStore, FactLog};
    use prism_testkit::{addr, claim_payload, EventScript};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn channel_source_feeds_the_synchronizer() {
        let config = Config::test();
        let engine = Arc::new(RwLock::new(config.build_engine().unwrap()));
        let (sender, mut source) = ChannelEventSource::channel(8);

        let checkpoints = Arc::new(MemoryCheckpointStore::new());
        let facts = Arc::new(MemoryFactLog::new());
        let mut synchronizer = Synchronizer::resume(
            Arc::clone(&engine),
            Arc::clone(&checkpoints),
            Arc::clone(&facts),
        )
        .await
        .unwrap();

        let owner = addr("0xa11ce");
        let mut script = EventScript::new();
        let batch = vec![script.projected(&owner, dec!(3), Some(claim_payload("3", "erc1155")))];
        sender.send(batch).await.unwrap();
        drop(sender);

        prism_sync::run(&mut synchronizer, &mut source).await.unwrap();

        assert_eq!(engine.read().await.owner_projections(&owner).len(), 1);
        assert!(checkpoints.load().await.unwrap().is_some());
        assert!(!facts.list_since(0).await.unwrap().is_empty());
    }
}
