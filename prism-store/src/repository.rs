//! Storage port definitions.
//!
//! These traits define the durability interface behind the
//! synchronizer: the high-water mark it resumes from, and the
//! append-only log of facts it makes available to indexers.
//! Implementations can be PostgreSQL or in-memory for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use prism_domain::Fact;
use serde::{Deserialize, Serialize};

/// Durable high-water mark of the last applied chain event.
///
/// `digest` is the content digest of the last applied envelope, kept so
/// that a replay claiming the same position with different content can
/// be detected as divergence rather than silently skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Block height of the last applied event
    pub block: u64,
    /// Position within that block
    pub index: u32,
    /// Origin transaction of the last applied event
    pub tx_hash: String,
    /// Log position within the origin transaction
    pub log_index: u32,
    /// Content digest of the last applied envelope
    pub digest: String,
}

/// A fact with its assigned log sequence and chain position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    /// Append sequence, strictly increasing
    pub seq: i64,
    /// Block the originating event was finalized in
    pub block: u64,
    /// Position within that block
    pub index: u32,
    /// The emitted fact
    pub fact: Fact,
}

/// Repository for the synchronizer's cursor.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the persisted cursor, if any.
    async fn load(&self) -> Result<Option<Cursor>, StoreError>;

    /// Persist the cursor (overwrite).
    async fn save(&self, cursor: &Cursor) -> Result<(), StoreError>;
}

/// Append-only log of emitted facts (the indexer feed).
#[async_trait]
pub trait FactLog: Send + Sync {
    /// Append facts emitted while applying the event at `(block, index)`.
    ///
    /// Returns the sequence of the last appended record, or the current
    /// high sequence when `facts` is empty.
    async fn append(&self, block: u64, index: u32, facts: &[Fact]) -> Result<i64, StoreError>;

    /// All records with sequence strictly greater than `after_seq`.
    async fn list_since(&self, after_seq: i64) -> Result<Vec<FactRecord>, StoreError>;
}

#[async_trait]
impl<T: CheckpointStore + ?Sized> CheckpointStore for std::sync::Arc<T> {
    async fn load(&self) -> Result<Option<Cursor>, StoreError> {
        (**self).load().await
    }

    async fn save(&self, cursor: &Cursor) -> Result<(), StoreError> {
        (**self).save(cursor).await
    }
}

#[async_trait]
impl<T: FactLog + ?Sized> FactLog for std::sync::Arc<T> {
    async fn append(&self, block: u64, index: u32, facts: &[Fact]) -> Result<i64, StoreError> {
        (**self).append(block, index, facts).await
    }

    async fn list_since(&self, after_seq: i64) -> Result<Vec<FactRecord>, StoreError> {
        (**self).list_since(after_seq).await
    }
}
