//! In-memory store implementations.
//!
//! Used for testing and single-process deployments without a database.
//! Thread-safe using RwLock for concurrent access.

use crate::error::StoreError;
use crate::repository::{CheckpointStore, Cursor, FactLog, FactRecord};
use async_trait::async_trait;
use prism_domain::Fact;
use std::sync::RwLock;

/// In-memory cursor store.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    cursor: RwLock<Option<Cursor>>,
}

impl MemoryCheckpointStore {
    /// Create an empty checkpoint store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Option<Cursor>, StoreError> {
        Ok(self.cursor.read().unwrap().clone())
    }

    async fn save(&self, cursor: &Cursor) -> Result<(), StoreError> {
        *self.cursor.write().unwrap() = Some(cursor.clone());
        Ok(())
    }
}

/// In-memory append-only fact log.
#[derive(Debug, Default)]
pub struct MemoryFactLog {
    records: RwLock<Vec<FactRecord>>,
}

impl MemoryFactLog {
    /// Create an empty fact log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended records (useful for test assertions).
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// True if nothing was appended yet.
    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }
}

#[async_trait]
impl FactLog for MemoryFactLog {
    async fn append(&self, block: u64, index: u32, facts: &[Fact]) -> Result<i64, StoreError> {
        let mut records = self.records.write().unwrap();
        let mut seq = records.last().map(|r| r.seq).unwrap_or(0);
        for fact in facts {
            seq += 1;
            records.push(FactRecord {
                seq,
                block,
                index,
                fact: fact.clone(),
            });
        }
        Ok(seq)
    }

    async fn list_since(&self, after_seq: i64) -> Result<Vec<FactRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.seq > after_seq)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_domain::OrderId;

    fn fact(n: u64) -> Fact {
        Fact::OrderCancelled { order_id: OrderId(n) }
    }

    #[tokio::test]
    async fn checkpoint_round_trip() {
        let store = MemoryCheckpointStore::new();
        assert!(store.load().await.unwrap().is_none());

        let cursor = Cursor {
            block: 10,
            index: 2,
            tx_hash: "0xabc".to_string(),
            log_index: 0,
            digest: "d1".to_string(),
        };
        store.save(&cursor).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(cursor));
    }

    #[tokio::test]
    async fn fact_log_assigns_contiguous_sequences() {
        let log = MemoryFactLog::new();
        assert_eq!(log.append(1, 0, &[fact(1), fact(2)]).await.unwrap(), 2);
        assert_eq!(log.append(1, 1, &[]).await.unwrap(), 2);
        assert_eq!(log.append(2, 0, &[fact(3)]).await.unwrap(), 3);

        let tail = log.list_since(1).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].seq, 2);
        assert_eq!(tail[1].block, 2);
    }
}
