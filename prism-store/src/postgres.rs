//! PostgreSQL store implementations (feature `postgres`).
//!
//! This module uses dynamic queries (sqlx::query) instead of
//! compile-time checked macros (sqlx::query!) to allow compilation
//! without DATABASE_URL.

use crate::error::StoreError;
use crate::repository::{CheckpointStore, Cursor, FactLog, FactRecord};
use async_trait::async_trait;
use prism_domain::Fact;
use sqlx::{PgPool, Row};

/// Create the checkpoint and fact-log tables if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_checkpoint (
            id TEXT PRIMARY KEY,
            block BIGINT NOT NULL,
            idx INTEGER NOT NULL,
            tx_hash TEXT NOT NULL,
            log_index INTEGER NOT NULL,
            digest TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fact_log (
            seq BIGSERIAL PRIMARY KEY,
            block BIGINT NOT NULL,
            idx INTEGER NOT NULL,
            payload JSONB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Single-row cursor persistence keyed by a deployment id, so several
/// independent mirrors can share one database.
pub struct PgCheckpointStore {
    pool: PgPool,
    key: String,
}

impl PgCheckpointStore {
    /// Create a checkpoint store for the given deployment key.
    pub fn new(pool: PgPool, key: impl Into<String>) -> Self {
        Self { pool, key: key.into() }
    }
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn load(&self) -> Result<Option<Cursor>, StoreError> {
        let row = sqlx::query(
            "SELECT block, idx, tx_hash, log_index, digest FROM sync_checkpoint WHERE id = $1",
        )
        .bind(&self.key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(Cursor {
                block: row.try_get::<i64, _>("block")? as u64,
                index: row.try_get::<i32, _>("idx")? as u32,
                tx_hash: row.try_get("tx_hash")?,
                log_index: row.try_get::<i32, _>("log_index")? as u32,
                digest: row.try_get("digest")?,
            })
        })
        .transpose()
        .map_err(|err: sqlx::Error| err.into())
    }

    async fn save(&self, cursor: &Cursor) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_checkpoint (id, block, idx, tx_hash, log_index, digest)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                block = EXCLUDED.block,
                idx = EXCLUDED.idx,
                tx_hash = EXCLUDED.tx_hash,
                log_index = EXCLUDED.log_index,
                digest = EXCLUDED.digest
            "#,
        )
        .bind(&self.key)
        .bind(cursor.block as i64)
        .bind(cursor.index as i32)
        .bind(&cursor.tx_hash)
        .bind(cursor.log_index as i32)
        .bind(&cursor.digest)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Append-only fact log over PostgreSQL.
pub struct PgFactLog {
    pool: PgPool,
}

impl PgFactLog {
    /// Create a fact log over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FactLog for PgFactLog {
    async fn append(&self, block: u64, index: u32, facts: &[Fact]) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut last_seq: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) FROM fact_log")
            .fetch_one(&mut *tx)
            .await?;

        for fact in facts {
            let payload = serde_json::to_value(fact)?;
            last_seq = sqlx::query_scalar(
                "INSERT INTO fact_log (block, idx, payload) VALUES ($1, $2, $3) RETURNING seq",
            )
            .bind(block as i64)
            .bind(index as i32)
            .bind(payload)
            .fetch_one(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(last_seq)
    }

    async fn list_since(&self, after_seq: i64) -> Result<Vec<FactRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT seq, block, idx, payload FROM fact_log WHERE seq > $1 ORDER BY seq",
        )
        .bind(after_seq)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let payload: serde_json::Value = row.try_get("payload")?;
                let fact: Fact = serde_json::from_value(payload)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
                Ok(FactRecord {
                    seq: row.try_get("seq")?,
                    block: row.try_get::<i64, _>("block")? as u64,
                    index: row.try_get::<i32, _>("idx")? as u32,
                    fact,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(Into::into)
    }
}
