//! # Prism Store
//!
//! Durability ports for the chain mirror: the synchronizer's resume
//! cursor and the append-only fact log exposed to indexers.
//!
//! Ships an in-memory implementation by default; enable the `postgres`
//! feature for SQLx-backed persistence.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod repository;

pub use error::StoreError;
pub use memory::{MemoryCheckpointStore, MemoryFactLog};
#[cfg(feature = "postgres")]
pub use postgres::{ensure_schema, PgCheckpointStore, PgFactLog};
pub use repository::{CheckpointStore, Cursor, FactLog, FactRecord};
