//! Prism Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains value objects, entities, emitted facts, and chain-event
//! payloads shared by the engine and the synchronizer.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod events;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{Order, OrderStatus, ProjectionRecord, Validity};
pub use events::{ChainEvent, Fact};
pub use value_objects::{
    Address, AssetKey, BasisPoints, DomainError, OrderId, Price, Quantity, UserTokenId,
};
