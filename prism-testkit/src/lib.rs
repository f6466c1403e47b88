//! Test helpers for Prism engine and synchronizer tests.
//!
//! Provides address and engine builders plus scripted event streams
//! with auto-advancing chain positions.

mod helpers;

pub use helpers::{
    addr, asset, claim_payload, shared_engine, test_engine, EventScript, ScriptedSource,
};
