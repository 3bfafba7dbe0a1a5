//! Dexhub core: pure domain logic with zero I/O.
//!
//! Record types for the six competitive datasets, the payload
//! normalizer for Showdown-style `exports.X = {...}` script dumps,
//! and the transformers that turn raw payloads into typed records.

pub mod error;
pub mod names;
pub mod payload;
pub mod records;
pub mod transform;
pub mod types;
