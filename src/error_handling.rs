//! Error taxonomy
//!
//! Components:
//! - `types`: error enums shared across the crate (configuration, storage,
//!   ingestion, broadcast delivery).

pub mod types;
