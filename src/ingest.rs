//! Ingestion subsystem
//!
//! Validates incoming telemetry and alert payloads, writes through the
//! session/alert stores, classifies the result and hands it to the broadcast
//! router.
//!
//! Components:
//! - `ingest_service`: the IngestService and its request payload types.

pub mod ingest_service;
