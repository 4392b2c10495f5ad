//! Storage subsystem
//!
//! Durable state for monitored client sessions and alert events, backed by
//! SQLite through SeaORM.
//!
//! Components:
//! - `types`: domain types shared across the crate.
//! - `entities`: SeaORM entity models for the `sessions` and `alerts` tables.
//! - `db`: connection and schema bootstrap helpers.
//! - `session_store`: the SessionStore trait and its SQLite implementation.
//! - `alert_store`: the AlertStore trait and its SQLite implementation.

pub mod alert_store;
pub mod db;
pub mod entities;
pub mod session_store;
pub mod types;
