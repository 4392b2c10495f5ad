//! Configuration module root
//!
//! Components:
//! - `config`: runtime configuration loaded from a TOML file with defaults
//!   suitable for local development.

pub mod config;
