//! Real-time broadcast subsystem
//!
//! Channel-scoped fan-out of server events to live dashboard connections.
//!
//! Components:
//! - `events`: typed wire events and the client -> server message envelope.
//! - `registry`: channel membership tracking (at most one channel per
//!   connection) and best-effort frame delivery.
//! - `router`: serializes typed events once and publishes them through the
//!   registry.

pub mod events;
pub mod registry;
pub mod router;
