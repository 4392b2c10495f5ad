//! SeaORM entity models backing the SQLite store.
//!
//! Two tables:
//! - `sessions` — one row per monitored client session, keyed by session id
//! - `alerts` — append-only alert events, keyed by server-assigned UUID
//!
//! Timestamps are stored as RFC3339 strings and JSON payloads as text columns
//! for portability; conversion to domain types lives in the store modules.

/// Sessions table entity models.
pub mod sessions {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "sessions")]
    pub struct Model {
        /// Client-supplied unique session identifier
        #[sea_orm(primary_key, auto_increment = false)]
        pub session_id: String,
        /// Display identity of the monitored participant
        pub participant_id: String,
        /// Channel (lobby / match room) the session currently belongs to
        #[sea_orm(indexed)]
        pub channel: String,
        /// RFC3339 timestamp of the last telemetry write
        pub last_update: String,
        /// Trust score in [0, 100]
        pub trust_score: f64,
        /// Opaque JSON system snapshot, replaced wholesale on each update
        pub system_snapshot: Option<String>,
        /// JSON array of lightweight alert summaries, append-only
        pub alerts_summary: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Alerts table entity models.
pub mod alerts {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "alerts")]
    pub struct Model {
        /// Server-assigned UUID as string primary key
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        /// Session the alert was reported for
        #[sea_orm(indexed)]
        pub session_id: String,
        /// Denormalized from the session at creation time
        pub participant_id: String,
        /// Denormalized from the session at creation time
        #[sea_orm(indexed)]
        pub channel: String,
        /// RFC3339 server-assigned ingestion timestamp
        #[sea_orm(indexed)]
        pub timestamp: String,
        pub message: String,
        /// "info" | "warning" | "critical"
        #[sea_orm(indexed)]
        pub severity: String,
        /// "process" | "network" | "device" | "system" | "input" | "other"
        pub event_type: String,
        #[sea_orm(indexed)]
        pub handled: bool,
        pub handled_by: Option<String>,
        /// RFC3339 timestamp set when the alert is marked handled
        pub handled_at: Option<String>,
        /// Encoded screenshot payload, opaque
        pub screenshot: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
