use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Severity of an alert or activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of the condition that raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Process,
    Network,
    Device,
    System,
    Input,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Process => "process",
            EventType::Network => "network",
            EventType::Device => "device",
            EventType::System => "system",
            EventType::Input => "input",
            EventType::Other => "other",
        }
    }
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(EventType::Process),
            "network" => Ok(EventType::Network),
            "device" => Ok(EventType::Device),
            "system" => Ok(EventType::System),
            "input" => Ok(EventType::Input),
            "other" => Ok(EventType::Other),
            _ => Err(()),
        }
    }
}

/// Lightweight alert reference kept on the session record itself.
/// Append-only: entries are never rewritten once pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

/// One monitored client session, keyed by `session_id`.
///
/// Upsert-by-key semantics: a telemetry write replaces the mutable fields
/// wholesale (`system_snapshot` included, it is never merged field-by-field)
/// while `alerts_summary` only ever grows. Sessions are never deleted by this
/// core; retention is an external concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSession {
    pub session_id: String,
    pub participant_id: String,
    pub channel: String,
    pub last_update: DateTime<Utc>,
    pub trust_score: f64,
    pub system_snapshot: Option<serde_json::Value>,
    pub alerts_summary: Vec<AlertSummary>,
}

impl ClientSession {
    /// Default trust score for sessions created without an explicit value.
    pub const DEFAULT_TRUST_SCORE: f64 = 10.0;
}

/// One reported anomaly, immutable once persisted except for the one-way
/// unhandled -> handled transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub id: Uuid,
    pub session_id: String,
    pub participant_id: String,
    pub channel: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
    pub event_type: EventType,
    pub handled: bool,
    pub handled_by: Option<String>,
    pub handled_at: Option<DateTime<Utc>>,
    /// Encoded screenshot payload, opaque to this core. Excluded from
    /// broadcast projections.
    pub screenshot: Option<String>,
}

/// Outcome of a guarded mark-handled update.
#[derive(Debug)]
pub enum MarkHandledOutcome {
    Updated(AlertEvent),
    AlreadyHandled,
    Missing,
}

/// Per-severity alert counts for a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub info: u64,
    pub warning: u64,
    pub critical: u64,
}

/// Aggregate view of a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub session_count: u64,
    pub alert_counts: SeverityCounts,
    pub avg_trust_score: f64,
}

/// One page of alerts for a channel, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPage {
    pub alerts: Vec<AlertEvent>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}
