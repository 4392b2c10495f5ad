//! Wire events exchanged with dashboard connections.
//!
//! Every frame is a JSON envelope `{"event": <name>, "data": <payload>}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::{classify_trust, RiskTier};
use crate::storage::types::{AlertEvent, ClientSession, EventType, Severity};

/// Bandwidth-conscious session view broadcast on every telemetry write.
/// The system snapshot is deliberately excluded; dashboards that need it
/// query the session endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProjection {
    pub session_id: String,
    pub participant_id: String,
    pub channel: String,
    pub last_update: DateTime<Utc>,
    pub trust_score: f64,
    pub risk_tier: RiskTier,
}

impl From<&ClientSession> for SessionProjection {
    fn from(session: &ClientSession) -> Self {
        Self {
            session_id: session.session_id.clone(),
            participant_id: session.participant_id.clone(),
            channel: session.channel.clone(),
            last_update: session.last_update,
            trust_score: session.trust_score,
            risk_tier: classify_trust(session.trust_score),
        }
    }
}

/// Alert view broadcast to a channel; the screenshot payload stays in the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertProjection {
    pub id: Uuid,
    pub session_id: String,
    pub participant_id: String,
    pub channel: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
    pub event_type: EventType,
}

impl From<&AlertEvent> for AlertProjection {
    fn from(alert: &AlertEvent) -> Self {
        Self {
            id: alert.id,
            session_id: alert.session_id.clone(),
            participant_id: alert.participant_id.clone(),
            channel: alert.channel.clone(),
            timestamp: alert.timestamp,
            message: alert.message.clone(),
            severity: alert.severity,
            event_type: alert.event_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertHandledNotice {
    pub alert_id: Uuid,
    pub handled_by: String,
    pub handled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRequest {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillProcessCommand {
    pub session_id: String,
    pub process_id: String,
}

/// Server -> client events, delivered only to connections subscribed to the
/// relevant channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ChannelEvent {
    SessionUpdated(SessionProjection),
    Alert(AlertProjection),
    AlertHandled(AlertHandledNotice),
    RequestScreenshot(ScreenshotRequest),
    KillProcess(KillProcessCommand),
}

impl ChannelEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::SessionUpdated(_) => "session-updated",
            ChannelEvent::Alert(_) => "alert",
            ChannelEvent::AlertHandled(_) => "alert-handled",
            ChannelEvent::RequestScreenshot(_) => "request-screenshot",
            ChannelEvent::KillProcess(_) => "kill-process",
        }
    }
}

/// Client -> server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Switch this connection's single channel subscription.
    JoinChannel(String),
}
