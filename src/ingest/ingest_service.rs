//! Ingestion service: validate, persist, classify, broadcast — in that order.
//! Persistence is authoritative; broadcast is best-effort and never rolls a
//! successful write back.

use std::sync::Arc;

use chrono::Utc;
use log::info;
use serde::Deserialize;
use uuid::Uuid;

use crate::classifier::{classify_event_type, classify_severity};
use crate::error_handling::types::IngestError;
use crate::realtime::events::{
    AlertHandledNotice, AlertProjection, ChannelEvent, KillProcessCommand, ScreenshotRequest,
    SessionProjection,
};
use crate::realtime::router::BroadcastRouter;
use crate::storage::alert_store::AlertStore;
use crate::storage::session_store::SessionStore;
use crate::storage::types::{
    AlertEvent, AlertPage, AlertSummary, ChannelStats, ClientSession, MarkHandledOutcome, Severity,
};

/// Telemetry payload submitted periodically by monitored clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReport {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub participant_id: String,
    #[serde(default)]
    pub channel: String,
    pub trust_score: Option<f64>,
    pub system_snapshot: Option<serde_json::Value>,
}

/// Alert payload submitted when a client detects an anomaly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertReport {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub participant_id: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub message: String,
    pub severity: Option<String>,
    pub event_type: Option<String>,
    pub screenshot: Option<String>,
}

/// Pagination and filtering for the alerts query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    #[serde(default = "AlertQuery::default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    pub severity: Option<String>,
}

impl AlertQuery {
    fn default_limit() -> u64 {
        50
    }
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self {
            limit: Self::default_limit(),
            offset: 0,
            severity: None,
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), IngestError> {
    if value.trim().is_empty() {
        return Err(IngestError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Removes screenshot payloads from a system snapshot, at any nesting depth.
fn strip_screenshots(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.remove("screenshot");
            for nested in map.values_mut() {
                strip_screenshots(nested);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                strip_screenshots(item);
            }
        }
        _ => {}
    }
}

/// Request handlers for the ingestion pipeline. Holds the stores and the
/// broadcast router; cheap to clone behind an `Arc` into warp filters.
pub struct IngestService {
    sessions: Arc<dyn SessionStore>,
    alerts: Arc<dyn AlertStore>,
    router: BroadcastRouter,
}

impl IngestService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        alerts: Arc<dyn AlertStore>,
        router: BroadcastRouter,
    ) -> Self {
        Self {
            sessions,
            alerts,
            router,
        }
    }

    /// Upserts the client session and broadcasts `session-updated` to its
    /// channel. The stored snapshot is replaced wholesale; the session's
    /// alert history is untouched.
    pub async fn submit_telemetry(
        &self,
        report: TelemetryReport,
    ) -> Result<ClientSession, IngestError> {
        require("sessionId", &report.session_id)?;
        require("participantId", &report.participant_id)?;
        require("channel", &report.channel)?;

        // The classifier never clamps, so the ingestion boundary keeps the
        // stored score inside the data-model range.
        let trust_score = report
            .trust_score
            .unwrap_or(ClientSession::DEFAULT_TRUST_SCORE)
            .clamp(0.0, 100.0);

        let session = ClientSession {
            session_id: report.session_id,
            participant_id: report.participant_id,
            channel: report.channel,
            last_update: Utc::now(),
            trust_score,
            system_snapshot: report.system_snapshot,
            alerts_summary: Vec::new(),
        };
        let stored = self.sessions.upsert(&session).await?;
        info!(
            "telemetry from {} (session {}, trust {})",
            stored.participant_id, stored.session_id, stored.trust_score
        );

        let projection = SessionProjection::from(&stored);
        self.router
            .publish(&stored.channel, &ChannelEvent::SessionUpdated(projection));
        Ok(stored)
    }

    /// Records an immutable alert event, appends its summary to the session
    /// (implicitly creating a minimal one) and broadcasts `alert`.
    pub async fn submit_alert(&self, report: AlertReport) -> Result<AlertEvent, IngestError> {
        require("sessionId", &report.session_id)?;
        require("participantId", &report.participant_id)?;
        require("channel", &report.channel)?;
        require("message", &report.message)?;

        let alert = AlertEvent {
            id: Uuid::new_v4(),
            session_id: report.session_id,
            participant_id: report.participant_id,
            channel: report.channel,
            timestamp: Utc::now(),
            message: report.message,
            severity: classify_severity(report.severity.as_deref()),
            event_type: classify_event_type(report.event_type.as_deref()),
            handled: false,
            handled_by: None,
            handled_at: None,
            screenshot: report.screenshot,
        };
        self.alerts.insert(&alert).await?;
        self.sessions
            .append_alert_summary(
                &alert.session_id,
                &alert.participant_id,
                &alert.channel,
                AlertSummary {
                    timestamp: alert.timestamp,
                    message: alert.message.clone(),
                    severity: alert.severity,
                },
            )
            .await?;
        info!(
            "alert from {}: {} ({})",
            alert.participant_id, alert.message, alert.severity
        );

        let projection = AlertProjection::from(&alert);
        self.router
            .publish(&alert.channel, &ChannelEvent::Alert(projection));
        Ok(alert)
    }

    /// One-way unhandled -> handled transition; re-handling an already
    /// handled alert is rejected with a conflict rather than silently
    /// accepted.
    pub async fn mark_alert_handled(
        &self,
        alert_id: Uuid,
        handled_by: &str,
    ) -> Result<AlertEvent, IngestError> {
        require("handledBy", handled_by)?;

        let outcome = self
            .alerts
            .mark_handled(alert_id, handled_by, Utc::now())
            .await?;
        let alert = match outcome {
            MarkHandledOutcome::Updated(alert) => alert,
            MarkHandledOutcome::AlreadyHandled => {
                return Err(IngestError::Conflict(format!(
                    "alert {} is already handled",
                    alert_id
                )))
            }
            MarkHandledOutcome::Missing => {
                return Err(IngestError::NotFound(format!("alert {} not found", alert_id)))
            }
        };
        info!("alert {} handled by {}", alert_id, handled_by);

        if let (Some(by), Some(at)) = (alert.handled_by.clone(), alert.handled_at) {
            self.router.publish(
                &alert.channel,
                &ChannelEvent::AlertHandled(AlertHandledNotice {
                    alert_id: alert.id,
                    handled_by: by,
                    handled_at: at,
                }),
            );
        }
        Ok(alert)
    }

    /// Publishes a screenshot request to the session's channel.
    pub async fn request_screenshot(&self, session_id: &str) -> Result<(), IngestError> {
        let session = self.session(session_id).await?;
        self.router.publish(
            &session.channel,
            &ChannelEvent::RequestScreenshot(ScreenshotRequest {
                session_id: session.session_id,
                timestamp: Utc::now(),
            }),
        );
        Ok(())
    }

    /// Publishes a kill-process command to the session's channel.
    pub async fn kill_process(
        &self,
        session_id: &str,
        process_id: &str,
    ) -> Result<(), IngestError> {
        require("processId", process_id)?;
        let session = self.session(session_id).await?;
        self.router.publish(
            &session.channel,
            &ChannelEvent::KillProcess(KillProcessCommand {
                session_id: session.session_id,
                process_id: process_id.to_string(),
            }),
        );
        Ok(())
    }

    /// Full session records for a channel, most recently updated first.
    /// Screenshot payloads embedded in the snapshot are stripped; they are
    /// served through the alert endpoints only.
    pub async fn sessions_by_channel(
        &self,
        channel: &str,
    ) -> Result<Vec<ClientSession>, IngestError> {
        let mut sessions = self.sessions.list_by_channel(channel).await?;
        for session in &mut sessions {
            if let Some(snapshot) = session.system_snapshot.as_mut() {
                strip_screenshots(snapshot);
            }
        }
        Ok(sessions)
    }

    /// Full session record by id.
    pub async fn session(&self, session_id: &str) -> Result<ClientSession, IngestError> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| IngestError::NotFound(format!("session {} not found", session_id)))
    }

    /// One page of a channel's alerts, newest first.
    pub async fn alerts(&self, channel: &str, query: AlertQuery) -> Result<AlertPage, IngestError> {
        let severity = match query.severity.as_deref() {
            None => None,
            Some(raw) => Some(raw.parse::<Severity>().map_err(|_| {
                IngestError::Validation(format!("unrecognized severity filter: {}", raw))
            })?),
        };
        let (alerts, total) = self
            .alerts
            .list_by_channel(channel, severity, query.limit, query.offset)
            .await?;
        Ok(AlertPage {
            alerts,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    /// Aggregate per-channel stats. An empty channel reports the default
    /// trust score rather than an average over nothing.
    pub async fn channel_stats(&self, channel: &str) -> Result<ChannelStats, IngestError> {
        let sessions = self.sessions.list_by_channel(channel).await?;
        let avg_trust_score = if sessions.is_empty() {
            ClientSession::DEFAULT_TRUST_SCORE
        } else {
            sessions.iter().map(|s| s.trust_score).sum::<f64>() / sessions.len() as f64
        };
        let alert_counts = self.alerts.severity_counts(channel).await?;
        Ok(ChannelStats {
            session_count: sessions.len() as u64,
            alert_counts,
            avg_trust_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::registry::ChannelRegistry;
    use crate::storage::alert_store::DbAlertStore;
    use crate::storage::db;
    use crate::storage::session_store::DbSessionStore;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        _dir: TempDir,
        registry: Arc<ChannelRegistry>,
        service: IngestService,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let conn = db::connect(dir.path().join("test.sqlite3")).await.unwrap();
        let registry = Arc::new(ChannelRegistry::new());
        let service = IngestService::new(
            Arc::new(DbSessionStore::new(conn.clone())),
            Arc::new(DbAlertStore::new(conn)),
            BroadcastRouter::new(registry.clone()),
        );
        Fixture {
            _dir: dir,
            registry,
            service,
        }
    }

    fn subscribe(fixture: &Fixture, channel: &str) -> UnboundedReceiver<String> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let id = fixture.registry.connect(tx);
        fixture.registry.join(id, channel);
        rx
    }

    fn telemetry(session_id: &str, channel: &str, trust: f64) -> TelemetryReport {
        TelemetryReport {
            session_id: session_id.into(),
            participant_id: "p1".into(),
            channel: channel.into(),
            trust_score: Some(trust),
            system_snapshot: Some(serde_json::json!({"os": "windows"})),
        }
    }

    fn next_event(rx: &mut UnboundedReceiver<String>) -> serde_json::Value {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn telemetry_roundtrip_matches_submitted_values() {
        let f = fixture().await;
        f.service
            .submit_telemetry(telemetry("s1", "ch1", 65.0))
            .await
            .unwrap();
        let session = f.service.session("s1").await.unwrap();
        assert_eq!(session.trust_score, 65.0);
        assert_eq!(session.channel, "ch1");
        assert!(session.system_snapshot.is_some());
    }

    #[tokio::test]
    async fn telemetry_missing_required_field_is_rejected_before_write() {
        let f = fixture().await;
        let mut report = telemetry("s1", "ch1", 50.0);
        report.participant_id = String::new();
        let err = f.service.submit_telemetry(report).await.unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
        // no partial effects
        assert!(matches!(
            f.service.session("s1").await.unwrap_err(),
            IngestError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn telemetry_defaults_and_clamps_trust_score() {
        let f = fixture().await;
        let mut report = telemetry("s1", "ch1", 0.0);
        report.trust_score = None;
        let stored = f.service.submit_telemetry(report).await.unwrap();
        assert_eq!(stored.trust_score, ClientSession::DEFAULT_TRUST_SCORE);

        let stored = f
            .service
            .submit_telemetry(telemetry("s1", "ch1", 250.0))
            .await
            .unwrap();
        assert_eq!(stored.trust_score, 100.0);
    }

    #[tokio::test]
    async fn alert_defaults_to_warning_severity() {
        let f = fixture().await;
        let alert = f
            .service
            .submit_alert(AlertReport {
                session_id: "s1".into(),
                participant_id: "p1".into(),
                channel: "ch1".into(),
                message: "something odd".into(),
                severity: None,
                event_type: Some("teleportation".into()),
                screenshot: None,
            })
            .await
            .unwrap();
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.event_type, crate::storage::types::EventType::Other);
    }

    #[tokio::test]
    async fn empty_alert_message_is_rejected() {
        let f = fixture().await;
        let err = f
            .service
            .submit_alert(AlertReport {
                session_id: "s1".into(),
                participant_id: "p1".into(),
                channel: "ch1".into(),
                message: "  ".into(),
                severity: None,
                event_type: None,
                screenshot: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[tokio::test]
    async fn double_handling_is_a_conflict() {
        let f = fixture().await;
        let alert = f
            .service
            .submit_alert(AlertReport {
                session_id: "s1".into(),
                participant_id: "p1".into(),
                channel: "ch1".into(),
                message: "m".into(),
                severity: None,
                event_type: None,
                screenshot: None,
            })
            .await
            .unwrap();

        let handled = f
            .service
            .mark_alert_handled(alert.id, "operator1")
            .await
            .unwrap();
        assert_eq!(handled.handled_by.as_deref(), Some("operator1"));

        let err = f
            .service
            .mark_alert_handled(alert.id, "operator2")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Conflict(_)));

        let err = f
            .service
            .mark_alert_handled(Uuid::new_v4(), "operator1")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[tokio::test]
    async fn broadcast_scenario_end_to_end() {
        let f = fixture().await;
        let mut rx = subscribe(&f, "ch1");
        let mut other = subscribe(&f, "ch2");

        f.service
            .submit_telemetry(telemetry("s1", "ch1", 65.0))
            .await
            .unwrap();
        let event = next_event(&mut rx);
        assert_eq!(event["event"], "session-updated");
        assert_eq!(event["data"]["trustScore"], 65.0);
        assert_eq!(event["data"]["riskTier"], "suspicious");

        let alert = f
            .service
            .submit_alert(AlertReport {
                session_id: "s1".into(),
                participant_id: "p1".into(),
                channel: "ch1".into(),
                message: "speed hack detected".into(),
                severity: Some("critical".into()),
                event_type: Some("process".into()),
                screenshot: None,
            })
            .await
            .unwrap();
        let event = next_event(&mut rx);
        assert_eq!(event["event"], "alert");
        assert_eq!(event["data"]["severity"], "critical");
        assert_eq!(event["data"]["message"], "speed hack detected");

        // persisted and queryable with handled:false
        let page = f
            .service
            .alerts("ch1", AlertQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.alerts[0].id, alert.id);
        assert!(!page.alerts[0].handled);

        // the session picked up the summary
        let session = f.service.session("s1").await.unwrap();
        assert_eq!(session.alerts_summary.len(), 1);

        // nothing leaked into the other channel
        assert!(other.try_recv().is_err());

        f.service
            .mark_alert_handled(alert.id, "operator1")
            .await
            .unwrap();
        let event = next_event(&mut rx);
        assert_eq!(event["event"], "alert-handled");
        assert_eq!(event["data"]["handledBy"], "operator1");
    }

    #[tokio::test]
    async fn alert_for_unknown_session_creates_minimal_record() {
        let f = fixture().await;
        f.service
            .submit_alert(AlertReport {
                session_id: "ghost".into(),
                participant_id: "p9".into(),
                channel: "ch1".into(),
                message: "m".into(),
                severity: None,
                event_type: None,
                screenshot: None,
            })
            .await
            .unwrap();
        let session = f.service.session("ghost").await.unwrap();
        assert_eq!(session.participant_id, "p9");
        assert_eq!(session.alerts_summary.len(), 1);
    }

    #[tokio::test]
    async fn channel_listing_keeps_summaries_but_strips_screenshots() {
        let f = fixture().await;
        let mut report = telemetry("s1", "ch1", 65.0);
        report.system_snapshot = Some(serde_json::json!({
            "os": "windows",
            "screenshot": "aGVsbG8=",
            "displays": {"primary": {"screenshot": "d29ybGQ=", "width": 1920}},
        }));
        f.service.submit_telemetry(report).await.unwrap();
        f.service
            .submit_alert(AlertReport {
                session_id: "s1".into(),
                participant_id: "p1".into(),
                channel: "ch1".into(),
                message: "overlay process found".into(),
                severity: Some("critical".into()),
                event_type: None,
                screenshot: None,
            })
            .await
            .unwrap();

        let sessions = f.service.sessions_by_channel("ch1").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].alerts_summary.len(), 1);
        assert_eq!(sessions[0].alerts_summary[0].message, "overlay process found");
        let snapshot = sessions[0].system_snapshot.as_ref().unwrap();
        assert_eq!(snapshot["os"], "windows");
        assert_eq!(snapshot["displays"]["primary"]["width"], 1920);
        assert!(snapshot.get("screenshot").is_none());
        assert!(snapshot["displays"]["primary"].get("screenshot").is_none());
    }

    #[tokio::test]
    async fn unrecognized_severity_filter_is_rejected() {
        let f = fixture().await;
        let err = f
            .service
            .alerts(
                "ch1",
                AlertQuery {
                    severity: Some("fatal".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[tokio::test]
    async fn stats_aggregate_per_channel() {
        let f = fixture().await;
        f.service
            .submit_telemetry(telemetry("s1", "ch1", 80.0))
            .await
            .unwrap();
        f.service
            .submit_telemetry(telemetry("s2", "ch1", 40.0))
            .await
            .unwrap();
        f.service
            .submit_telemetry(telemetry("s3", "ch2", 10.0))
            .await
            .unwrap();
        f.service
            .submit_alert(AlertReport {
                session_id: "s1".into(),
                participant_id: "p1".into(),
                channel: "ch1".into(),
                message: "m".into(),
                severity: Some("critical".into()),
                event_type: None,
                screenshot: None,
            })
            .await
            .unwrap();

        let stats = f.service.channel_stats("ch1").await.unwrap();
        assert_eq!(stats.session_count, 2);
        assert_eq!(stats.avg_trust_score, 60.0);
        assert_eq!(stats.alert_counts.critical, 1);
        assert_eq!(stats.alert_counts.info, 0);

        let empty = f.service.channel_stats("empty").await.unwrap();
        assert_eq!(empty.session_count, 0);
        assert_eq!(empty.avg_trust_score, ClientSession::DEFAULT_TRUST_SCORE);
    }

    #[tokio::test]
    async fn command_endpoints_publish_to_session_channel() {
        let f = fixture().await;
        f.service
            .submit_telemetry(telemetry("s1", "ch1", 50.0))
            .await
            .unwrap();
        let mut rx = subscribe(&f, "ch1");

        f.service.request_screenshot("s1").await.unwrap();
        let event = next_event(&mut rx);
        assert_eq!(event["event"], "request-screenshot");
        assert_eq!(event["data"]["sessionId"], "s1");

        f.service.kill_process("s1", "4242").await.unwrap();
        let event = next_event(&mut rx);
        assert_eq!(event["event"], "kill-process");
        assert_eq!(event["data"]["processId"], "4242");

        assert!(matches!(
            f.service.request_screenshot("nope").await.unwrap_err(),
            IngestError::NotFound(_)
        ));
    }
}
