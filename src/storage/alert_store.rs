//! Alert store: durable append-only storage of alert events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::error;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::storage::entities::alerts;
use crate::storage::types::{AlertEvent, EventType, MarkHandledOutcome, Severity, SeverityCounts};

/// Read/write contract for the alert store.
///
/// Alerts are immutable once inserted except for the one-way
/// unhandled -> handled transition, which is enforced with a guarded update so
/// that concurrent handlers cannot both win.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert(&self, alert: &AlertEvent) -> Result<(), StorageError>;

    async fn get(&self, alert_id: Uuid) -> Result<Option<AlertEvent>, StorageError>;

    /// One page of a channel's alerts, newest first, with the total count for
    /// the same filter.
    async fn list_by_channel(
        &self,
        channel: &str,
        severity: Option<Severity>,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<AlertEvent>, u64), StorageError>;

    /// Attempts the unhandled -> handled transition.
    async fn mark_handled(
        &self,
        alert_id: Uuid,
        handled_by: &str,
        handled_at: DateTime<Utc>,
    ) -> Result<MarkHandledOutcome, StorageError>;

    async fn severity_counts(&self, channel: &str) -> Result<SeverityCounts, StorageError>;
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| StorageError::ReadFailed)
}

fn into_alert(model: alerts::Model) -> Result<AlertEvent, StorageError> {
    Ok(AlertEvent {
        id: Uuid::parse_str(&model.id).map_err(|_| StorageError::ReadFailed)?,
        session_id: model.session_id,
        participant_id: model.participant_id,
        channel: model.channel,
        timestamp: parse_timestamp(&model.timestamp)?,
        message: model.message,
        severity: model
            .severity
            .parse::<Severity>()
            .map_err(|_| StorageError::ReadFailed)?,
        event_type: model
            .event_type
            .parse::<EventType>()
            .map_err(|_| StorageError::ReadFailed)?,
        handled: model.handled,
        handled_by: model.handled_by,
        handled_at: model.handled_at.as_deref().map(parse_timestamp).transpose()?,
        screenshot: model.screenshot,
    })
}

/// SQLite-backed alert store.
pub struct DbAlertStore {
    db: DatabaseConnection,
}

impl DbAlertStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn channel_filter(
        channel: &str,
        severity: Option<Severity>,
    ) -> sea_orm::Select<alerts::Entity> {
        let mut query = alerts::Entity::find().filter(alerts::Column::Channel.eq(channel));
        if let Some(severity) = severity {
            query = query.filter(alerts::Column::Severity.eq(severity.as_str()));
        }
        query
    }
}

#[async_trait]
impl AlertStore for DbAlertStore {
    async fn insert(&self, alert: &AlertEvent) -> Result<(), StorageError> {
        let active = alerts::ActiveModel {
            id: Set(alert.id.to_string()),
            session_id: Set(alert.session_id.clone()),
            participant_id: Set(alert.participant_id.clone()),
            channel: Set(alert.channel.clone()),
            timestamp: Set(alert.timestamp.to_rfc3339()),
            message: Set(alert.message.clone()),
            severity: Set(alert.severity.as_str().to_string()),
            event_type: Set(alert.event_type.as_str().to_string()),
            handled: Set(alert.handled),
            handled_by: Set(alert.handled_by.clone()),
            handled_at: Set(alert.handled_at.map(|d| d.to_rfc3339())),
            screenshot: Set(alert.screenshot.clone()),
        };
        alerts::Entity::insert(active)
            .exec(&self.db)
            .await
            .map_err(|e| {
                error!("alert insert failed for session {}: {}", alert.session_id, e);
                StorageError::WriteFailed
            })?;
        Ok(())
    }

    async fn get(&self, alert_id: Uuid) -> Result<Option<AlertEvent>, StorageError> {
        let model = alerts::Entity::find_by_id(alert_id.to_string())
            .one(&self.db)
            .await
            .map_err(|_| StorageError::ReadFailed)?;
        model.map(into_alert).transpose()
    }

    async fn list_by_channel(
        &self,
        channel: &str,
        severity: Option<Severity>,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<AlertEvent>, u64), StorageError> {
        let total = Self::channel_filter(channel, severity)
            .count(&self.db)
            .await
            .map_err(|_| StorageError::ReadFailed)?;
        let models = Self::channel_filter(channel, severity)
            .order_by_desc(alerts::Column::Timestamp)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|_| StorageError::ReadFailed)?;
        let alerts = models
            .into_iter()
            .map(into_alert)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((alerts, total))
    }

    async fn mark_handled(
        &self,
        alert_id: Uuid,
        handled_by: &str,
        handled_at: DateTime<Utc>,
    ) -> Result<MarkHandledOutcome, StorageError> {
        // Guarded update: only an unhandled row can transition, so a second
        // concurrent handler affects zero rows instead of overwriting.
        let result = alerts::Entity::update_many()
            .col_expr(alerts::Column::Handled, Expr::value(true))
            .col_expr(alerts::Column::HandledBy, Expr::value(handled_by))
            .col_expr(alerts::Column::HandledAt, Expr::value(handled_at.to_rfc3339()))
            .filter(alerts::Column::Id.eq(alert_id.to_string()))
            .filter(alerts::Column::Handled.eq(false))
            .exec(&self.db)
            .await
            .map_err(|_| StorageError::WriteFailed)?;

        if result.rows_affected == 0 {
            return match self.get(alert_id).await? {
                Some(_) => Ok(MarkHandledOutcome::AlreadyHandled),
                None => Ok(MarkHandledOutcome::Missing),
            };
        }
        match self.get(alert_id).await? {
            Some(alert) => Ok(MarkHandledOutcome::Updated(alert)),
            None => Err(StorageError::ReadFailed),
        }
    }

    async fn severity_counts(&self, channel: &str) -> Result<SeverityCounts, StorageError> {
        let mut counts = SeverityCounts::default();
        for severity in [Severity::Info, Severity::Warning, Severity::Critical] {
            let count = Self::channel_filter(channel, Some(severity))
                .count(&self.db)
                .await
                .map_err(|_| StorageError::ReadFailed)?;
            match severity {
                Severity::Info => counts.info = count,
                Severity::Warning => counts.warning = count,
                Severity::Critical => counts.critical = count,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db;
    use tempfile::TempDir;

    async fn temp_store() -> (TempDir, DbAlertStore) {
        let dir = TempDir::new().unwrap();
        let conn = db::connect(dir.path().join("test.sqlite3")).await.unwrap();
        (dir, DbAlertStore::new(conn))
    }

    fn alert(channel: &str, severity: Severity, message: &str) -> AlertEvent {
        AlertEvent {
            id: Uuid::new_v4(),
            session_id: "s1".into(),
            participant_id: "p1".into(),
            channel: channel.into(),
            timestamp: Utc::now(),
            message: message.into(),
            severity,
            event_type: EventType::Other,
            handled: false,
            handled_by: None,
            handled_at: None,
            screenshot: None,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_roundtrip() {
        let (_dir, store) = temp_store().await;
        let a = alert("ch1", Severity::Critical, "speed hack detected");
        store.insert(&a).await.unwrap();
        let fetched = store.get(a.id).await.unwrap().unwrap();
        assert_eq!(fetched.message, "speed hack detected");
        assert_eq!(fetched.severity, Severity::Critical);
        assert!(!fetched.handled);
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let (_dir, store) = temp_store().await;
        for i in 0..5 {
            let mut a = alert("ch1", Severity::Warning, &format!("w{}", i));
            a.timestamp = Utc::now() + chrono::Duration::seconds(i);
            store.insert(&a).await.unwrap();
        }
        store
            .insert(&alert("ch1", Severity::Critical, "c"))
            .await
            .unwrap();
        store
            .insert(&alert("ch2", Severity::Warning, "elsewhere"))
            .await
            .unwrap();

        let (page, total) = store
            .list_by_channel("ch1", Some(Severity::Warning), 2, 1)
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        // newest first, offset skips the newest
        assert_eq!(page[0].message, "w3");
        assert_eq!(page[1].message, "w2");

        let (_, all) = store.list_by_channel("ch1", None, 50, 0).await.unwrap();
        assert_eq!(all, 6);
    }

    #[tokio::test]
    async fn mark_handled_is_one_way() {
        let (_dir, store) = temp_store().await;
        let a = alert("ch1", Severity::Warning, "m");
        store.insert(&a).await.unwrap();

        let first = store.mark_handled(a.id, "operator1", Utc::now()).await.unwrap();
        let updated = match first {
            MarkHandledOutcome::Updated(alert) => alert,
            other => panic!("expected Updated, got {:?}", other),
        };
        assert!(updated.handled);
        assert_eq!(updated.handled_by.as_deref(), Some("operator1"));

        let second = store.mark_handled(a.id, "operator2", Utc::now()).await.unwrap();
        assert!(matches!(second, MarkHandledOutcome::AlreadyHandled));
        // first-set values survive the rejected re-handle
        let fetched = store.get(a.id).await.unwrap().unwrap();
        assert_eq!(fetched.handled_by.as_deref(), Some("operator1"));
        assert_eq!(fetched.handled_at, updated.handled_at);

        let missing = store
            .mark_handled(Uuid::new_v4(), "operator1", Utc::now())
            .await
            .unwrap();
        assert!(matches!(missing, MarkHandledOutcome::Missing));
    }

    #[tokio::test]
    async fn severity_counts_by_channel() {
        let (_dir, store) = temp_store().await;
        store.insert(&alert("ch1", Severity::Info, "i")).await.unwrap();
        store.insert(&alert("ch1", Severity::Warning, "w1")).await.unwrap();
        store.insert(&alert("ch1", Severity::Warning, "w2")).await.unwrap();
        store.insert(&alert("ch2", Severity::Critical, "c")).await.unwrap();

        let counts = store.severity_counts("ch1").await.unwrap();
        assert_eq!(counts, SeverityCounts { info: 1, warning: 2, critical: 0 });
    }
}
