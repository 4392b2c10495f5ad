//! Session store: durable keyed storage for monitored client sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::error;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::error_handling::types::StorageError;
use crate::storage::entities::sessions;
use crate::storage::types::{AlertSummary, ClientSession};

/// Read/write contract for the session store.
///
/// Upsert-by-key semantics per session id: create-if-absent, else full replace
/// of the mutable fields. Concurrent writers for the same session id resolve
/// last-write-wins at the row level; no version token is maintained.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Upserts the session and returns the stored record (including the
    /// preserved `alerts_summary` when the row already existed).
    async fn upsert(&self, session: &ClientSession) -> Result<ClientSession, StorageError>;

    /// Fetches a single session by id.
    async fn get(&self, session_id: &str) -> Result<Option<ClientSession>, StorageError>;

    /// Fetches all sessions in a channel, most recently updated first.
    async fn list_by_channel(&self, channel: &str) -> Result<Vec<ClientSession>, StorageError>;

    /// Appends a lightweight alert summary to the session. When no session
    /// exists for `session_id` a minimal one is created so the summary is not
    /// lost.
    async fn append_alert_summary(
        &self,
        session_id: &str,
        participant_id: &str,
        channel: &str,
        summary: AlertSummary,
    ) -> Result<(), StorageError>;

    /// Number of sessions currently recorded for a channel.
    async fn count_by_channel(&self, channel: &str) -> Result<u64, StorageError>;
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| StorageError::ReadFailed)
}

fn into_session(model: sessions::Model) -> Result<ClientSession, StorageError> {
    let system_snapshot = match model.system_snapshot {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|_| StorageError::ReadFailed)?),
        None => None,
    };
    let alerts_summary: Vec<AlertSummary> =
        serde_json::from_str(&model.alerts_summary).map_err(|_| StorageError::ReadFailed)?;
    Ok(ClientSession {
        session_id: model.session_id,
        participant_id: model.participant_id,
        channel: model.channel,
        last_update: parse_timestamp(&model.last_update)?,
        trust_score: model.trust_score,
        system_snapshot,
        alerts_summary,
    })
}

fn into_active_model(session: &ClientSession) -> Result<sessions::ActiveModel, StorageError> {
    let system_snapshot = match &session.system_snapshot {
        Some(v) => Some(serde_json::to_string(v).map_err(|_| StorageError::WriteFailed)?),
        None => None,
    };
    let alerts_summary =
        serde_json::to_string(&session.alerts_summary).map_err(|_| StorageError::WriteFailed)?;
    Ok(sessions::ActiveModel {
        session_id: Set(session.session_id.clone()),
        participant_id: Set(session.participant_id.clone()),
        channel: Set(session.channel.clone()),
        last_update: Set(session.last_update.to_rfc3339()),
        trust_score: Set(session.trust_score),
        system_snapshot: Set(system_snapshot),
        alerts_summary: Set(alerts_summary),
    })
}

/// SQLite-backed session store.
pub struct DbSessionStore {
    db: DatabaseConnection,
}

impl DbSessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DbSessionStore {
    async fn upsert(&self, session: &ClientSession) -> Result<ClientSession, StorageError> {
        let active = into_active_model(session)?;
        // On conflict the summary column is left alone: telemetry replaces the
        // mutable fields wholesale but never rewrites alert history.
        sessions::Entity::insert(active)
            .on_conflict(
                OnConflict::column(sessions::Column::SessionId)
                    .update_columns([
                        sessions::Column::ParticipantId,
                        sessions::Column::Channel,
                        sessions::Column::LastUpdate,
                        sessions::Column::TrustScore,
                        sessions::Column::SystemSnapshot,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|e| {
                error!("session upsert failed for {}: {}", session.session_id, e);
                StorageError::WriteFailed
            })?;

        match self.get(&session.session_id).await? {
            Some(stored) => Ok(stored),
            None => Err(StorageError::ReadFailed),
        }
    }

    async fn get(&self, session_id: &str) -> Result<Option<ClientSession>, StorageError> {
        let model = sessions::Entity::find_by_id(session_id.to_string())
            .one(&self.db)
            .await
            .map_err(|_| StorageError::ReadFailed)?;
        model.map(into_session).transpose()
    }

    async fn list_by_channel(&self, channel: &str) -> Result<Vec<ClientSession>, StorageError> {
        let models = sessions::Entity::find()
            .filter(sessions::Column::Channel.eq(channel))
            .order_by_desc(sessions::Column::LastUpdate)
            .all(&self.db)
            .await
            .map_err(|_| StorageError::ReadFailed)?;
        models.into_iter().map(into_session).collect()
    }

    async fn append_alert_summary(
        &self,
        session_id: &str,
        participant_id: &str,
        channel: &str,
        summary: AlertSummary,
    ) -> Result<(), StorageError> {
        // Alert for a session we have never seen: create it minimally so the
        // summary has somewhere to live. Existing rows are left untouched.
        let minimal = ClientSession {
            session_id: session_id.to_string(),
            participant_id: participant_id.to_string(),
            channel: channel.to_string(),
            last_update: summary.timestamp,
            trust_score: ClientSession::DEFAULT_TRUST_SCORE,
            system_snapshot: None,
            alerts_summary: Vec::new(),
        };
        let active = into_active_model(&minimal)?;
        sessions::Entity::insert(active)
            .on_conflict(
                OnConflict::column(sessions::Column::SessionId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|_| StorageError::WriteFailed)?;

        // The append itself happens inside SQLite so concurrent alerts for the
        // same session never clobber each other's summaries.
        let json = serde_json::to_string(&summary).map_err(|_| StorageError::WriteFailed)?;
        let result = sessions::Entity::update_many()
            .col_expr(
                sessions::Column::AlertsSummary,
                Expr::cust_with_values("json_insert(alerts_summary, '$[#]', json(?))", [json]),
            )
            .filter(sessions::Column::SessionId.eq(session_id))
            .exec(&self.db)
            .await
            .map_err(|_| StorageError::WriteFailed)?;
        if result.rows_affected == 0 {
            return Err(StorageError::WriteFailed);
        }
        Ok(())
    }

    async fn count_by_channel(&self, channel: &str) -> Result<u64, StorageError> {
        use sea_orm::PaginatorTrait;
        sessions::Entity::find()
            .filter(sessions::Column::Channel.eq(channel))
            .count(&self.db)
            .await
            .map_err(|_| StorageError::ReadFailed)
    }
}
