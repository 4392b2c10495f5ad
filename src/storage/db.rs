//! SQLite connection and schema bootstrap.

use std::path::Path;

use log::error;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

use crate::error_handling::types::StorageError;
use crate::storage::entities::{alerts, sessions};

/// Open (creating if missing) the SQLite database at `path` and ensure the
/// schema exists. The returned connection is cheap to clone and shared by the
/// session and alert stores.
pub async fn connect<P: AsRef<Path>>(path: P) -> Result<DatabaseConnection, StorageError> {
    let url = format!("sqlite://{}?mode=rwc", path.as_ref().display());
    let db = Database::connect(&url).await.map_err(|e| {
        error!("failed to open database {}: {}", url, e);
        StorageError::ConnectionFailed
    })?;
    init_schema(&db).await?;
    Ok(db)
}

/// Create tables and secondary indexes if they do not exist yet, derived from
/// the entity models.
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), StorageError> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut create_sessions = schema.create_table_from_entity(sessions::Entity);
    create_sessions.if_not_exists();
    db.execute(backend.build(&create_sessions))
        .await
        .map_err(|e| {
            error!("failed to create sessions table: {}", e);
            StorageError::WriteFailed
        })?;

    let mut create_alerts = schema.create_table_from_entity(alerts::Entity);
    create_alerts.if_not_exists();
    db.execute(backend.build(&create_alerts))
        .await
        .map_err(|e| {
            error!("failed to create alerts table: {}", e);
            StorageError::WriteFailed
        })?;

    let mut indexes = schema.create_index_from_entity(sessions::Entity);
    indexes.extend(schema.create_index_from_entity(alerts::Entity));
    for mut stmt in indexes {
        stmt.if_not_exists();
        db.execute(backend.build(&stmt)).await.map_err(|e| {
            error!("failed to create index: {}", e);
            StorageError::WriteFailed
        })?;
    }

    Ok(())
}
