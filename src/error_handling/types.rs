use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadBindAddress(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadBindAddress(e) => write!(f, "Bind address error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Durable-store failures. Deliberately coarse: callers only need to know
/// whether the write or the read side failed, details go to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    ConnectionFailed,
    WriteFailed,
    ReadFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed => write!(f, "Storage connection failed"),
            StorageError::WriteFailed => write!(f, "Storage write failed"),
            StorageError::ReadFailed => write!(f, "Storage read failed"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Errors surfaced by ingestion operations.
///
/// `Validation`, `NotFound` and `Conflict` are detected before any durable
/// mutation; `Storage` surfaces after a write attempt and leaves durable state
/// as it was before the failed write.
#[derive(Debug)]
pub enum IngestError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Storage(StorageError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Validation(e) => write!(f, "Validation error: {}", e),
            IngestError::NotFound(e) => write!(f, "Not found: {}", e),
            IngestError::Conflict(e) => write!(f, "Conflict: {}", e),
            IngestError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<StorageError> for IngestError {
    fn from(err: StorageError) -> Self {
        IngestError::Storage(err)
    }
}

/// A single broadcast recipient was unreachable. Logged by the registry and
/// never propagated: persistence is authoritative, fan-out is best-effort.
#[derive(Debug)]
pub struct DeliveryError {
    pub connection_id: uuid::Uuid,
    pub channel: String,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Delivery to connection {} on channel {} failed",
            self.connection_id, self.channel
        )
    }
}

impl std::error::Error for DeliveryError {}
