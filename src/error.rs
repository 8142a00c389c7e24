//! Error types for mtg_collector

use std::fmt;

/// Unified error type for collector operations
#[derive(Debug)]
pub enum CollectorError {
    /// HTTP request failed (network error, timeout, etc.)
    Network(reqwest::Error),
    /// HTTP error status code
    HttpStatus(reqwest::StatusCode),
    /// The bulk snapshot document could not be parsed; fatal for the pass
    SnapshotDecode(serde_json::Error),
    /// A single card/edition record was malformed; logged and skipped
    RecordNormalization(String),
    /// A search filter value is structurally invalid
    FilterValidation(String),
    /// Database operation failed
    Database(rusqlite::Error),
    /// Bulk archive could not be read
    Archive(zip::result::ZipError),
    /// File I/O error
    Io(std::io::Error),
    /// Version identifier could not be parsed
    InvalidVersion(String),
    /// No local snapshot is available
    NoSnapshot,
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorError::Network(e) => write!(f, "Network error: {}", e),
            CollectorError::HttpStatus(status) => write!(f, "HTTP error: {}", status),
            CollectorError::SnapshotDecode(e) => write!(f, "Snapshot decode error: {}", e),
            CollectorError::RecordNormalization(msg) => {
                write!(f, "Malformed catalog record: {}", msg)
            }
            CollectorError::FilterValidation(msg) => {
                write!(f, "Invalid search filter: {}", msg)
            }
            CollectorError::Database(e) => write!(f, "Database error: {}", e),
            CollectorError::Archive(e) => write!(f, "Archive error: {}", e),
            CollectorError::Io(e) => write!(f, "I/O error: {}", e),
            CollectorError::InvalidVersion(v) => write!(f, "Invalid version string: {}", v),
            CollectorError::NoSnapshot => write!(f, "No downloaded snapshot was found"),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectorError::Network(e) => Some(e),
            CollectorError::SnapshotDecode(e) => Some(e),
            CollectorError::Database(e) => Some(e),
            CollectorError::Archive(e) => Some(e),
            CollectorError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        CollectorError::Network(err)
    }
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        CollectorError::SnapshotDecode(err)
    }
}

impl From<rusqlite::Error> for CollectorError {
    fn from(err: rusqlite::Error) -> Self {
        CollectorError::Database(err)
    }
}

impl From<zip::result::ZipError> for CollectorError {
    fn from(err: zip::result::ZipError) -> Self {
        CollectorError::Archive(err)
    }
}

impl From<std::io::Error> for CollectorError {
    fn from(err: std::io::Error) -> Self {
        CollectorError::Io(err)
    }
}

/// Legacy alias for the shorter name
pub type Error = CollectorError;

/// Result alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;
