//! Domain error types
//!
//! This module defines the error hierarchy for Hastats. Errors are domain-specific
//! and never expose third-party types in their variants; conversions from the
//! underlying crates flatten to strings at the boundary.

use thiserror::Error;

/// Main Hastats error type
///
/// This is the primary error type used throughout the application.
/// It wraps the source and destination error types and provides context for
/// error handling and exit-code mapping.
#[derive(Debug, Error)]
pub enum HastatsError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Home Assistant database errors
    #[error("Source database error: {0}")]
    Source(#[from] SourceError),

    /// InfluxDB errors
    #[error("InfluxDB error: {0}")]
    Influx(#[from] InfluxError),

    /// Export process errors
    #[error("Export error: {0}")]
    Export(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Checkpoint persistence errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The run was stopped by a shutdown signal
    #[error("Interrupted: {0}")]
    Interrupted(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl HastatsError {
    /// Whether retrying the failed operation could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            HastatsError::Connection(_) | HastatsError::Io(_) | HastatsError::Checkpoint(_) => {
                true
            }
            HastatsError::Source(err) => err.is_retryable(),
            HastatsError::Influx(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Errors raised while reading the Home Assistant recorder database.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The database file could not be opened
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    /// A required table is missing from the schema
    #[error("Required table '{0}' not found; is this a Home Assistant database?")]
    MissingTable(String),

    /// The database is locked by another writer
    #[error("Database busy: {0}")]
    Busy(String),

    /// A query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The blocking worker running the query died
    #[error("Database worker failed: {0}")]
    WorkerFailed(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Busy(_) | SourceError::WorkerFailed(_))
    }
}

/// InfluxDB-specific errors
///
/// Errors that occur when talking to the InfluxDB 2 HTTP API.
#[derive(Debug, Error)]
pub enum InfluxError {
    /// Failed to reach the server
    #[error("Failed to connect to InfluxDB: {0}")]
    ConnectionFailed(String),

    /// Token rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Bucket does not exist
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Organization does not exist
    #[error("Organization not found: {0}")]
    OrgNotFound(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded (429): {0}")]
    Throttled(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Response body could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl InfluxError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InfluxError::ConnectionFailed(_)
                | InfluxError::Throttled(_)
                | InfluxError::ServerError { .. }
                | InfluxError::Timeout(_)
        )
    }

    /// Maps a non-success HTTP status and body to an error variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => InfluxError::AuthenticationFailed(message),
            404 => InfluxError::BucketNotFound(message),
            429 => InfluxError::Throttled(message),
            500..=599 => InfluxError::ServerError { status, message },
            _ => InfluxError::ClientError { status, message },
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for HastatsError {
    fn from(err: std::io::Error) -> Self {
        HastatsError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for HastatsError {
    fn from(err: serde_json::Error) -> Self {
        HastatsError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for HastatsError {
    fn from(err: toml::de::Error) -> Self {
        HastatsError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<rusqlite::Error> for SourceError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                SourceError::Busy(err.to_string())
            }
            _ => SourceError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for HastatsError {
    fn from(err: rusqlite::Error) -> Self {
        HastatsError::Source(err.into())
    }
}

impl From<reqwest::Error> for InfluxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InfluxError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            InfluxError::from_status(status.as_u16(), err.to_string())
        } else {
            InfluxError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<reqwest::Error> for HastatsError {
    fn from(err: reqwest::Error) -> Self {
        HastatsError::Influx(err.into())
    }
}
