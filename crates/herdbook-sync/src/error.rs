//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Remote              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  RemoteRejected         │ │
//! │  │  MissingFarmId  │  │  Timeout        │  │  Unauthorized           │ │
//! │  │  InvalidUrl     │  │  Offline        │  │  InvalidResponse        │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                             │
//! │  │    Database     │  │      Push       │                             │
//! │  │                 │  │                 │                             │
//! │  │  Database(Db..) │  │  PushFailed     │                             │
//! │  │                 │  │  Serialization  │                             │
//! │  └─────────────────┘  └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use herdbook_core::EntityKind;
use herdbook_db::DbError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Farm id is required to build the remote scope.
    #[error("Farm ID not configured. Set [farm] id or HERDBOOK_FARM_ID.")]
    MissingFarmId,

    /// Invalid remote URL.
    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Failed to reach the remote store.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    /// The network monitor reports no connectivity.
    #[error("Device is offline")]
    Offline,

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// The remote store answered with an error status.
    #[error("Remote store rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// Credentials missing, expired or insufficient.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The remote answered 2xx with a body we could not interpret.
    #[error("Invalid remote response: {0}")]
    InvalidResponse(String),

    // =========================================================================
    // Push Errors
    // =========================================================================
    /// Failed to serialize a record into a document.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// A table's push did not complete.
    #[error("Push of {table} failed: {reason}")]
    PushFailed {
        table: EntityKind,
        reason: String,
        retryable: bool,
    },

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Local store error while reading or marking rows.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal sync error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(0)
        } else if err.is_decode() {
            SyncError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::RemoteRejected {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Builds the error for an HTTP error status, folding auth failures into
    /// [`SyncError::Unauthorized`].
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => SyncError::Unauthorized(message),
            _ => SyncError::RemoteRejected { status, message },
        }
    }

    /// Wraps an error raised while pushing one table, keeping its retry
    /// classification.
    pub fn push_failed(table: EntityKind, err: &SyncError) -> Self {
        SyncError::PushFailed {
            table,
            reason: err.to_string(),
            retryable: err.is_retryable(),
        }
    }

    /// Returns true if a later sync pass may succeed without user action.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - Offline device
    /// - Remote 408 / 429 / 5xx answers
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) | SyncError::Offline => true,
            SyncError::RemoteRejected { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            SyncError::Database(err) => matches!(err, DbError::PoolExhausted),
            SyncError::PushFailed { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingFarmId
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
                | SyncError::Unauthorized(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::ConnectionFailed("network error".into()).is_retryable());
        assert!(SyncError::Timeout(30).is_retryable());
        assert!(SyncError::Offline.is_retryable());
        assert!(SyncError::from_status(503, "unavailable").is_retryable());
        assert!(SyncError::from_status(429, "quota").is_retryable());

        assert!(!SyncError::from_status(400, "bad field").is_retryable());
        assert!(!SyncError::InvalidConfig("bad config".into()).is_retryable());
        assert!(!SyncError::MissingFarmId.is_retryable());
    }

    #[test]
    fn test_auth_statuses_are_config_errors() {
        let err = SyncError::from_status(403, "PERMISSION_DENIED");
        assert!(matches!(err, SyncError::Unauthorized(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_error_display() {
        let cause = SyncError::ConnectionFailed("remote unavailable".into());
        let err = SyncError::push_failed(EntityKind::Production, &cause);
        assert!(err.to_string().contains("production"));
        assert!(err.to_string().contains("remote unavailable"));
        assert!(err.is_retryable());

        let cause = SyncError::from_status(400, "INVALID_ARGUMENT");
        assert!(!SyncError::push_failed(EntityKind::Animals, &cause).is_retryable());
    }
}
