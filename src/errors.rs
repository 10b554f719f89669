//! Error types for the casino engine
//!
//! One root error with a category per concern, so callers can match on the
//! category they care about and still get a readable message for the rest.

use crate::access::AccessDecision;

/// Root error type for all engine operations
#[derive(Debug, thiserror::Error)]
pub enum CasinoError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Storage system errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Wager validation and flow errors
    #[error("Wager error: {0}")]
    Wager(#[from] WagerError),

    /// The access gate refused the player
    #[error("Access denied: {}", .0.reason)]
    AccessDenied(AccessDecision),

    /// Metrics registration errors
    #[error("Monitoring error: {0}")]
    Monitoring(#[from] MonitoringError),
}

/// Metrics registry errors
#[derive(Debug, thiserror::Error)]
pub enum MonitoringError {
    #[error("Metric registration failed: {0}")]
    RegistrationFailed(String),
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue { field: String, value: String, reason: String },
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

/// Storage system errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Wager flow errors, all reported before any state change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WagerError {
    #[error("Stake {stake} outside allowed range {min}..={max}")]
    StakeOutOfBounds { stake: u64, min: u64, max: u64 },
    #[error("Insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: u64, required: u64 },
    #[error("No pending wager for player {0}")]
    NoPendingWager(u64),
    #[error("Player {0} already has a pending wager awaiting take or risk")]
    PendingWagerExists(u64),
    #[error("Player {player_id} already has open session {session_id}")]
    SessionAlreadyOpen { player_id: u64, session_id: u64 },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

// External error conversions
impl From<rocksdb::Error> for CasinoError {
    fn from(e: rocksdb::Error) -> Self {
        CasinoError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<std::io::Error> for CasinoError {
    fn from(e: std::io::Error) -> Self {
        CasinoError::Storage(StorageError::ReadFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for CasinoError {
    fn from(e: serde_json::Error) -> Self {
        CasinoError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

impl From<bincode::Error> for CasinoError {
    fn from(e: bincode::Error) -> Self {
        CasinoError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

impl From<prometheus::Error> for CasinoError {
    fn from(e: prometheus::Error) -> Self {
        CasinoError::Monitoring(MonitoringError::RegistrationFailed(e.to_string()))
    }
}

// Convenience type alias for Results
pub type CasinoResult<T> = Result<T, CasinoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let config_error = ConfigurationError::ValidationFailed("test".to_string());
        let casino_error = CasinoError::Configuration(config_error);

        assert!(casino_error.to_string().contains("Configuration error"));
        assert!(casino_error.to_string().contains("test"));
    }

    #[test]
    fn test_wager_error_details() {
        let error = WagerError::StakeOutOfBounds { stake: 5, min: 10, max: 500 };

        assert!(error.to_string().contains("Stake 5"));
        assert!(error.to_string().contains("10..=500"));
    }

    #[test]
    fn test_error_conversion() {
        let casino_error: CasinoError = WagerError::NoPendingWager(7).into();

        match casino_error {
            CasinoError::Wager(WagerError::NoPendingWager(7)) => {}
            other => panic!("Expected wager error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_source() {
        let casino_error = CasinoError::Storage(StorageError::ReadFailed("disk".to_string()));
        assert!(casino_error.source().is_some());
    }
}
