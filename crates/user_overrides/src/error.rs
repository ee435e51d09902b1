//! Error types for the user override store and its command surface.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::UserId;

/// Errors raised by the durable storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors raised by plugin configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to write config file {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, serde_json::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by override operations.
///
/// Command handlers turn every variant into a human-readable reply, so the
/// `Display` text of each variant is written for players to read.
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("More than one user matched: {}", .0.join(", "))]
    AmbiguousMatch(Vec<String>),

    #[error("User {0} already has an override record")]
    DuplicateKey(UserId),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StorageError),

    #[error("Configuration failure: {0}")]
    Config(#[from] ConfigError),
}

impl OverrideError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }
}

impl From<sqlx::Error> for OverrideError {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageFailure(StorageError::Database(err))
    }
}

pub type OverrideResult<T> = Result<T, OverrideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_match_lists_every_name() {
        let err = OverrideError::AmbiguousMatch(vec!["Bob".to_string(), "bob".to_string()]);
        assert_eq!(err.to_string(), "More than one user matched: Bob, bob");
    }

    #[test]
    fn test_storage_failure_wraps_sqlx() {
        let err: OverrideError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, OverrideError::StorageFailure(StorageError::Database(_))));
        assert!(err.to_string().starts_with("Storage failure"));
    }
}
