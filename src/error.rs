//! Crate-level error types
//!
//! Operations on the session store return [`Error`]; each layer keeps its
//! own error enum and converts into this one.

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::forms::FormErrors;
use crate::storage::StorageError;

/// Errors surfaced by session and expense operations
#[derive(Error, Debug)]
pub enum Error {
    /// A protected operation was attempted with no signed-in identity
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Form input failed validation before any network call
    #[error("Validation error: {0}")]
    Validation(#[from] FormErrors),

    /// The backend rejected or failed the call
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Local key/value storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Short message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Error::Backend(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    /// Like [`user_message`](Self::user_message), with `fallback` when the
    /// backend answered without a message
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            Error::Backend(BackendError::Api { message, .. }) if message.trim().is_empty() => {
                fallback.to_string()
            }
            other => other.user_message(),
        }
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::NotAuthenticated.to_string(), "Not authenticated");

        let err: Error = BackendError::Api {
            status: 400,
            message: "Invalid login credentials".to_string(),
        }
        .into();
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[test]
    fn test_message_fallback() {
        let empty: Error = BackendError::Api {
            status: 500,
            message: String::new(),
        }
        .into();
        assert_eq!(empty.message_or("Add failed"), "Add failed");
        assert_eq!(
            Error::NotAuthenticated.message_or("Add failed"),
            "Not authenticated"
        );
    }

    #[test]
    fn test_storage_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = StorageError::from(io_err).into();
        assert!(matches!(err, Error::Storage(StorageError::Io(_))));
    }
}
