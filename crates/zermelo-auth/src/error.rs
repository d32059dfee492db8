//! Token storage error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// No token is cached for the user, or the cache could not be read.
    #[error("Token not found for user: {0}")]
    TokenNotFound(String),

    #[error("Token cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::TokenNotFound(user) => {
                format!("No access token stored for {}. Please log in again.", user)
            }
            Self::Io(_) => "Failed to access the token cache file".to_string(),
            Self::Serialization(_) => "The token cache file is corrupted".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_names_user() {
        let err = StorageError::TokenNotFound("12345".into());
        assert!(err.user_message().contains("12345"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StorageError = io.into();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
