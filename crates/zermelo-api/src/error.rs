//! Client error types.

use thiserror::Error;
use zermelo_auth::StorageError;
use zermelo_core::ConfigError;

#[derive(Error, Debug)]
pub enum ZermeloError {
    #[error("No access token cached for user {0}")]
    TokenNotFound(String),

    #[error("Access token is invalid or expired")]
    Unauthorized,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Authorization code was rejected")]
    AuthCodeInvalid,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Token cache error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<StorageError> for ZermeloError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TokenNotFound(user) => Self::TokenNotFound(user),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl ZermeloError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::TokenNotFound(user) => {
                format!("No access token for {}. Log in with a new authorization code.", user)
            }
            Self::Unauthorized => {
                "Your access token is no longer valid. Log in with a new authorization code."
                    .to_string()
            }
            Self::ApiError(msg) => format!("Zermelo error: {}", msg),
            Self::AuthCodeInvalid => {
                "The authorization code was rejected. It may be mistyped or expired.".to_string()
            }
            Self::Transport(_) => "Network error. Check your connection.".to_string(),
            Self::InvalidResponse(_) => "Received an unexpected response from Zermelo".to_string(),
            Self::Storage(_) => "Local token cache error".to_string(),
            Self::Config(e) => e.user_message().to_string(),
        }
    }

    /// Whether recovering from this error needs a fresh authorization code.
    pub fn should_reauthenticate(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::TokenNotFound(_) | Self::AuthCodeInvalid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        assert!(ZermeloError::Unauthorized.user_message().contains("authorization code"));

        let err = ZermeloError::ApiError("Bad request".into());
        assert!(err.user_message().contains("Bad request"));

        let err = ZermeloError::TokenNotFound("12345".into());
        assert!(err.user_message().contains("12345"));
    }

    #[test]
    fn test_should_reauthenticate() {
        assert!(ZermeloError::Unauthorized.should_reauthenticate());
        assert!(ZermeloError::AuthCodeInvalid.should_reauthenticate());
        assert!(ZermeloError::TokenNotFound("x".into()).should_reauthenticate());
        assert!(!ZermeloError::ApiError("x".into()).should_reauthenticate());
        assert!(!ZermeloError::Storage("x".into()).should_reauthenticate());
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: ZermeloError = StorageError::TokenNotFound("abc".into()).into();
        assert!(matches!(err, ZermeloError::TokenNotFound(u) if u == "abc"));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: ZermeloError = StorageError::Io(io).into();
        assert!(matches!(err, ZermeloError::Storage(msg) if msg.contains("disk full")));
    }
}
