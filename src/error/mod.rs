//! Error types for devauth.

use thiserror::Error;

use crate::auth::TransportError;

/// Primary error type for flow orchestration and session handling.
///
/// Upstream protocol outcomes (denied, expired, upstream errors) are not
/// errors here: the flow machine resolves them into terminal flow states.
#[derive(Error, Debug)]
pub enum DevauthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Could not start device authorization: {0}")]
    InitiationFailed(#[source] TransportError),

    #[error("Session is already authenticated")]
    AlreadyAuthenticated,

    #[error("Unknown or expired device flow")]
    UnknownFlow,

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DevauthError {
    /// Whether starting over may succeed without any configuration change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InitiationFailed(_) | Self::UnknownFlow)
    }

    /// Short message suitable for an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InitiationFailed(_) => "Error starting authorization. Please try again later.",
            Self::UnknownFlow => "This code has expired. Please start over.",
            Self::AlreadyAuthenticated => "This device is already signed in.",
            _ => "Something went wrong. Please start over.",
        }
    }
}

impl From<serde_json::Error> for DevauthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for DevauthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DevauthError>;
