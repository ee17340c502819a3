//! Error taxonomy for user actions.
//!
//! Every action ends in either a value or one of these; the REPL prints the
//! `Display` form and carries on.

use thiserror::Error;

pub const CONNECTION_MESSAGE: &str = "Cannot reach server";
pub const UNAVAILABLE_MESSAGE: &str = "Backend server unavailable";

/// Local, pre-network input rejection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// No response was received
    #[error("{}", CONNECTION_MESSAGE)]
    Connection { detail: String },

    /// The backend answered with a non-2xx status or `success: false`
    #[error("{0}")]
    Application(String),

    /// Health check failed for any reason
    #[error("{}", UNAVAILABLE_MESSAGE)]
    Unavailable,

    /// The session could not be written; the user stays logged out
    #[error("Could not save session: {0}")]
    Storage(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message))
    }

    /// Short label used in the activity log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Connection { .. } => "connection",
            Self::Application(_) => "application",
            Self::Unavailable => "unavailable",
            Self::Storage(_) => "storage",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Error::validation("Enter a password").to_string(), "Enter a password");
        assert_eq!(
            Error::Connection {
                detail: "refused".to_string()
            }
            .to_string(),
            "Cannot reach server"
        );
        assert_eq!(Error::Application("not found".into()).to_string(), "not found");
        assert_eq!(Error::Unavailable.to_string(), "Backend server unavailable");
    }

    #[test]
    fn test_kinds_are_distinct() {
        let conn = Error::Connection {
            detail: String::new(),
        };
        let app = Error::Application("x".into());
        assert_ne!(conn.kind(), app.kind());
    }
}
