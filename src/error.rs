//! Error types for Serenity

use thiserror::Error;

/// Result type alias for store and session operations
pub type Result<T> = std::result::Result<T, SerenityError>;

/// Main error type for Serenity
///
/// `Validation` and `Auth` carry a message that is meant to be shown to the
/// user as-is.
#[derive(Error, Debug)]
pub enum SerenityError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SerenityError {
    /// Whether the message is safe to show directly to the user
    pub fn is_user_facing(&self) -> bool {
        matches!(self, SerenityError::Validation(_) | SerenityError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages_have_no_prefix() {
        let err = SerenityError::Validation("Please add a title for your entry".to_string());
        assert!(err.is_user_facing());
        assert_eq!(err.to_string(), "Please add a title for your entry");

        let err = SerenityError::Config("bad".to_string());
        assert!(!err.is_user_facing());
    }
}
