//! Error types for StudyOlle.

use thiserror::Error;

/// Common error type for StudyOlle.
#[derive(Error, Debug)]
pub enum StudyOlleError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound mail could not be built or delivered.
    #[error("mail error: {0}")]
    Mail(String),

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] crate::account::PasswordError),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The caller is authenticated but not allowed to do this.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A unique value (email, nickname, path) is already taken.
    #[error("already exists: {0}")]
    Duplicate(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for StudyOlleError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return StudyOlleError::Duplicate(db_err.message().to_string());
            }
        }
        StudyOlleError::Database(e.to_string())
    }
}

/// Result type alias for StudyOlle operations.
pub type Result<T> = std::result::Result<T, StudyOlleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error_display() {
        let err = StudyOlleError::NotFound("account".to_string());
        assert_eq!(err.to_string(), "account not found");
    }

    #[test]
    fn test_validation_error_display() {
        let err = StudyOlleError::Validation("nickname too long".to_string());
        assert_eq!(err.to_string(), "validation error: nickname too long");
    }

    #[test]
    fn test_mail_error_display() {
        let err = StudyOlleError::Mail("connection refused".to_string());
        assert_eq!(err.to_string(), "mail error: connection refused");
    }

    #[test]
    fn test_duplicate_error_display() {
        let err = StudyOlleError::Duplicate("UNIQUE constraint failed: accounts.email".to_string());
        assert_eq!(
            err.to_string(),
            "already exists: UNIQUE constraint failed: accounts.email"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StudyOlleError = io_err.into();
        assert!(matches!(err, StudyOlleError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: StudyOlleError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StudyOlleError::Database(_)));
    }
}
