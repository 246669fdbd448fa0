//! HTTP error responses.
//!
//! Page handlers render recoverable problems as view documents; `ApiError`
//! covers everything else (bad JSON bodies, permission failures and
//! infrastructure errors).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::account::FieldErrors;
use crate::StudyOlleError;

/// Machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ValidationError,
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

/// An error rendered as a JSON error body.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Field errors of a JSON request body.
    pub fn validation(details: FieldErrors) -> Self {
        Self {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StudyOlleError> for ApiError {
    fn from(err: StudyOlleError) -> Self {
        match &err {
            StudyOlleError::Auth(msg) => ApiError::unauthorized(msg.clone()),
            StudyOlleError::Permission(msg) => ApiError::forbidden(msg.clone()),
            StudyOlleError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            StudyOlleError::Validation(msg) => ApiError::bad_request(msg.clone()),
            StudyOlleError::Duplicate(_) => ApiError::conflict("Resource already exists"),
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_domain_error() {
        let err: ApiError = StudyOlleError::Permission("manager only".to_string()).into();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let err: ApiError = StudyOlleError::Validation("closed".to_string()).into();
        assert_eq!(err.code(), ErrorCode::BadRequest);

        let err: ApiError = StudyOlleError::NotFound("enrollment".to_string()).into();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err: ApiError = StudyOlleError::Duplicate("studies.path".to_string()).into();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err: ApiError = StudyOlleError::Database("locked".to_string()).into();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let err: ApiError = StudyOlleError::Database("secret table name".to_string()).into();
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_validation_error_serializes_details() {
        let mut details = FieldErrors::new();
        details.add("tag_title", "required");
        let err = ApiError::validation(details);
        let body = ErrorBody {
            error: ErrorDetail {
                code: err.code,
                message: err.message,
                details: err.details,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["details"]["tag_title"][0], "required");
    }

    #[tokio::test]
    async fn test_into_response_status() {
        let response = ApiError::forbidden("no").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
