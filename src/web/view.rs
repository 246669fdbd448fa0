//! View documents.
//!
//! Page handlers answer with the name of the view to render, its model and
//! the field errors of the submitted form, as JSON. A templating layer in
//! front of the service renders these; the integration tests read them
//! directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::account::FieldErrors;

/// Model key holding a one-shot flash message.
pub const MESSAGE_KEY: &str = "message";

/// Model key holding an error message for the whole page.
pub const ERROR_KEY: &str = "error";

/// A rendered page: `{"view": .., "model": {..}, "errors": {..}}`.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    view: String,
    model: Map<String, Value>,
    errors: FieldErrors,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            view: name.into(),
            model: Map::new(),
            errors: FieldErrors::new(),
        }
    }

    /// The generic error page.
    pub fn error_page(message: impl Into<String>) -> Self {
        Self::new("error").with_error(message)
    }

    /// Add a model attribute.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Model attribute could not be serialized");
            Value::Null
        });
        self.model.insert(key.to_string(), value);
        self
    }

    /// Set the page-level error message.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.with(ERROR_KEY, message.into())
    }

    /// Show a flash message, if there is one.
    pub fn with_flash(self, message: Option<String>) -> Self {
        match message {
            Some(message) => self.with(MESSAGE_KEY, message),
            None => self,
        }
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors.merge(errors);
        self
    }

    pub fn name(&self) -> &str {
        &self.view
    }

    pub fn model(&self) -> &Map<String, Value> {
        &self.model
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_document_shape() {
        let mut errors = FieldErrors::new();
        errors.add("email", "bad");
        let view = View::new("account/sign-up")
            .with("nickname", "youngbin")
            .with_errors(errors);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["view"], "account/sign-up");
        assert_eq!(json["model"]["nickname"], "youngbin");
        assert_eq!(json["errors"]["email"][0], "bad");
    }

    #[test]
    fn test_error_page() {
        let view = View::error_page("wrong.email");
        assert_eq!(view.name(), "error");
        assert_eq!(view.model()[ERROR_KEY], "wrong.email");
        assert!(view.errors().is_empty());
    }

    #[test]
    fn test_flash_only_when_present() {
        let view = View::new("index").with_flash(None);
        assert!(!view.model().contains_key(MESSAGE_KEY));

        let view = View::new("index").with_flash(Some("saved".to_string()));
        assert_eq!(view.model()[MESSAGE_KEY], "saved");
    }

    #[tokio::test]
    async fn test_into_response_is_json() {
        use http_body_util::BodyExt;

        let response = View::error_page("missing").into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["view"], "error");
        assert_eq!(json["model"]["error"], "missing");
        assert_eq!(json["errors"], serde_json::json!({}));
    }
}
