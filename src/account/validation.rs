//! Form validation for StudyOlle.
//!
//! Field rules come from `validator` derives on the form types; the rules a
//! derive cannot express (character classes, uniqueness, cross-field checks)
//! live here. Every check reports into a [`FieldErrors`] map so handlers can
//! re-render the form with all messages at once.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::AccountRepository;
use crate::Result;

/// Field name to error messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Whether `field` has at least one message.
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold another error set into this one.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when empty, the errors otherwise.
    pub fn into_result(self) -> std::result::Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut result = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for e in field_errors {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                result.add(field.to_string(), message);
            }
        }
        result
    }
}

/// Run the derive rules of a form and collect their messages.
pub fn validate_fields<T: validator::Validate>(form: &T) -> FieldErrors {
    match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => e.into(),
    }
}

/// Characters allowed in nicknames and study paths:
/// lowercase ASCII letters, digits, `_`, `-`, Hangul jamo and syllables.
pub fn is_allowed_handle_char(c: char) -> bool {
    c.is_ascii_lowercase()
        || c.is_ascii_digit()
        || c == '_'
        || c == '-'
        || ('\u{3131}'..='\u{314E}').contains(&c)
        || ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Check a handle (nickname or study path) for length and characters.
///
/// Length counts characters, not bytes.
pub fn is_valid_handle(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    (min..=max).contains(&len) && value.chars().all(is_allowed_handle_char)
}

/// Uniqueness checks for the sign-up form.
pub struct SignUpValidator<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SignUpValidator<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Report an already registered email or nickname.
    pub async fn validate(&self, email: &str, nickname: &str) -> Result<FieldErrors> {
        let repo = AccountRepository::new(self.pool);
        let mut errors = FieldErrors::new();

        if repo.exists_by_email(email).await? {
            errors.add("email", "이미 사용중인 이메일입니다.");
        }
        if repo.exists_by_nickname(nickname).await? {
            errors.add("nickname", "이미 사용중인 닉네임입니다.");
        }
        Ok(errors)
    }
}
