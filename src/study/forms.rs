//! Study and event forms.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::account::validation::{is_allowed_handle_char, validate_fields, FieldErrors};
use crate::db::EventType;

/// Minimum study path length.
pub const MIN_PATH_LENGTH: usize = 2;

/// Maximum study path length.
pub const MAX_PATH_LENGTH: usize = 20;

const PATH_PATTERN_MESSAGE: &str =
    "스터디 경로는 한글, 영문 소문자, 숫자, '_', '-' 만 사용할 수 있습니다.";

fn check_path(field: &str, path: &str, errors: &mut FieldErrors) {
    let len = path.chars().count();
    if !(MIN_PATH_LENGTH..=MAX_PATH_LENGTH).contains(&len) {
        errors.add(
            field,
            format!("스터디 경로는 {MIN_PATH_LENGTH}자 이상 {MAX_PATH_LENGTH}자 이하로 입력하세요."),
        );
    } else if !path.chars().all(is_allowed_handle_char) {
        errors.add(field, PATH_PATTERN_MESSAGE);
    }
}

/// New study submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StudyForm {
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "제목은 50자 이내로 입력하세요."))]
    pub title: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "짧은 소개는 100자 이내로 입력하세요."))]
    pub short_description: String,

    #[serde(default)]
    pub full_description: Option<String>,
}

impl StudyForm {
    /// Field rules only; the service checks that the path is free.
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = validate_fields(self);
        check_path("path", &self.path, &mut errors);
        errors
    }
}

/// Study path change submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyPathForm {
    #[serde(default)]
    pub new_path: String,
}

impl StudyPathForm {
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_path("new_path", &self.new_path, &mut errors);
        errors
    }
}

/// Date-time layouts an event form accepts besides RFC 3339. These are
/// what a browser `datetime-local` input submits; they are read as UTC.
const LOCAL_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Parse a submitted date-time, with or without an offset.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// New event submission, as typed into the form.
///
/// Every field arrives as text so that a blank or malformed value becomes a
/// field error on the re-rendered form instead of a rejected request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EventForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "모임 이름은 50자 이내로 입력하세요."))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub event_type: String,

    #[serde(default)]
    pub limit_of_enrollments: String,

    #[serde(default)]
    pub end_enrollment_at: String,

    #[serde(default)]
    pub start_at: String,

    #[serde(default)]
    pub end_at: String,
}

/// A checked event submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub title: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub limit_of_enrollments: i64,
    pub end_enrollment_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl EventForm {
    /// Check the submission as seen at `now`: field rules, then the time
    /// window once all three times parse.
    pub fn parse(&self, now: DateTime<Utc>) -> Result<EventDetails, FieldErrors> {
        let mut errors = validate_fields(self);

        let event_type = match self.event_type.trim() {
            "" => Some(EventType::default()),
            value => value.parse::<EventType>().ok(),
        };
        if event_type.is_none() {
            errors.add("event_type", "모임 방식을 선택하세요.");
        }

        let limit = match self.limit_of_enrollments.trim().parse::<i64>() {
            Ok(limit) if limit >= 2 => Some(limit),
            Ok(_) => {
                errors.add("limit_of_enrollments", "모집 인원은 2명 이상이어야 합니다.");
                None
            }
            Err(_) => {
                errors.add("limit_of_enrollments", "모집 인원을 숫자로 입력하세요.");
                None
            }
        };

        let end_enrollment_at = parse_datetime(&self.end_enrollment_at);
        let start_at = parse_datetime(&self.start_at);
        let end_at = parse_datetime(&self.end_at);

        if end_enrollment_at.map_or(true, |at| at <= now) {
            errors.add(
                "end_enrollment_at",
                "모임 접수 종료 일시를 정확히 입력하세요.",
            );
        }
        match (end_enrollment_at, start_at) {
            (Some(deadline), Some(start)) if start >= deadline => {}
            _ => errors.add("start_at", "모임 시작 일시를 정확히 입력하세요."),
        }
        match (start_at, end_at) {
            (Some(start), Some(end)) if end >= start => {}
            _ => errors.add("end_at", "모임 종료 일시를 정확히 입력하세요."),
        }

        match (event_type, limit, end_enrollment_at, start_at, end_at) {
            (Some(event_type), Some(limit), Some(deadline), Some(start), Some(end))
                if errors.is_empty() =>
            {
                Ok(EventDetails {
                    title: self.title.clone(),
                    description: self.description.clone().filter(|d| !d.trim().is_empty()),
                    event_type,
                    limit_of_enrollments: limit,
                    end_enrollment_at: deadline,
                    start_at: start,
                    end_at: end,
                })
            }
            _ => Err(errors),
        }
    }
}
