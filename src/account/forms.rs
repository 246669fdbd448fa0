//! Account and settings forms.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation::{is_allowed_handle_char, validate_fields, FieldErrors};
use crate::db::{Account, ProfileUpdate};

/// Message shown when a nickname uses characters outside the allowed set.
const NICKNAME_PATTERN_MESSAGE: &str =
    "닉네임은 한글, 영문 소문자, 숫자, '_', '-' 만 사용할 수 있습니다.";

fn check_nickname_chars(nickname: &str, errors: &mut FieldErrors) {
    if !nickname.chars().all(is_allowed_handle_char) {
        errors.add("nickname", NICKNAME_PATTERN_MESSAGE);
    }
}

/// Sign-up submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SignUpForm {
    #[serde(default)]
    #[validate(length(min = 3, max = 20, message = "닉네임은 3자 이상 20자 이하로 입력하세요."))]
    pub nickname: String,

    #[serde(default)]
    #[validate(email(message = "올바른 이메일 주소를 입력하세요."))]
    pub email: String,

    #[serde(default, skip_serializing)]
    #[validate(length(min = 8, max = 50, message = "비밀번호는 8자 이상 50자 이하로 입력하세요."))]
    pub password: String,
}

impl SignUpForm {
    /// Field rules only; uniqueness is checked by
    /// [`SignUpValidator`](super::validation::SignUpValidator).
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = validate_fields(self);
        check_nickname_chars(&self.nickname, &mut errors);
        errors
    }
}

/// Profile settings submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(length(max = 35, message = "자기소개는 35자 이내로 입력하세요."))]
    pub bio: Option<String>,

    #[serde(default)]
    #[validate(length(max = 50, message = "50자 이내로 입력하세요."))]
    pub url: Option<String>,

    #[serde(default)]
    #[validate(length(max = 50, message = "50자 이내로 입력하세요."))]
    pub occupation: Option<String>,

    #[serde(default)]
    #[validate(length(max = 50, message = "50자 이내로 입력하세요."))]
    pub location: Option<String>,

    #[serde(default)]
    pub profile_image: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ProfileForm {
    pub fn field_errors(&self) -> FieldErrors {
        validate_fields(self)
    }

    /// Normalize into the stored profile; blank fields are cleared.
    pub fn into_update(self) -> ProfileUpdate {
        ProfileUpdate {
            bio: non_empty(self.bio),
            url: non_empty(self.url),
            occupation: non_empty(self.occupation),
            location: non_empty(self.location),
            profile_image: non_empty(self.profile_image),
        }
    }
}

impl From<&Account> for ProfileForm {
    fn from(account: &Account) -> Self {
        let profile = account.profile();
        Self {
            bio: profile.bio,
            url: profile.url,
            occupation: profile.occupation,
            location: profile.location,
            profile_image: profile.profile_image,
        }
    }
}

/// Password change submission.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PasswordForm {
    #[serde(default)]
    #[validate(length(min = 8, max = 50, message = "비밀번호는 8자 이상 50자 이하로 입력하세요."))]
    pub new_password: String,

    #[serde(default)]
    #[validate(length(min = 8, max = 50, message = "비밀번호는 8자 이상 50자 이하로 입력하세요."))]
    pub new_password_confirm: String,
}

impl PasswordForm {
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = validate_fields(self);
        if self.new_password != self.new_password_confirm {
            errors.add("new_password_confirm", "비밀번호가 일치하지 않습니다.");
        }
        errors
    }
}

/// Nickname change submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NicknameForm {
    #[serde(default)]
    #[validate(length(min = 3, max = 20, message = "닉네임은 3자 이상 20자 이하로 입력하세요."))]
    pub nickname: String,
}

impl NicknameForm {
    /// Field rules only; the handler checks that the nickname is free.
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = validate_fields(self);
        check_nickname_chars(&self.nickname, &mut errors);
        errors
    }
}

/// Tag add/remove request body.
#[derive(Debug, Clone, Deserialize)]
pub struct TagForm {
    pub tag_title: String,
}

/// Zone add/remove request body, in `city(localName)/province` form.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneForm {
    pub zone_name: String,
}

/// The parts of a zone name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneName<'a> {
    pub city: &'a str,
    pub local_name_of_city: &'a str,
    pub province: &'a str,
}

impl ZoneForm {
    /// Split `city(localName)/province`. Returns `None` when malformed.
    pub fn parse(&self) -> Option<ZoneName<'_>> {
        let (city, rest) = self.zone_name.split_once('(')?;
        let (local_name_of_city, rest) = rest.split_once(')')?;
        let province = rest.strip_prefix('/')?;
        if city.is_empty() || province.is_empty() {
            return None;
        }
        Some(ZoneName {
            city,
            local_name_of_city,
            province,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(nickname: &str, email: &str, password: &str) -> SignUpForm {
        SignUpForm {
            nickname: nickname.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_sign_up_form_valid() {
        assert!(sign_up("youngbin", "yb@email.com", "12345678")
            .field_errors()
            .is_empty());
    }

    #[test]
    fn test_sign_up_form_bad_email() {
        let errors = sign_up("youngbin", "email..", "12345678").field_errors();
        assert!(errors.has("email"));
        assert!(!errors.has("nickname"));
    }

    #[test]
    fn test_sign_up_form_short_password_and_bad_nickname() {
        let errors = sign_up("Young Bin", "yb@email.com", "1234").field_errors();
        assert!(errors.has("password"));
        assert!(errors.has("nickname"));
    }

    #[test]
    fn test_sign_up_form_never_serializes_password() {
        let json = serde_json::to_value(sign_up("youngbin", "yb@email.com", "12345678")).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "yb@email.com");
    }

    #[test]
    fn test_profile_form_limits() {
        let form = ProfileForm {
            bio: Some("x".repeat(36)),
            url: Some("https://example.com".to_string()),
            ..Default::default()
        };
        let errors = form.field_errors();
        assert!(errors.has("bio"));
        assert!(!errors.has("url"));
    }

    #[test]
    fn test_profile_form_blank_fields_cleared() {
        let form = ProfileForm {
            bio: Some("hello".to_string()),
            url: Some("  ".to_string()),
            ..Default::default()
        };
        let update = form.into_update();
        assert_eq!(update.bio.as_deref(), Some("hello"));
        assert!(update.url.is_none());
    }

    #[test]
    fn test_password_form_mismatch() {
        let form = PasswordForm {
            new_password: "12345678".to_string(),
            new_password_confirm: "87654321".to_string(),
        };
        assert!(form.field_errors().has("new_password_confirm"));

        let form = PasswordForm {
            new_password: "12345678".to_string(),
            new_password_confirm: "12345678".to_string(),
        };
        assert!(form.field_errors().is_empty());
    }

    #[test]
    fn test_nickname_form() {
        let ok = NicknameForm {
            nickname: "새닉네임".to_string(),
        };
        assert!(ok.field_errors().is_empty());

        let bad = NicknameForm {
            nickname: "ab".to_string(),
        };
        assert!(bad.field_errors().has("nickname"));
    }

    #[test]
    fn test_zone_form_parse() {
        let form = ZoneForm {
            zone_name: "Andong(안동시)/Gyeongsangbuk-do".to_string(),
        };
        assert_eq!(
            form.parse(),
            Some(ZoneName {
                city: "Andong",
                local_name_of_city: "안동시",
                province: "Gyeongsangbuk-do",
            })
        );
    }

    #[test]
    fn test_zone_form_parse_malformed() {
        for name in ["Andong", "Andong(안동시)", "(안동시)/Gyeongsangbuk-do", "Andong/none"] {
            let form = ZoneForm {
                zone_name: name.to_string(),
            };
            assert!(form.parse().is_none(), "{name} should not parse");
        }
    }
}
