//! Account lifecycle for StudyOlle.
//!
//! Sign-up, email verification, email login, settings and preference
//! management, plus the principal handed to request handlers.

pub mod forms;
pub mod password;
pub mod principal;
pub mod service;
pub mod validation;

pub use forms::{
    NicknameForm, PasswordForm, ProfileForm, SignUpForm, TagForm, ZoneForm, ZoneName,
};
pub use password::{hash_password, verify_password, PasswordError};
pub use principal::{UserAccount, ROLE_USER};
pub use service::{AccountService, EmailCheck, PasswordChange, ResendOutcome};
pub use validation::{FieldErrors, SignUpValidator};
