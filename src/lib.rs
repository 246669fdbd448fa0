//! StudyOlle - a study group community web service.
//!
//! Members sign up and verify their email, maintain their profile and
//! preferences, and join study groups with scheduled events.

pub mod account;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod study;
pub mod web;

pub use account::{
    AccountService, EmailCheck, FieldErrors, PasswordChange, ResendOutcome, UserAccount,
    ROLE_USER,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::{Account, Database, Study, Tag, Zone};
pub use error::{Result, StudyOlleError};
pub use mail::{EmailMessage, EmailSender, InMemoryEmailSender};
pub use study::{EnrollOutcome, StudyService};
pub use web::{AppState, SessionKeys, WebServer};
