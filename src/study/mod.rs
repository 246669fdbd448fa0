//! Study groups, their events and event enrollments.

pub mod forms;
pub mod service;

pub use forms::{EventDetails, EventForm, StudyForm, StudyPathForm};
pub use service::{EnrollOutcome, StudyService};
