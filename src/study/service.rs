//! Study, event and enrollment operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use super::forms::{EventDetails, StudyForm};
use crate::clock::Clock;
use crate::db::{
    Enrollment, Event, EventRepository, EventType, NewEvent, NewStudy, Study, StudyRepository,
};
use crate::{Result, StudyOlleError};

/// Result of an enrollment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled(Enrollment),
    AlreadyEnrolled,
    /// The enrollment deadline has passed.
    Closed,
}

/// Study group operations.
#[derive(Clone)]
pub struct StudyService {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl StudyService {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    fn studies(&self) -> StudyRepository<'_> {
        StudyRepository::new(&self.pool)
    }

    fn events(&self) -> EventRepository<'_> {
        EventRepository::new(&self.pool)
    }

    /// Current time from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create a study managed by `manager_id` from a validated form.
    pub async fn create_study(&self, form: &StudyForm, manager_id: i64) -> Result<Study> {
        let study = self
            .studies()
            .create(&NewStudy {
                path: form.path.clone(),
                title: form.title.clone(),
                short_description: form.short_description.clone(),
                full_description: form.full_description.clone(),
                manager_id,
                created_at: self.now(),
            })
            .await?;
        info!(study_id = study.id, path = %study.path, manager_id, "Study created");
        Ok(study)
    }

    pub async fn find_by_path(&self, path: &str) -> Result<Option<Study>> {
        self.studies().find_by_path(path).await
    }

    pub async fn is_path_taken(&self, path: &str) -> Result<bool> {
        self.studies().exists_by_path(path).await
    }

    /// Move a study to a new path. Only the manager may do this.
    pub async fn update_study_path(
        &self,
        study: &Study,
        actor_id: i64,
        new_path: &str,
    ) -> Result<()> {
        ensure_manager(study, actor_id)?;
        self.studies().update_path(study.id, new_path).await?;
        info!(study_id = study.id, from = %study.path, to = %new_path, "Study path changed");
        Ok(())
    }

    /// Create an event in `study` from a checked form.
    pub async fn create_event(
        &self,
        study: &Study,
        form: &EventDetails,
        creator_id: i64,
    ) -> Result<Event> {
        ensure_manager(study, creator_id)?;
        let event = self
            .events()
            .create(&NewEvent {
                study_id: study.id,
                created_by: creator_id,
                title: form.title.clone(),
                description: form.description.clone(),
                created_at: self.now(),
                end_enrollment_at: form.end_enrollment_at,
                start_at: form.start_at,
                end_at: form.end_at,
                limit_of_enrollments: Some(form.limit_of_enrollments),
                event_type: form.event_type,
            })
            .await?;
        info!(
            study_id = study.id,
            event_id = event.id,
            event_type = %event.event_type,
            "Event created"
        );
        Ok(event)
    }

    pub async fn events_of(&self, study: &Study) -> Result<Vec<Event>> {
        self.events().list_by_study(study.id).await
    }

    /// An event of `study`, or `None` if the ID belongs elsewhere.
    pub async fn find_event(&self, study: &Study, event_id: i64) -> Result<Option<Event>> {
        let event = self.events().get_by_id(event_id).await?;
        Ok(event.filter(|e| e.study_id == study.id))
    }

    pub async fn enrollments_of(&self, event: &Event) -> Result<Vec<Enrollment>> {
        self.events().enrollments(event.id).await
    }

    /// Enroll an account.
    ///
    /// First-come-first-served events accept while seats remain;
    /// confirmative events wait for the manager.
    pub async fn enroll(&self, event: &Event, account_id: i64) -> Result<EnrollOutcome> {
        let now = self.now();
        if !event.is_enrollment_open(now) {
            return Ok(EnrollOutcome::Closed);
        }
        if self
            .events()
            .find_enrollment(event.id, account_id)
            .await?
            .is_some()
        {
            return Ok(EnrollOutcome::AlreadyEnrolled);
        }

        let created = match event.event_type {
            EventType::Fcfs => {
                self.events()
                    .create_enrollment_if_seat(event.id, account_id, now)
                    .await
            }
            EventType::Confirmative => {
                self.events()
                    .create_enrollment(event.id, account_id, now, false)
                    .await
            }
        };
        let enrollment = match created {
            Ok(enrollment) => enrollment,
            // A concurrent request from the same account got there first.
            Err(StudyOlleError::Duplicate(_)) => return Ok(EnrollOutcome::AlreadyEnrolled),
            Err(e) => return Err(e),
        };
        info!(
            event_id = event.id,
            account_id,
            accepted = enrollment.accepted,
            "Enrolled"
        );
        Ok(EnrollOutcome::Enrolled(enrollment))
    }

    /// Cancel an account's enrollment. Returns false if there was none.
    ///
    /// In a first-come-first-served event the earliest waiting enrollment
    /// takes the freed seat.
    pub async fn disenroll(&self, event: &Event, account_id: i64) -> Result<bool> {
        if !event.is_enrollment_open(self.now()) {
            return Err(StudyOlleError::Validation(
                "enrollment is closed".to_string(),
            ));
        }
        let Some(enrollment) = self.events().find_enrollment(event.id, account_id).await? else {
            return Ok(false);
        };

        self.events().delete_enrollment(enrollment.id).await?;
        info!(event_id = event.id, account_id, "Disenrolled");

        if enrollment.accepted && event.event_type == EventType::Fcfs {
            self.promote_waiting(event).await?;
        }
        Ok(true)
    }

    async fn promote_waiting(&self, event: &Event) -> Result<()> {
        if let Some(account_id) = self.events().promote_first_waiting(event.id).await? {
            info!(event_id = event.id, account_id, "Waiting enrollment promoted");
        }
        Ok(())
    }

    /// Accept an enrollment of a confirmative event.
    pub async fn accept_enrollment(
        &self,
        study: &Study,
        event: &Event,
        enrollment_id: i64,
        actor_id: i64,
    ) -> Result<()> {
        let enrollment = self.managed_enrollment(study, event, enrollment_id, actor_id).await?;
        if enrollment.accepted {
            return Ok(());
        }
        if !self.events().accept_if_seat(enrollment.id).await? {
            return Err(StudyOlleError::Validation(
                "no seats left in this event".to_string(),
            ));
        }
        Ok(())
    }

    /// Reject an enrollment of a confirmative event.
    pub async fn reject_enrollment(
        &self,
        study: &Study,
        event: &Event,
        enrollment_id: i64,
        actor_id: i64,
    ) -> Result<()> {
        let enrollment = self.managed_enrollment(study, event, enrollment_id, actor_id).await?;
        self.events().set_accepted(enrollment.id, false).await
    }

    async fn managed_enrollment(
        &self,
        study: &Study,
        event: &Event,
        enrollment_id: i64,
        actor_id: i64,
    ) -> Result<Enrollment> {
        ensure_manager(study, actor_id)?;
        if event.event_type != EventType::Confirmative {
            return Err(StudyOlleError::Validation(
                "only confirmative events are managed by hand".to_string(),
            ));
        }
        self.events()
            .get_enrollment(enrollment_id)
            .await?
            .filter(|e| e.event_id == event.id)
            .ok_or_else(|| StudyOlleError::NotFound("enrollment".to_string()))
    }
}

fn ensure_manager(study: &Study, actor_id: i64) -> Result<()> {
    if study.is_manager(actor_id) {
        Ok(())
    } else {
        Err(StudyOlleError::Permission(
            "only the study manager can do this".to_string(),
        ))
    }
}
