//! Event and enrollment models and repository.
//!
//! A study owns its events; an event owns its enrollments and deleting the
//! event removes them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{Result, StudyOlleError};

/// How enrollments to an event get accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// First come, first served up to the enrollment limit.
    #[default]
    Fcfs,
    /// The study manager accepts each enrollment.
    Confirmative,
}

impl EventType {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Fcfs => "FCFS",
            EventType::Confirmative => "CONFIRMATIVE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for an unrecognized event type string.
#[derive(Debug, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct ParseEventTypeError(String);

impl FromStr for EventType {
    type Err = ParseEventTypeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FCFS" => Ok(EventType::Fcfs),
            "CONFIRMATIVE" => Ok(EventType::Confirmative),
            _ => Err(ParseEventTypeError(s.to_string())),
        }
    }
}

impl TryFrom<String> for EventType {
    type Error = ParseEventTypeError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// A scheduled meeting of a study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub study_id: i64,
    pub created_by: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub end_enrollment_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Maximum accepted enrollments; `None` means unlimited.
    pub limit_of_enrollments: Option<i64>,
    #[sqlx(try_from = "String")]
    pub event_type: EventType,
}

impl Event {
    /// Enrollment stays open until `end_enrollment_at`.
    pub fn is_enrollment_open(&self, now: DateTime<Utc>) -> bool {
        now < self.end_enrollment_at
    }
}

/// Data for creating a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub study_id: i64,
    pub created_by: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub end_enrollment_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub limit_of_enrollments: Option<i64>,
    pub event_type: EventType,
}

/// An account's enrollment in an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub event_id: i64,
    pub account_id: i64,
    pub enrolled_at: DateTime<Utc>,
    pub accepted: bool,
    pub attended: bool,
}

/// Repository for events and their enrollments.
pub struct EventRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> EventRepository<'a> {
    /// Create a new EventRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an event.
    pub async fn create(&self, new_event: &NewEvent) -> Result<Event> {
        let result = sqlx::query(
            "INSERT INTO events (study_id, created_by, title, description, created_at,
                                 end_enrollment_at, start_at, end_at, limit_of_enrollments, event_type)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_event.study_id)
        .bind(new_event.created_by)
        .bind(&new_event.title)
        .bind(&new_event.description)
        .bind(new_event.created_at)
        .bind(new_event.end_enrollment_at)
        .bind(new_event.start_at)
        .bind(new_event.end_at)
        .bind(new_event.limit_of_enrollments)
        .bind(new_event.event_type.as_str())
        .execute(self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| StudyOlleError::NotFound("event".to_string()))
    }

    /// Get an event by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(event)
    }

    /// List the events of a study by start time.
    pub async fn list_by_study(&self, study_id: i64) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE study_id = ? ORDER BY start_at, id",
        )
        .bind(study_id)
        .fetch_all(self.pool)
        .await?;
        Ok(events)
    }

    /// Delete an event together with its enrollments.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List the enrollments of an event in arrival order.
    pub async fn enrollments(&self, event_id: i64) -> Result<Vec<Enrollment>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE event_id = ? ORDER BY enrolled_at, id",
        )
        .bind(event_id)
        .fetch_all(self.pool)
        .await?;
        Ok(enrollments)
    }

    /// Get an enrollment by ID.
    pub async fn get_enrollment(&self, id: i64) -> Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(enrollment)
    }

    /// Find the enrollment of an account in an event.
    pub async fn find_enrollment(
        &self,
        event_id: i64,
        account_id: i64,
    ) -> Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE event_id = ? AND account_id = ?",
        )
        .bind(event_id)
        .bind(account_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(enrollment)
    }

    /// Create an enrollment.
    pub async fn create_enrollment(
        &self,
        event_id: i64,
        account_id: i64,
        enrolled_at: DateTime<Utc>,
        accepted: bool,
    ) -> Result<Enrollment> {
        let result = sqlx::query(
            "INSERT INTO enrollments (event_id, account_id, enrolled_at, accepted) VALUES (?, ?, ?, ?)",
        )
        .bind(event_id)
        .bind(account_id)
        .bind(enrolled_at)
        .bind(accepted)
        .execute(self.pool)
        .await?;

        self.get_enrollment(result.last_insert_rowid())
            .await?
            .ok_or_else(|| StudyOlleError::NotFound("enrollment".to_string()))
    }

    /// Delete an enrollment.
    pub async fn delete_enrollment(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the accepted flag of an enrollment.
    pub async fn set_accepted(&self, id: i64, accepted: bool) -> Result<()> {
        sqlx::query("UPDATE enrollments SET accepted = ? WHERE id = ?")
            .bind(accepted)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Create an enrollment in a first-come-first-served event, accepted if
    /// a seat is left.
    ///
    /// The seat count and the insert are one statement, so concurrent
    /// enrollments cannot overfill the event.
    pub async fn create_enrollment_if_seat(
        &self,
        event_id: i64,
        account_id: i64,
        enrolled_at: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let result = sqlx::query(
            "INSERT INTO enrollments (event_id, account_id, enrolled_at, accepted)
             SELECT e.id, ?2, ?3,
                    e.limit_of_enrollments IS NULL
                    OR (SELECT COUNT(*) FROM enrollments a
                        WHERE a.event_id = e.id AND a.accepted = 1) < e.limit_of_enrollments
             FROM events e WHERE e.id = ?1",
        )
        .bind(event_id)
        .bind(account_id)
        .bind(enrolled_at)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StudyOlleError::NotFound("event".to_string()));
        }

        self.get_enrollment(result.last_insert_rowid())
            .await?
            .ok_or_else(|| StudyOlleError::NotFound("enrollment".to_string()))
    }

    /// Accept an enrollment if its event still has a free seat.
    ///
    /// Returns false when the event is full or the enrollment was already
    /// accepted.
    pub async fn accept_if_seat(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE enrollments SET accepted = 1
             WHERE id = ?1 AND accepted = 0
               AND (SELECT e.limit_of_enrollments IS NULL
                           OR (SELECT COUNT(*) FROM enrollments a
                               WHERE a.event_id = e.id AND a.accepted = 1) < e.limit_of_enrollments
                    FROM events e WHERE e.id = enrollments.event_id)",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Give a free seat to the earliest waiting enrollment.
    ///
    /// Returns the promoted account, or `None` when nobody waits or the
    /// event is still full.
    pub async fn promote_first_waiting(&self, event_id: i64) -> Result<Option<i64>> {
        let account_id: Option<i64> = sqlx::query_scalar(
            "UPDATE enrollments SET accepted = 1
             WHERE id = (SELECT w.id FROM enrollments w
                         WHERE w.event_id = ?1 AND w.accepted = 0
                         ORDER BY w.enrolled_at, w.id LIMIT 1)
               AND (SELECT e.limit_of_enrollments IS NULL
                           OR (SELECT COUNT(*) FROM enrollments a
                               WHERE a.event_id = e.id AND a.accepted = 1) < e.limit_of_enrollments
                    FROM events e WHERE e.id = ?1)
             RETURNING account_id",
        )
        .bind(event_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountRepository, Database, NewAccount, NewStudy, StudyRepository};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 0).unwrap()
    }

    async fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let manager = AccountRepository::new(db.pool())
            .create(&NewAccount::new("mgr@email.com", "manager", "hashed"))
            .await
            .unwrap();
        let study = StudyRepository::new(db.pool())
            .create(&NewStudy {
                path: "spring".to_string(),
                title: "Spring".to_string(),
                short_description: "short".to_string(),
                full_description: None,
                manager_id: manager.id,
                created_at: t0(),
            })
            .await
            .unwrap();
        (db, manager.id, study.id)
    }

    fn new_event(study_id: i64, created_by: i64, event_type: EventType) -> NewEvent {
        NewEvent {
            study_id,
            created_by,
            title: "Kickoff".to_string(),
            description: Some("first meeting".to_string()),
            created_at: t0(),
            end_enrollment_at: t0() + Duration::days(1),
            start_at: t0() + Duration::days(2),
            end_at: t0() + Duration::days(2) + Duration::hours(2),
            limit_of_enrollments: Some(2),
            event_type,
        }
    }

    #[test]
    fn test_event_type_parse() {
        assert_eq!("FCFS".parse::<EventType>().unwrap(), EventType::Fcfs);
        assert_eq!(
            "confirmative".parse::<EventType>().unwrap(),
            EventType::Confirmative
        );
        assert!("lottery".parse::<EventType>().is_err());
        assert_eq!(EventType::Confirmative.to_string(), "CONFIRMATIVE");
    }

    #[test]
    fn test_event_type_serde() {
        assert_eq!(
            serde_json::to_string(&EventType::Confirmative).unwrap(),
            "\"CONFIRMATIVE\""
        );
        let parsed: EventType = serde_json::from_str("\"FCFS\"").unwrap();
        assert_eq!(parsed, EventType::Fcfs);
    }

    #[tokio::test]
    async fn test_create_event_round_trip() {
        let (db, manager_id, study_id) = setup().await;
        let repo = EventRepository::new(db.pool());

        let event = repo
            .create(&new_event(study_id, manager_id, EventType::Confirmative))
            .await
            .unwrap();
        assert_eq!(event.event_type, EventType::Confirmative);
        assert_eq!(event.limit_of_enrollments, Some(2));
        assert!(event.is_enrollment_open(t0()));
        assert!(!event.is_enrollment_open(t0() + Duration::days(1)));

        let listed = repo.list_by_study(study_id).await.unwrap();
        assert_eq!(listed, vec![event]);
    }

    async fn member(db: &Database, nickname: &str) -> i64 {
        AccountRepository::new(db.pool())
            .create(&NewAccount::new(
                format!("{nickname}@email.com"),
                nickname,
                "hashed",
            ))
            .await
            .unwrap()
            .id
    }

    fn accepted_count(enrollments: &[Enrollment]) -> usize {
        enrollments.iter().filter(|e| e.accepted).count()
    }

    #[tokio::test]
    async fn test_enrollment_queries() {
        let (db, manager_id, study_id) = setup().await;
        let repo = EventRepository::new(db.pool());
        let event = repo
            .create(&new_event(study_id, manager_id, EventType::Confirmative))
            .await
            .unwrap();

        let first = repo
            .create_enrollment(event.id, manager_id, t0(), false)
            .await
            .unwrap();
        assert!(!first.accepted);
        assert_eq!(
            repo.find_enrollment(event.id, manager_id).await.unwrap(),
            Some(first.clone())
        );

        repo.set_accepted(first.id, true).await.unwrap();
        assert!(repo.get_enrollment(first.id).await.unwrap().unwrap().accepted);

        let again = repo.create_enrollment(event.id, manager_id, t0(), false).await;
        assert!(matches!(again, Err(StudyOlleError::Duplicate(_))));

        assert!(repo.delete_enrollment(first.id).await.unwrap());
        assert!(repo.enrollments(event.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fcfs_insert_stops_at_limit() {
        let (db, manager_id, study_id) = setup().await;
        let repo = EventRepository::new(db.pool());
        let event = repo
            .create(&new_event(study_id, manager_id, EventType::Fcfs))
            .await
            .unwrap();

        let mut accepted = Vec::new();
        for nickname in ["a", "b", "c"] {
            let account_id = member(&db, nickname).await;
            let enrollment = repo
                .create_enrollment_if_seat(event.id, account_id, t0())
                .await
                .unwrap();
            accepted.push(enrollment.accepted);
        }
        assert_eq!(accepted, vec![true, true, false]);

        let missing = repo.create_enrollment_if_seat(9999, manager_id, t0()).await;
        assert!(matches!(missing, Err(StudyOlleError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_fcfs_enrollments_respect_limit() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("events.db")).await.unwrap();
        let manager_id = member(&db, "manager").await;
        let study = StudyRepository::new(db.pool())
            .create(&NewStudy {
                path: "spring".to_string(),
                title: "Spring".to_string(),
                short_description: "short".to_string(),
                full_description: None,
                manager_id,
                created_at: t0(),
            })
            .await
            .unwrap();
        let event = EventRepository::new(db.pool())
            .create(&new_event(study.id, manager_id, EventType::Fcfs))
            .await
            .unwrap();

        let mut members = Vec::new();
        for i in 0..8 {
            members.push(member(&db, &format!("member{i}")).await);
        }
        let enrollments = enroll_concurrently(&db, event.id, &members).await;
        assert_eq!(enrollments.len(), 8);

        let all = EventRepository::new(db.pool()).enrollments(event.id).await.unwrap();
        assert_eq!(accepted_count(&all), 2);
    }

    /// Enroll every member from its own task against a shared pool.
    async fn enroll_concurrently(db: &Database, event_id: i64, members: &[i64]) -> Vec<Enrollment> {
        let mut handles = Vec::new();
        for &account_id in members {
            let pool = db.pool().clone();
            handles.push(tokio::spawn(async move {
                EventRepository::new(&pool)
                    .create_enrollment_if_seat(event_id, account_id, t0())
                    .await
                    .unwrap()
            }));
        }
        let mut enrollments = Vec::new();
        for handle in handles {
            enrollments.push(handle.await.unwrap());
        }
        enrollments
    }

    #[tokio::test]
    async fn test_promote_and_accept_respect_limit() {
        let (db, manager_id, study_id) = setup().await;
        let repo = EventRepository::new(db.pool());
        let event = repo
            .create(&new_event(study_id, manager_id, EventType::Confirmative))
            .await
            .unwrap();

        let mut ids = Vec::new();
        for nickname in ["a", "b", "c"] {
            let account_id = member(&db, nickname).await;
            ids.push(
                repo.create_enrollment(event.id, account_id, t0(), false)
                    .await
                    .unwrap()
                    .id,
            );
        }

        assert!(repo.accept_if_seat(ids[0]).await.unwrap());
        assert!(!repo.accept_if_seat(ids[0]).await.unwrap());
        assert!(repo.promote_first_waiting(event.id).await.unwrap().is_some());
        // Full now.
        assert!(!repo.accept_if_seat(ids[2]).await.unwrap());
        assert!(repo.promote_first_waiting(event.id).await.unwrap().is_none());

        let all = repo.enrollments(event.id).await.unwrap();
        assert_eq!(accepted_count(&all), 2);
        assert!(all.iter().find(|e| e.id == ids[1]).unwrap().accepted);
    }

    #[tokio::test]
    async fn test_delete_event_cascades_enrollments() {
        let (db, manager_id, study_id) = setup().await;
        let repo = EventRepository::new(db.pool());
        let event = repo
            .create(&new_event(study_id, manager_id, EventType::Fcfs))
            .await
            .unwrap();
        let enrollment = repo
            .create_enrollment(event.id, manager_id, t0(), true)
            .await
            .unwrap();

        assert!(repo.delete(event.id).await.unwrap());
        assert!(repo.get_enrollment(enrollment.id).await.unwrap().is_none());
    }
}
