//! Study model and repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{Result, StudyOlleError};

/// A study group. Owns its events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Study {
    pub id: i64,
    /// URL segment (unique).
    pub path: String,
    pub title: String,
    pub short_description: String,
    pub full_description: Option<String>,
    pub manager_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Study {
    /// Check whether the account manages this study.
    pub fn is_manager(&self, account_id: i64) -> bool {
        self.manager_id == account_id
    }
}

/// Data for creating a new study.
#[derive(Debug, Clone)]
pub struct NewStudy {
    pub path: String,
    pub title: String,
    pub short_description: String,
    pub full_description: Option<String>,
    pub manager_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Repository for studies.
pub struct StudyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StudyRepository<'a> {
    /// Create a new StudyRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a study.
    pub async fn create(&self, new_study: &NewStudy) -> Result<Study> {
        let result = sqlx::query(
            "INSERT INTO studies (path, title, short_description, full_description, manager_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_study.path)
        .bind(&new_study.title)
        .bind(&new_study.short_description)
        .bind(&new_study.full_description)
        .bind(new_study.manager_id)
        .bind(new_study.created_at)
        .execute(self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| StudyOlleError::NotFound("study".to_string()))
    }

    /// Get a study by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Study>> {
        let study = sqlx::query_as::<_, Study>("SELECT * FROM studies WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(study)
    }

    /// Get a study by its path.
    pub async fn find_by_path(&self, path: &str) -> Result<Option<Study>> {
        let study = sqlx::query_as::<_, Study>("SELECT * FROM studies WHERE path = ?")
            .bind(path)
            .fetch_optional(self.pool)
            .await?;
        Ok(study)
    }

    /// Check whether a path is taken.
    pub async fn exists_by_path(&self, path: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM studies WHERE path = ?)")
                .bind(path)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Change the path of a study.
    pub async fn update_path(&self, id: i64, path: &str) -> Result<()> {
        sqlx::query("UPDATE studies SET path = ? WHERE id = ?")
            .bind(path)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
