//! Tag model and repository.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{Result, StudyOlleError};

/// An interest tag. Tags are global and shared by every account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub title: String,
}

/// Repository for tags.
pub struct TagRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TagRepository<'a> {
    /// Create a new TagRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a tag.
    pub async fn create(&self, title: &str) -> Result<Tag> {
        let result = sqlx::query("INSERT INTO tags (title) VALUES (?)")
            .bind(title)
            .execute(self.pool)
            .await?;

        Ok(Tag {
            id: result.last_insert_rowid(),
            title: title.to_string(),
        })
    }

    /// Find a tag by its exact title.
    pub async fn find_by_title(&self, title: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, title FROM tags WHERE title = ?")
            .bind(title)
            .fetch_optional(self.pool)
            .await?;
        Ok(tag)
    }

    /// Return the tag with `title`, creating it first if needed.
    pub async fn find_or_create(&self, title: &str) -> Result<Tag> {
        sqlx::query("INSERT OR IGNORE INTO tags (title) VALUES (?)")
            .bind(title)
            .execute(self.pool)
            .await?;

        self.find_by_title(title)
            .await?
            .ok_or_else(|| StudyOlleError::NotFound(format!("tag {title}")))
    }

    /// List every tag title, alphabetically.
    pub async fn list_titles(&self) -> Result<Vec<String>> {
        let titles = sqlx::query_scalar("SELECT title FROM tags ORDER BY title")
            .fetch_all(self.pool)
            .await?;
        Ok(titles)
    }
}
