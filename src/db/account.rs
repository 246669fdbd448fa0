//! Account model and repository.
//!
//! An account is the aggregate root for its tag and zone preference joins.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use super::tag::Tag;
use super::zone::Zone;
use crate::{Result, StudyOlleError};

/// Minimum time between two verification or login emails.
pub const CONFIRM_EMAIL_INTERVAL_MINUTES: i64 = 60;

/// A registered member.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID.
    pub id: i64,
    /// Email address (unique).
    pub email: String,
    /// Display name (unique).
    pub nickname: String,
    /// Password hash (Argon2 PHC string).
    #[serde(skip_serializing)]
    pub password: String,
    /// Whether the email address was confirmed.
    pub email_verified: bool,
    /// Last token sent by email.
    #[serde(skip_serializing)]
    pub email_check_token: Option<String>,
    /// When the last token was generated.
    pub email_check_token_generated_at: Option<DateTime<Utc>>,
    /// When sign-up completed.
    pub joined_at: Option<DateTime<Utc>>,
    pub bio: Option<String>,
    pub url: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
    /// Profile image as a data URL.
    pub profile_image: Option<String>,
    pub study_created_by_email: bool,
    pub study_created_by_web: bool,
    pub study_enrollment_result_by_email: bool,
    pub study_enrollment_result_by_web: bool,
    pub study_updated_by_email: bool,
    pub study_updated_by_web: bool,
}

impl Account {
    /// Check a candidate token against the stored one (exact match).
    pub fn is_valid_email_token(&self, token: &str) -> bool {
        self.email_check_token.as_deref() == Some(token)
    }

    /// Whether another verification or login email may be sent at `now`.
    ///
    /// True when no token was ever generated, or the last one is at least
    /// an hour old.
    pub fn can_send_confirm_email(&self, now: DateTime<Utc>) -> bool {
        match self.email_check_token_generated_at {
            None => true,
            Some(generated_at) => {
                generated_at <= now - Duration::minutes(CONFIRM_EMAIL_INTERVAL_MINUTES)
            }
        }
    }

    /// Current notification preferences.
    pub fn notifications(&self) -> Notifications {
        Notifications {
            study_created_by_email: self.study_created_by_email,
            study_created_by_web: self.study_created_by_web,
            study_enrollment_result_by_email: self.study_enrollment_result_by_email,
            study_enrollment_result_by_web: self.study_enrollment_result_by_web,
            study_updated_by_email: self.study_updated_by_email,
            study_updated_by_web: self.study_updated_by_web,
        }
    }

    /// Current profile fields.
    pub fn profile(&self) -> ProfileUpdate {
        ProfileUpdate {
            bio: self.bio.clone(),
            url: self.url.clone(),
            occupation: self.occupation.clone(),
            location: self.location.clone(),
            profile_image: self.profile_image.clone(),
        }
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Account {}

/// Data for creating a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub nickname: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password: String,
}

impl NewAccount {
    /// Create a new account record.
    pub fn new(
        email: impl Into<String>,
        nickname: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            nickname: nickname.into(),
            password: password_hash.into(),
        }
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub url: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
    pub profile_image: Option<String>,
}

/// Notification preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    #[serde(default)]
    pub study_created_by_email: bool,
    #[serde(default)]
    pub study_created_by_web: bool,
    #[serde(default)]
    pub study_enrollment_result_by_email: bool,
    #[serde(default)]
    pub study_enrollment_result_by_web: bool,
    #[serde(default)]
    pub study_updated_by_email: bool,
    #[serde(default)]
    pub study_updated_by_web: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            study_created_by_email: false,
            study_created_by_web: true,
            study_enrollment_result_by_email: false,
            study_enrollment_result_by_web: true,
            study_updated_by_email: false,
            study_updated_by_web: true,
        }
    }
}

/// Repository for account CRUD and preference joins.
pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new AccountRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new unverified account.
    ///
    /// Returns the created account with the assigned ID.
    pub async fn create(&self, new_account: &NewAccount) -> Result<Account> {
        let result =
            sqlx::query("INSERT INTO accounts (email, nickname, password) VALUES (?, ?, ?)")
                .bind(&new_account.email)
                .bind(&new_account.nickname)
                .bind(&new_account.password)
                .execute(self.pool)
                .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StudyOlleError::NotFound("account".to_string()))
    }

    /// Get an account by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(account)
    }

    /// Get an account by email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(account)
    }

    /// Get an account by nickname.
    pub async fn find_by_nickname(&self, nickname: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE nickname = ?")
            .bind(nickname)
            .fetch_optional(self.pool)
            .await?;
        Ok(account)
    }

    /// Check whether an email is already registered.
    pub async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?)")
                .bind(email)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Check whether a nickname is already taken.
    pub async fn exists_by_nickname(&self, nickname: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE nickname = ?)")
                .bind(nickname)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Count all accounts.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Insert an unverified account together with its first email token.
    ///
    /// Runs on the caller's connection so the insert can share a
    /// transaction with the verification mail. Returns the new ID.
    pub async fn insert_with_token(
        conn: &mut SqliteConnection,
        new_account: &NewAccount,
        token: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO accounts (email, nickname, password,
                email_check_token, email_check_token_generated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new_account.email)
        .bind(&new_account.nickname)
        .bind(&new_account.password)
        .bind(token)
        .bind(generated_at)
        .execute(conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Replace the email check token only if it still equals `expected`.
    ///
    /// Returns false when another request replaced the token first.
    pub async fn replace_email_check_token(
        &self,
        id: i64,
        expected: Option<&str>,
        token: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::swap_email_check_token(&mut conn, id, expected, token, generated_at).await
    }

    /// Compare-and-set of the email check token on the caller's connection.
    pub async fn swap_email_check_token(
        conn: &mut SqliteConnection,
        id: i64,
        expected: Option<&str>,
        token: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET email_check_token = ?, email_check_token_generated_at = ?
             WHERE id = ? AND email_check_token IS ?",
        )
        .bind(token)
        .bind(generated_at)
        .bind(id)
        .bind(expected)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark the account verified.
    ///
    /// Returns false (and keeps the first `joined_at`) when it already was.
    pub async fn complete_sign_up(&self, id: i64, joined_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET email_verified = 1, joined_at = ?
             WHERE id = ? AND email_verified = 0",
        )
        .bind(joined_at)
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the profile fields.
    pub async fn update_profile(&self, id: i64, profile: &ProfileUpdate) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET bio = ?, url = ?, occupation = ?, location = ?, profile_image = ?
             WHERE id = ?",
        )
        .bind(&profile.bio)
        .bind(&profile.url)
        .bind(&profile.occupation)
        .bind(&profile.location)
        .bind(&profile.profile_image)
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Store a new password hash.
    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE accounts SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Overwrite the notification flags.
    pub async fn update_notifications(&self, id: i64, notifications: &Notifications) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET
                study_created_by_email = ?, study_created_by_web = ?,
                study_enrollment_result_by_email = ?, study_enrollment_result_by_web = ?,
                study_updated_by_email = ?, study_updated_by_web = ?
             WHERE id = ?",
        )
        .bind(notifications.study_created_by_email)
        .bind(notifications.study_created_by_web)
        .bind(notifications.study_enrollment_result_by_email)
        .bind(notifications.study_enrollment_result_by_web)
        .bind(notifications.study_updated_by_email)
        .bind(notifications.study_updated_by_web)
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Change the nickname.
    pub async fn update_nickname(&self, id: i64, nickname: &str) -> Result<()> {
        sqlx::query("UPDATE accounts SET nickname = ? WHERE id = ?")
            .bind(nickname)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Attach a tag. Returns false if it was already attached.
    pub async fn add_tag(&self, account_id: i64, tag_id: i64) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO account_tags (account_id, tag_id) VALUES (?, ?)")
                .bind(account_id)
                .bind(tag_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Detach a tag. Returns false if it was not attached.
    pub async fn remove_tag(&self, account_id: i64, tag_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM account_tags WHERE account_id = ? AND tag_id = ?")
            .bind(account_id)
            .bind(tag_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Tags attached to the account, in the order they were added.
    pub async fn tags_of(&self, account_id: i64) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.title FROM tags t
             JOIN account_tags j ON j.tag_id = t.id
             WHERE j.account_id = ?
             ORDER BY j.id",
        )
        .bind(account_id)
        .fetch_all(self.pool)
        .await?;
        Ok(tags)
    }

    /// Attach a zone. Returns false if it was already attached.
    pub async fn add_zone(&self, account_id: i64, zone_id: i64) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO account_zones (account_id, zone_id) VALUES (?, ?)")
                .bind(account_id)
                .bind(zone_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Detach a zone. Returns false if it was not attached.
    pub async fn remove_zone(&self, account_id: i64, zone_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM account_zones WHERE account_id = ? AND zone_id = ?")
            .bind(account_id)
            .bind(zone_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Zones attached to the account, in the order they were added.
    pub async fn zones_of(&self, account_id: i64) -> Result<Vec<Zone>> {
        let zones = sqlx::query_as::<_, Zone>(
            "SELECT z.id, z.city, z.local_name_of_city, z.province FROM zones z
             JOIN account_zones az ON az.zone_id = z.id
             WHERE az.account_id = ?
             ORDER BY az.id",
        )
        .bind(account_id)
        .fetch_all(self.pool)
        .await?;
        Ok(zones)
    }
}
