//! Account lifecycle service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use super::forms::{ProfileForm, SignUpForm, ZoneName};
use super::password::{self, hash_password};
use crate::clock::Clock;
use crate::db::{
    Account, AccountRepository, NewAccount, Notifications, Tag, TagRepository, Zone,
    ZoneRepository,
};
use crate::mail::{EmailMessage, EmailSender};
use crate::{Result, StudyOlleError};

/// Subject of the sign-up verification email.
pub const SIGN_UP_SUBJECT: &str = "StudyOlle, sign-up verification";

/// Subject of the email login link.
pub const EMAIL_LOGIN_SUBJECT: &str = "StudyOlle, email login link";

/// Result of a request to send a token email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    /// The last email is less than an hour old, or a concurrent request
    /// already replaced the token.
    RateLimited,
}

/// Result of a password change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordChange {
    Changed,
    /// The new password equals the current one; nothing was stored.
    SameAsCurrent,
}

/// Result of following a verification link.
#[derive(Debug, Clone, PartialEq)]
pub enum EmailCheck {
    /// The account is verified (now or before).
    Verified(Account),
    WrongEmail,
    WrongToken,
}

/// Which email a token is sent with.
#[derive(Debug, Clone, Copy)]
enum TokenMail {
    SignUp,
    Login,
}

/// Account lifecycle operations.
///
/// Cheap to clone; all clones share the pool, mailer and clock.
#[derive(Clone)]
pub struct AccountService {
    pool: SqlitePool,
    mailer: Arc<dyn EmailSender>,
    clock: Arc<dyn Clock>,
    host: String,
}

impl AccountService {
    /// Create the service. `host` prefixes the links in outgoing email.
    pub fn new(
        pool: SqlitePool,
        mailer: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            mailer,
            clock,
            host: host.into().trim_end_matches('/').to_string(),
        }
    }

    fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(&self.pool)
    }

    /// Current time from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create an account from a validated sign-up form and mail its
    /// verification link.
    ///
    /// The account is committed only once the mail is handed off, so a
    /// failed delivery leaves no account behind. A concurrent sign-up with
    /// the same email or nickname fails with `Duplicate`.
    pub async fn process_new_account(&self, form: &SignUpForm) -> Result<Account> {
        let password_hash = hash_password(&form.password)?;
        let token = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;
        let account_id = AccountRepository::insert_with_token(
            &mut tx,
            &NewAccount::new(&form.email, &form.nickname, password_hash),
            &token,
            self.now(),
        )
        .await?;
        self.send_token_mail(TokenMail::SignUp, &form.email, &token)
            .await?;
        tx.commit().await?;

        info!(
            account_id,
            email = %form.email,
            nickname = %form.nickname,
            "Account created"
        );
        self.reload(account_id).await
    }

    /// Send a fresh verification link, at most once an hour.
    pub async fn resend_confirm_email(&self, account: &Account) -> Result<ResendOutcome> {
        self.reissue_token(account.id, TokenMail::SignUp).await
    }

    /// Send a login link, at most once an hour.
    pub async fn send_login_link(&self, account: &Account) -> Result<ResendOutcome> {
        self.reissue_token(account.id, TokenMail::Login).await
    }

    /// Gate, regenerate and mail a token.
    ///
    /// The token is replaced only if it is still the one read here, so two
    /// concurrent requests cannot both pass the hourly gate. The new token
    /// is committed only after the mail is sent; a failed delivery keeps
    /// the previous token and does not start a new hour.
    async fn reissue_token(&self, account_id: i64, mail: TokenMail) -> Result<ResendOutcome> {
        let current = self.reload(account_id).await?;
        let now = self.now();

        if !current.can_send_confirm_email(now) {
            return Ok(ResendOutcome::RateLimited);
        }

        let token = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;
        let replaced = AccountRepository::swap_email_check_token(
            &mut tx,
            account_id,
            current.email_check_token.as_deref(),
            &token,
            now,
        )
        .await?;
        if !replaced {
            warn!(account_id, "Token replaced concurrently, treating as rate limited");
            return Ok(ResendOutcome::RateLimited);
        }

        self.send_token_mail(mail, &current.email, &token).await?;
        tx.commit().await?;
        Ok(ResendOutcome::Sent)
    }

    async fn send_token_mail(&self, mail: TokenMail, email: &str, token: &str) -> Result<()> {
        let (path, subject, intro) = match mail {
            TokenMail::SignUp => (
                "check-email-token",
                SIGN_UP_SUBJECT,
                "Follow the link below to finish signing up.",
            ),
            TokenMail::Login => (
                "login-by-email",
                EMAIL_LOGIN_SUBJECT,
                "Follow the link below to log in.",
            ),
        };
        let link = format!(
            "{}/{}?token={}&email={}",
            self.host,
            path,
            urlencoding::encode(token),
            urlencoding::encode(email)
        );

        self.mailer
            .send(EmailMessage {
                to: email.to_string(),
                subject: subject.to_string(),
                body: format!("{intro}\n\n{link}\n"),
            })
            .await
    }

    /// Follow a verification link.
    pub async fn check_email_token(&self, email: &str, token: &str) -> Result<EmailCheck> {
        let Some(account) = self.accounts().find_by_email(email).await? else {
            return Ok(EmailCheck::WrongEmail);
        };
        if !account.is_valid_email_token(token) {
            return Ok(EmailCheck::WrongToken);
        }

        self.complete_sign_up(&account).await?;
        Ok(EmailCheck::Verified(self.reload(account.id).await?))
    }

    /// Mark the account verified. A verified account keeps its first
    /// `joined_at`.
    pub async fn complete_sign_up(&self, account: &Account) -> Result<()> {
        if self
            .accounts()
            .complete_sign_up(account.id, self.now())
            .await?
        {
            info!(account_id = account.id, "Sign-up completed");
        }
        Ok(())
    }

    /// Follow a login link. Returns the account when the token matches.
    pub async fn login_by_email(&self, email: &str, token: &str) -> Result<Option<Account>> {
        let account = self.accounts().find_by_email(email).await?;
        Ok(account.filter(|a| a.is_valid_email_token(token)))
    }

    /// Password login by email or nickname.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Account>> {
        let account = match self.accounts().find_by_email(username).await? {
            Some(account) => Some(account),
            None => self.accounts().find_by_nickname(username).await?,
        };
        Ok(account.filter(|a| password::matches(password, &a.password)))
    }

    pub async fn update_profile(&self, account: &Account, form: ProfileForm) -> Result<()> {
        self.accounts()
            .update_profile(account.id, &form.into_update())
            .await
    }

    /// Store a new password unless it equals the current one.
    pub async fn update_password(
        &self,
        account: &Account,
        new_password: &str,
    ) -> Result<PasswordChange> {
        if password::matches(new_password, &account.password) {
            return Ok(PasswordChange::SameAsCurrent);
        }

        let password_hash = hash_password(new_password)?;
        self.accounts()
            .update_password(account.id, &password_hash)
            .await?;
        info!(account_id = account.id, "Password changed");
        Ok(PasswordChange::Changed)
    }

    pub async fn update_notifications(
        &self,
        account: &Account,
        notifications: &Notifications,
    ) -> Result<()> {
        self.accounts()
            .update_notifications(account.id, notifications)
            .await
    }

    pub async fn update_nickname(&self, account: &Account, nickname: &str) -> Result<()> {
        self.accounts().update_nickname(account.id, nickname).await?;
        info!(account_id = account.id, nickname = %nickname, "Nickname changed");
        Ok(())
    }

    /// Attach a tag by title, creating the tag if needed.
    pub async fn add_tag(&self, account: &Account, title: &str) -> Result<Tag> {
        let tag = TagRepository::new(&self.pool).find_or_create(title).await?;
        self.accounts().add_tag(account.id, tag.id).await?;
        Ok(tag)
    }

    /// Detach a tag by title. Returns false if no such tag exists.
    pub async fn remove_tag(&self, account: &Account, title: &str) -> Result<bool> {
        let Some(tag) = TagRepository::new(&self.pool).find_by_title(title).await? else {
            return Ok(false);
        };
        self.accounts().remove_tag(account.id, tag.id).await?;
        Ok(true)
    }

    /// Attach a zone. Returns false if no such zone exists.
    pub async fn add_zone(&self, account: &Account, zone: &ZoneName<'_>) -> Result<bool> {
        let Some(zone) = self.find_zone(zone).await? else {
            return Ok(false);
        };
        self.accounts().add_zone(account.id, zone.id).await?;
        Ok(true)
    }

    /// Detach a zone. Returns false if no such zone exists.
    pub async fn remove_zone(&self, account: &Account, zone: &ZoneName<'_>) -> Result<bool> {
        let Some(zone) = self.find_zone(zone).await? else {
            return Ok(false);
        };
        self.accounts().remove_zone(account.id, zone.id).await?;
        Ok(true)
    }

    async fn find_zone(&self, zone: &ZoneName<'_>) -> Result<Option<Zone>> {
        ZoneRepository::new(&self.pool)
            .find_by_city_and_province(zone.city, zone.province)
            .await
    }

    pub async fn tags_of(&self, account: &Account) -> Result<Vec<Tag>> {
        self.accounts().tags_of(account.id).await
    }

    pub async fn zones_of(&self, account: &Account) -> Result<Vec<Zone>> {
        self.accounts().zones_of(account.id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.accounts().find_by_email(email).await
    }

    pub async fn find_by_nickname(&self, nickname: &str) -> Result<Option<Account>> {
        self.accounts().find_by_nickname(nickname).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Account>> {
        self.accounts().get_by_id(id).await
    }

    pub async fn exists_by_nickname(&self, nickname: &str) -> Result<bool> {
        self.accounts().exists_by_nickname(nickname).await
    }

    /// Number of registered accounts.
    pub async fn count(&self) -> Result<i64> {
        self.accounts().count().await
    }

    async fn reload(&self, id: i64) -> Result<Account> {
        self.accounts()
            .get_by_id(id)
            .await?
            .ok_or_else(|| StudyOlleError::NotFound("account".to_string()))
    }
}
