//! Shared helpers for the HTTP integration tests.
//!
//! Each test gets its own in-memory database, an in-memory mailer and a
//! manual clock, wired into the real router.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use studyolle::db::{AccountRepository, ZoneRepository};
use studyolle::web::create_router;
use studyolle::{
    Account, AppState, Database, EmailMessage, InMemoryEmailSender, ManualClock, SessionKeys,
};

pub const PASSWORD: &str = "12345678";

/// Wall-clock time every test starts at.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 13, 9, 0, 0).unwrap()
}

pub struct TestApp {
    pub server: TestServer,
    pub mailer: Arc<InMemoryEmailSender>,
    pub clock: Arc<ManualClock>,
    pub db: Database,
}

/// Build the application over a fresh database.
pub async fn spawn_app() -> TestApp {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    ZoneRepository::new(db.pool())
        .seed_defaults()
        .await
        .expect("Failed to seed zones");

    let mailer = Arc::new(InMemoryEmailSender::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let state = AppState::new(
        db.pool().clone(),
        mailer.clone(),
        clock.clone(),
        "http://localhost:8080",
        SessionKeys::new("test-secret-key-for-testing-only", 3600, false),
    );

    let server = TestServer::builder()
        .save_cookies()
        .build(create_router(Arc::new(state), &[]))
        .expect("Failed to create test server");

    TestApp {
        server,
        mailer,
        clock,
        db,
    }
}

impl TestApp {
    /// Submit the sign-up form. A valid submission also logs in.
    pub async fn sign_up(&self, nickname: &str, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/sign-up")
            .form(&[
                ("nickname", nickname),
                ("email", email),
                ("password", password),
            ])
            .await
    }

    /// Sign up with the default password and expect success.
    pub async fn member(&self, nickname: &str) -> Account {
        let email = format!("{nickname}@email.com");
        let response = self.sign_up(nickname, &email, PASSWORD).await;
        assert_redirect(&response, "/");
        self.account(&email).await.expect("account was created")
    }

    /// Password login (replaces the current session).
    pub async fn login(&self, username: &str) {
        let response = self
            .server
            .post("/login")
            .form(&[("username", username), ("password", PASSWORD)])
            .await;
        assert_redirect(&response, "/");
    }

    pub async fn account(&self, email: &str) -> Option<Account> {
        AccountRepository::new(self.db.pool())
            .find_by_email(email)
            .await
            .expect("account lookup")
    }

    /// The most recent email sent to `to`.
    pub fn last_mail(&self, to: &str) -> EmailMessage {
        self.mailer
            .sent_to(to)
            .pop()
            .unwrap_or_else(|| panic!("no mail sent to {to}"))
    }
}

/// Pull the `token` query parameter out of a mailed link.
pub fn token_from(body: &str) -> String {
    let start = body.find("token=").expect("link has a token") + "token=".len();
    let rest = &body[start..];
    let end = rest.find(['&', '\n']).unwrap_or(rest.len());
    urlencoding::decode(&rest[..end]).unwrap().into_owned()
}

pub fn assert_redirect(response: &TestResponse, to: &str) {
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location").to_str().unwrap(), to);
}

/// Parse a view document and check its name.
pub fn view(response: &TestResponse, name: &str) -> Value {
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["view"], name, "unexpected view document: {body}");
    body
}
