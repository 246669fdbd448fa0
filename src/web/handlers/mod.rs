//! Request handlers.

pub mod account;
pub mod index;
pub mod settings;
pub mod study;

use std::sync::Arc;

use axum::response::{IntoResponse, Redirect, Response};
use sqlx::SqlitePool;

use crate::account::AccountService;
use crate::clock::Clock;
use crate::mail::EmailSender;
use crate::study::StudyService;

use super::error::ApiError;
use super::session::SessionKeys;

/// What every handler returns.
pub type HandlerResult = Result<Response, ApiError>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub studies: StudyService,
    pub sessions: SessionKeys,
    pool: SqlitePool,
}

impl AppState {
    /// Wire the services over one pool, mailer and clock.
    pub fn new(
        pool: SqlitePool,
        mailer: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
        host: &str,
        sessions: SessionKeys,
    ) -> Self {
        Self {
            accounts: AccountService::new(pool.clone(), mailer, clock.clone(), host),
            studies: StudyService::new(pool.clone(), clock),
            sessions,
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// `303 See Other` to `to`.
pub(crate) fn redirect(to: &str) -> Response {
    Redirect::to(to).into_response()
}
