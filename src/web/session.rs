//! Session cookies and the principal extractors.
//!
//! Logging in signs a JWT for the [`UserAccount`] and stores it in the
//! HTTP-only `SESSION` cookie. Handlers receive the principal through
//! [`CurrentUser`] or [`OptionalUser`]; nothing is kept in process-wide
//! state.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::account::UserAccount;
use crate::db::Account;

use super::error::ApiError;
use super::handlers::AppState;

pub const SESSION_COOKIE: &str = "SESSION";

/// Where unauthenticated requests for protected pages are sent.
pub const LOGIN_PATH: &str = "/login";

/// Claims of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account ID.
    pub sub: i64,
    pub nickname: String,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_secs: u64,
    secure_cookie: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, expiry_secs: u64, secure_cookie: bool) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry_secs,
            secure_cookie,
        }
    }

    /// Sign a session token for `principal`.
    pub fn issue(&self, principal: &UserAccount) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = SessionClaims {
            sub: principal.account_id,
            nickname: principal.nickname.clone(),
            role: principal.role.clone(),
            iat: now,
            exp: now + self.expiry_secs,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign session token: {}", e);
            ApiError::internal("Failed to create session")
        })
    }

    /// The principal of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<UserAccount> {
        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(UserAccount {
                account_id: data.claims.sub,
                nickname: data.claims.nickname,
                role: data.claims.role,
            }),
            Err(e) => {
                tracing::debug!("Session token rejected: {}", e);
                None
            }
        }
    }

    /// Log `account` in by installing a fresh session cookie.
    pub fn login(&self, jar: CookieJar, account: &Account) -> Result<CookieJar, ApiError> {
        let principal = UserAccount::from(account);
        let token = self.issue(&principal)?;
        tracing::info!(account_id = account.id, nickname = %account.nickname, "Logged in");

        let cookie = Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .build();
        Ok(jar.add(cookie))
    }

    /// Drop the session cookie.
    pub fn logout(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    fn principal_from(&self, parts: &Parts) -> Option<UserAccount> {
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(SESSION_COOKIE)?;
        self.verify(cookie.value())
    }
}

/// The logged-in member, with their account freshly loaded.
///
/// Requests without a valid session are redirected to `/login`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub principal: UserAccount,
    pub account: Account,
}

/// The logged-in member, if any.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

async fn load_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, ApiError> {
    let Some(principal) = state.sessions.principal_from(parts) else {
        return Ok(None);
    };
    // A token can outlive its account.
    let account = state.accounts.get_by_id(principal.account_id).await?;
    Ok(account.map(|account| CurrentUser {
        principal: UserAccount::from(&account),
        account,
    }))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match load_user(parts, state).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(Redirect::to(LOGIN_PATH).into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        load_user(parts, state)
            .await
            .map(OptionalUser)
            .map_err(IntoResponse::into_response)
    }
}
