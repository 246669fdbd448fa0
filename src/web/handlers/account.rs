//! Sign-up, email verification, login and profile pages.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::account::{EmailCheck, FieldErrors, ResendOutcome, SignUpForm, SignUpValidator};
use crate::web::flash;
use crate::StudyOlleError;
use crate::web::session::{CurrentUser, OptionalUser};
use crate::web::view::View;

use super::{redirect, AppState, HandlerResult};

const SIGN_UP_VIEW: &str = "account/sign-up";
const CHECKED_EMAIL_VIEW: &str = "account/checked-email";
const CHECK_EMAIL_VIEW: &str = "account/check-email";
const EMAIL_LOGIN_VIEW: &str = "account/email-login";
const LOGGED_IN_BY_EMAIL_VIEW: &str = "account/logged-in-by-email";
const LOGIN_VIEW: &str = "account/login";
const PROFILE_VIEW: &str = "account/profile";

/// `token` and `email` of a mailed link.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailLoginForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    /// Email or nickname.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /sign-up
pub async fn sign_up_form() -> View {
    View::new(SIGN_UP_VIEW).with("sign_up_form", SignUpForm::default())
}

/// POST /sign-up
pub async fn sign_up_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SignUpForm>,
) -> HandlerResult {
    let mut errors = form.field_errors();
    if errors.is_empty() {
        errors.merge(
            SignUpValidator::new(state.pool())
                .validate(&form.email, &form.nickname)
                .await?,
        );
    }
    if !errors.is_empty() {
        return Ok(sign_up_rejected(&form, errors));
    }

    let account = match state.accounts.process_new_account(&form).await {
        Ok(account) => account,
        Err(StudyOlleError::Duplicate(cause)) => {
            // Another sign-up took the email or nickname after validation.
            tracing::info!(email = %form.email, %cause, "Sign-up lost a uniqueness race");
            let errors = SignUpValidator::new(state.pool())
                .validate(&form.email, &form.nickname)
                .await?;
            return Ok(sign_up_rejected(&form, errors));
        }
        Err(e) => return Err(e.into()),
    };
    let jar = state.sessions.login(jar, &account)?;
    Ok((jar, redirect("/")).into_response())
}

fn sign_up_rejected(form: &SignUpForm, errors: FieldErrors) -> Response {
    View::new(SIGN_UP_VIEW)
        .with("sign_up_form", form)
        .with_errors(errors)
        .into_response()
}

/// GET /check-email-token?token&email
pub async fn check_email_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TokenQuery>,
) -> HandlerResult {
    let view = View::new(CHECKED_EMAIL_VIEW);
    match state
        .accounts
        .check_email_token(&query.email, &query.token)
        .await?
    {
        EmailCheck::WrongEmail => Ok(view.with_error("wrong.email").into_response()),
        EmailCheck::WrongToken => Ok(view.with_error("wrong.token").into_response()),
        EmailCheck::Verified(account) => {
            let number_of_user = state.accounts.count().await?;
            let jar = state.sessions.login(jar, &account)?;
            let view = view
                .with("number_of_user", number_of_user)
                .with("nickname", &account.nickname);
            Ok((jar, view).into_response())
        }
    }
}

/// GET /check-email
pub async fn check_email(user: CurrentUser) -> View {
    View::new(CHECK_EMAIL_VIEW).with("email", &user.account.email)
}

/// GET /resend-confirm-email
pub async fn resend_confirm_email(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> HandlerResult {
    match state.accounts.resend_confirm_email(&user.account).await? {
        ResendOutcome::Sent => Ok(redirect("/")),
        ResendOutcome::RateLimited => Ok(View::new(CHECK_EMAIL_VIEW)
            .with_error("인증 이메일은 1시간에 한번만 전송할 수 있습니다.")
            .with("email", &user.account.email)
            .into_response()),
    }
}

/// GET /email-login
pub async fn email_login_form(jar: CookieJar) -> impl IntoResponse {
    let (jar, message) = flash::take(jar);
    (jar, View::new(EMAIL_LOGIN_VIEW).with_flash(message))
}

/// POST /email-login
pub async fn email_login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<EmailLoginForm>,
) -> HandlerResult {
    let view = View::new(EMAIL_LOGIN_VIEW);
    let Some(account) = state.accounts.find_by_email(form.email.trim()).await? else {
        return Ok(view
            .with_error("유효한 이메일 주소가 아닙니다.")
            .into_response());
    };

    match state.accounts.send_login_link(&account).await? {
        ResendOutcome::RateLimited => Ok(view
            .with_error("이메일 로그인은 1시간 뒤에 사용할 수 있습니다.")
            .into_response()),
        ResendOutcome::Sent => {
            let jar = flash::set(jar, "인증 이메일을 발송하였습니다.");
            Ok((jar, redirect("/email-login")).into_response())
        }
    }
}

/// GET /login-by-email?token&email
pub async fn login_by_email(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TokenQuery>,
) -> HandlerResult {
    let view = View::new(LOGGED_IN_BY_EMAIL_VIEW);
    match state
        .accounts
        .login_by_email(&query.email, &query.token)
        .await?
    {
        Some(account) => {
            let jar = state.sessions.login(jar, &account)?;
            Ok((jar, view).into_response())
        }
        None => Ok(view.with_error("로그인 할 수 없습니다.").into_response()),
    }
}

/// GET /login
pub async fn login_form(OptionalUser(user): OptionalUser, jar: CookieJar) -> HandlerResult {
    if user.is_some() {
        return Ok(redirect("/"));
    }
    let (jar, message) = flash::take(jar);
    Ok((jar, View::new(LOGIN_VIEW).with_flash(message)).into_response())
}

/// POST /login
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> HandlerResult {
    match state
        .accounts
        .authenticate(form.username.trim(), &form.password)
        .await?
    {
        Some(account) => {
            let jar = state.sessions.login(jar, &account)?;
            Ok((jar, redirect("/")).into_response())
        }
        None => {
            tracing::info!(username = %form.username, "Password login failed");
            Ok(View::new(LOGIN_VIEW)
                .with("username", &form.username)
                .with_error("이메일(닉네임) 또는 패스워드가 정확하지 않습니다.")
                .into_response())
        }
    }
}

/// POST /logout
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    (state.sessions.logout(jar), redirect("/"))
}

/// GET /profile/:nickname
pub async fn profile(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Path(nickname): Path<String>,
) -> HandlerResult {
    let Some(account) = state.accounts.find_by_nickname(&nickname).await? else {
        let message = format!("{nickname}에 해당하는 사용자가 없습니다.");
        return Ok(View::error_page(message).into_response());
    };

    let is_owner = user.is_some_and(|u| u.principal.is(&account));
    let tags = state.accounts.tags_of(&account).await?;
    let zones: Vec<String> = state
        .accounts
        .zones_of(&account)
        .await?
        .iter()
        .map(ToString::to_string)
        .collect();

    Ok(View::new(PROFILE_VIEW)
        .with("account", &account)
        .with("is_owner", is_owner)
        .with(
            "tags",
            tags.into_iter().map(|t| t.title).collect::<Vec<_>>(),
        )
        .with("zones", zones)
        .into_response())
}
