//! Settings pages: profile, password, notifications, nickname, tags and
//! zones.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::account::{
    NicknameForm, PasswordChange, PasswordForm, ProfileForm, TagForm, ZoneForm,
};
use crate::db::{Notifications, TagRepository, ZoneRepository};
use crate::web::error::ApiError;
use crate::web::flash;
use crate::web::session::CurrentUser;
use crate::web::view::{View, MESSAGE_KEY};

use super::{redirect, AppState, HandlerResult};

const PROFILE_VIEW: &str = "settings/profile";
const PASSWORD_VIEW: &str = "settings/password";
const NOTIFICATIONS_VIEW: &str = "settings/notifications";
const ACCOUNT_VIEW: &str = "settings/account";
const TAGS_VIEW: &str = "settings/tags";
const ZONES_VIEW: &str = "settings/zones";

const PROFILE_URL: &str = "/settings/profile";
const PASSWORD_URL: &str = "/settings/password";
const NOTIFICATIONS_URL: &str = "/settings/notifications";
const ACCOUNT_URL: &str = "/settings/account";

/// GET /settings/profile
pub async fn profile_form(user: CurrentUser, jar: CookieJar) -> impl IntoResponse {
    let (jar, message) = flash::take(jar);
    let view = View::new(PROFILE_VIEW)
        .with("account", &user.account)
        .with("profile", ProfileForm::from(&user.account))
        .with_flash(message);
    (jar, view)
}

/// POST /settings/profile
pub async fn profile_submit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> HandlerResult {
    let errors = form.field_errors();
    if !errors.is_empty() {
        return Ok(View::new(PROFILE_VIEW)
            .with("account", &user.account)
            .with("profile", &form)
            .with_errors(errors)
            .into_response());
    }

    state.accounts.update_profile(&user.account, form).await?;
    let jar = flash::set(jar, "프로필을 수정하였습니다.");
    Ok((jar, redirect(PROFILE_URL)).into_response())
}

/// GET /settings/password
pub async fn password_form(user: CurrentUser, jar: CookieJar) -> impl IntoResponse {
    let (jar, message) = flash::take(jar);
    let view = View::new(PASSWORD_VIEW)
        .with("account", &user.account)
        .with_flash(message);
    (jar, view)
}

/// POST /settings/password
pub async fn password_submit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<PasswordForm>,
) -> HandlerResult {
    let view = View::new(PASSWORD_VIEW).with("account", &user.account);

    let errors = form.field_errors();
    if !errors.is_empty() {
        return Ok(view.with_errors(errors).into_response());
    }

    match state
        .accounts
        .update_password(&user.account, &form.new_password)
        .await?
    {
        PasswordChange::SameAsCurrent => Ok(view
            .with(MESSAGE_KEY, "기존 비밀번호와 동일하게 변경할 수 없습니다.")
            .into_response()),
        PasswordChange::Changed => {
            let jar = flash::set(jar, "비밀번호를 변경했습니다.");
            Ok((jar, redirect(PASSWORD_URL)).into_response())
        }
    }
}

/// GET /settings/notifications
pub async fn notifications_form(user: CurrentUser, jar: CookieJar) -> impl IntoResponse {
    let (jar, message) = flash::take(jar);
    let view = View::new(NOTIFICATIONS_VIEW)
        .with("account", &user.account)
        .with("notifications", user.account.notifications())
        .with_flash(message);
    (jar, view)
}

/// POST /settings/notifications
///
/// Unchecked boxes are absent from the form and read as `false`.
pub async fn notifications_submit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    Form(notifications): Form<Notifications>,
) -> HandlerResult {
    state
        .accounts
        .update_notifications(&user.account, &notifications)
        .await?;
    let jar = flash::set(jar, "알림 설정이 수정되었습니다.");
    Ok((jar, redirect(NOTIFICATIONS_URL)).into_response())
}

/// GET /settings/account
pub async fn account_form(user: CurrentUser, jar: CookieJar) -> impl IntoResponse {
    let (jar, message) = flash::take(jar);
    let view = View::new(ACCOUNT_VIEW)
        .with("account", &user.account)
        .with(
            "nickname_form",
            NicknameForm {
                nickname: user.account.nickname.clone(),
            },
        )
        .with_flash(message);
    (jar, view)
}

/// POST /settings/account
///
/// The session is re-issued so the principal carries the new nickname.
pub async fn account_submit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<NicknameForm>,
) -> HandlerResult {
    let mut errors = form.field_errors();
    if errors.is_empty() && state.accounts.exists_by_nickname(&form.nickname).await? {
        errors.add("nickname", "입력하신 닉네임을 사용할 수 없습니다.");
    }
    if !errors.is_empty() {
        return Ok(View::new(ACCOUNT_VIEW)
            .with("account", &user.account)
            .with("nickname_form", &form)
            .with_errors(errors)
            .into_response());
    }

    state
        .accounts
        .update_nickname(&user.account, &form.nickname)
        .await?;
    let account = state
        .accounts
        .get_by_id(user.account.id)
        .await?
        .ok_or_else(|| ApiError::not_found("account not found"))?;

    let jar = state.sessions.login(jar, &account)?;
    let jar = flash::set(jar, "닉네임이 수정되었습니다.");
    Ok((jar, redirect(ACCOUNT_URL)).into_response())
}

/// GET /settings/tags
pub async fn tags_form(State(state): State<Arc<AppState>>, user: CurrentUser) -> HandlerResult {
    let tags: Vec<String> = state
        .accounts
        .tags_of(&user.account)
        .await?
        .into_iter()
        .map(|t| t.title)
        .collect();
    let whitelist = TagRepository::new(state.pool()).list_titles().await?;

    Ok(View::new(TAGS_VIEW)
        .with("account", &user.account)
        .with("tags", tags)
        .with("whitelist", whitelist)
        .into_response())
}

/// POST /settings/tags/add
pub async fn add_tag(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(form): Json<TagForm>,
) -> Result<StatusCode, ApiError> {
    let title = form.tag_title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("tag title is required"));
    }
    state.accounts.add_tag(&user.account, title).await?;
    Ok(StatusCode::OK)
}

/// POST /settings/tags/remove
pub async fn remove_tag(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(form): Json<TagForm>,
) -> Result<StatusCode, ApiError> {
    if state
        .accounts
        .remove_tag(&user.account, form.tag_title.trim())
        .await?
    {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::bad_request("unknown tag"))
    }
}

/// GET /settings/zones
pub async fn zones_form(State(state): State<Arc<AppState>>, user: CurrentUser) -> HandlerResult {
    let zones: Vec<String> = state
        .accounts
        .zones_of(&user.account)
        .await?
        .iter()
        .map(ToString::to_string)
        .collect();
    let whitelist: Vec<String> = ZoneRepository::new(state.pool())
        .list_all()
        .await?
        .iter()
        .map(ToString::to_string)
        .collect();

    Ok(View::new(ZONES_VIEW)
        .with("account", &user.account)
        .with("zones", zones)
        .with("whitelist", whitelist)
        .into_response())
}

/// POST /settings/zones/add
pub async fn add_zone(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(form): Json<ZoneForm>,
) -> Result<StatusCode, ApiError> {
    let zone = form
        .parse()
        .ok_or_else(|| ApiError::bad_request("malformed zone name"))?;
    if state.accounts.add_zone(&user.account, &zone).await? {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::bad_request("unknown zone"))
    }
}

/// POST /settings/zones/remove
pub async fn remove_zone(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(form): Json<ZoneForm>,
) -> Result<StatusCode, ApiError> {
    let zone = form
        .parse()
        .ok_or_else(|| ApiError::bad_request("malformed zone name"))?;
    if state.accounts.remove_zone(&user.account, &zone).await? {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::bad_request("unknown zone"))
    }
}
