//! Study, event and enrollment pages.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Form,
};
use axum_extra::extract::cookie::CookieJar;

use crate::db::Study;
use crate::study::{EnrollOutcome, EventForm, StudyForm, StudyPathForm};
use crate::web::error::ApiError;
use crate::web::flash;
use crate::web::session::{CurrentUser, OptionalUser};
use crate::web::view::View;

use super::{redirect, AppState, HandlerResult};

const STUDY_FORM_VIEW: &str = "study/form";
const STUDY_VIEW: &str = "study/view";
const STUDY_SETTINGS_VIEW: &str = "study/settings";
const EVENT_FORM_VIEW: &str = "event/form";
const EVENT_VIEW: &str = "event/view";

const PATH_TAKEN_MESSAGE: &str = "해당 스터디 경로값을 사용할 수 없습니다.";

fn study_url(path: &str) -> String {
    format!("/study/{}", urlencoding::encode(path))
}

fn event_url(study: &Study, event_id: i64) -> String {
    format!("{}/events/{}", study_url(&study.path), event_id)
}

fn study_not_found(path: &str) -> View {
    View::error_page(format!("{path}에 해당하는 스터디가 없습니다."))
}

fn event_not_found(event_id: i64) -> View {
    View::error_page(format!("{event_id}에 해당하는 모임이 없습니다."))
}

/// GET /new-study
pub async fn new_study_form(user: CurrentUser) -> View {
    View::new(STUDY_FORM_VIEW)
        .with("account", &user.account)
        .with("study_form", StudyForm::default())
}

/// POST /new-study
pub async fn new_study_submit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Form(form): Form<StudyForm>,
) -> HandlerResult {
    let mut errors = form.field_errors();
    if !errors.has("path") && state.studies.is_path_taken(&form.path).await? {
        errors.add("path", PATH_TAKEN_MESSAGE);
    }
    if !errors.is_empty() {
        return Ok(View::new(STUDY_FORM_VIEW)
            .with("account", &user.account)
            .with("study_form", &form)
            .with_errors(errors)
            .into_response());
    }

    let study = state.studies.create_study(&form, user.account.id).await?;
    Ok(redirect(&study_url(&study.path)))
}

/// GET /study/:path
pub async fn view_study(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
    Path(path): Path<String>,
) -> HandlerResult {
    let Some(study) = state.studies.find_by_path(&path).await? else {
        return Ok(study_not_found(&path).into_response());
    };
    let events = state.studies.events_of(&study).await?;
    let is_manager = user
        .as_ref()
        .is_some_and(|u| study.is_manager(u.account.id));

    let (jar, message) = flash::take(jar);
    let mut view = View::new(STUDY_VIEW)
        .with("study", &study)
        .with("events", events)
        .with("is_manager", is_manager)
        .with_flash(message);
    if let Some(user) = user {
        view = view.with("account", &user.account);
    }
    Ok((jar, view).into_response())
}

/// POST /study/:path/settings/path
pub async fn update_study_path(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    Path(path): Path<String>,
    Form(form): Form<StudyPathForm>,
) -> HandlerResult {
    let Some(study) = state.studies.find_by_path(&path).await? else {
        return Ok(study_not_found(&path).into_response());
    };
    if !study.is_manager(user.account.id) {
        return Err(ApiError::forbidden("only the study manager can do this"));
    }

    let mut errors = form.field_errors();
    if errors.is_empty() && state.studies.is_path_taken(&form.new_path).await? {
        errors.add("new_path", PATH_TAKEN_MESSAGE);
    }
    if !errors.is_empty() {
        return Ok(View::new(STUDY_SETTINGS_VIEW)
            .with("account", &user.account)
            .with("study", &study)
            .with_errors(errors)
            .into_response());
    }

    state
        .studies
        .update_study_path(&study, user.account.id, &form.new_path)
        .await?;
    let jar = flash::set(jar, "스터디 경로를 수정했습니다.");
    Ok((jar, redirect(&study_url(&form.new_path))).into_response())
}

/// GET /study/:path/new-event
pub async fn new_event_form(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(path): Path<String>,
) -> HandlerResult {
    let Some(study) = state.studies.find_by_path(&path).await? else {
        return Ok(study_not_found(&path).into_response());
    };
    if !study.is_manager(user.account.id) {
        return Err(ApiError::forbidden("only the study manager can do this"));
    }

    Ok(View::new(EVENT_FORM_VIEW)
        .with("account", &user.account)
        .with("study", &study)
        .into_response())
}

/// POST /study/:path/new-event
pub async fn new_event_submit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(path): Path<String>,
    Form(form): Form<EventForm>,
) -> HandlerResult {
    let Some(study) = state.studies.find_by_path(&path).await? else {
        return Ok(study_not_found(&path).into_response());
    };
    if !study.is_manager(user.account.id) {
        return Err(ApiError::forbidden("only the study manager can do this"));
    }

    let details = match form.parse(state.studies.now()) {
        Ok(details) => details,
        Err(errors) => {
            return Ok(View::new(EVENT_FORM_VIEW)
                .with("account", &user.account)
                .with("study", &study)
                .with("event_form", &form)
                .with_errors(errors)
                .into_response());
        }
    };

    let event = state
        .studies
        .create_event(&study, &details, user.account.id)
        .await?;
    Ok(redirect(&event_url(&study, event.id)))
}

/// GET /study/:path/events/:id
pub async fn view_event(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
    Path((path, event_id)): Path<(String, i64)>,
) -> HandlerResult {
    let Some(study) = state.studies.find_by_path(&path).await? else {
        return Ok(study_not_found(&path).into_response());
    };
    let Some(event) = state.studies.find_event(&study, event_id).await? else {
        return Ok(event_not_found(event_id).into_response());
    };
    let enrollments = state.studies.enrollments_of(&event).await?;

    let (is_manager, is_enrolled) = match &user {
        Some(u) => (
            study.is_manager(u.account.id),
            enrollments.iter().any(|e| e.account_id == u.account.id),
        ),
        None => (false, false),
    };

    let (jar, message) = flash::take(jar);
    let mut view = View::new(EVENT_VIEW)
        .with("study", &study)
        .with(
            "enrollment_open",
            event.is_enrollment_open(state.studies.now()),
        )
        .with("event", &event)
        .with("enrollments", enrollments)
        .with("is_manager", is_manager)
        .with("is_enrolled", is_enrolled)
        .with_flash(message);
    if let Some(user) = user {
        view = view.with("account", &user.account);
    }
    Ok((jar, view).into_response())
}

/// POST /study/:path/events/:id/enroll
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    Path((path, event_id)): Path<(String, i64)>,
) -> HandlerResult {
    let Some(study) = state.studies.find_by_path(&path).await? else {
        return Ok(study_not_found(&path).into_response());
    };
    let Some(event) = state.studies.find_event(&study, event_id).await? else {
        return Ok(event_not_found(event_id).into_response());
    };

    let jar = match state.studies.enroll(&event, user.account.id).await? {
        EnrollOutcome::Enrolled(_) => jar,
        EnrollOutcome::AlreadyEnrolled => flash::set(jar, "이미 참가 신청한 모임입니다."),
        EnrollOutcome::Closed => flash::set(jar, "참가 신청이 마감된 모임입니다."),
    };
    Ok((jar, redirect(&event_url(&study, event.id))).into_response())
}

/// POST /study/:path/events/:id/disenroll
pub async fn disenroll(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((path, event_id)): Path<(String, i64)>,
) -> HandlerResult {
    let Some(study) = state.studies.find_by_path(&path).await? else {
        return Ok(study_not_found(&path).into_response());
    };
    let Some(event) = state.studies.find_event(&study, event_id).await? else {
        return Ok(event_not_found(event_id).into_response());
    };

    state.studies.disenroll(&event, user.account.id).await?;
    Ok(redirect(&event_url(&study, event.id)))
}

/// POST /study/:path/events/:id/enrollments/:eid/accept
pub async fn accept_enrollment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((path, event_id, enrollment_id)): Path<(String, i64, i64)>,
) -> HandlerResult {
    manage_enrollment(&state, &user, &path, event_id, enrollment_id, true).await
}

/// POST /study/:path/events/:id/enrollments/:eid/reject
pub async fn reject_enrollment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((path, event_id, enrollment_id)): Path<(String, i64, i64)>,
) -> HandlerResult {
    manage_enrollment(&state, &user, &path, event_id, enrollment_id, false).await
}

async fn manage_enrollment(
    state: &AppState,
    user: &CurrentUser,
    path: &str,
    event_id: i64,
    enrollment_id: i64,
    accept: bool,
) -> HandlerResult {
    let Some(study) = state.studies.find_by_path(path).await? else {
        return Ok(study_not_found(path).into_response());
    };
    let Some(event) = state.studies.find_event(&study, event_id).await? else {
        return Ok(event_not_found(event_id).into_response());
    };

    if accept {
        state
            .studies
            .accept_enrollment(&study, &event, enrollment_id, user.account.id)
            .await?;
    } else {
        state
            .studies
            .reject_enrollment(&study, &event, enrollment_id, user.account.id)
            .await?;
    }
    Ok(redirect(&event_url(&study, event.id)))
}
