//! Route table.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{account, index, settings, study, AppState};
use super::middleware::{create_cors_layer, security_headers};

/// Build the application router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let account_routes = Router::new()
        .route(
            "/sign-up",
            get(account::sign_up_form).post(account::sign_up_submit),
        )
        .route("/check-email-token", get(account::check_email_token))
        .route("/check-email", get(account::check_email))
        .route("/resend-confirm-email", get(account::resend_confirm_email))
        .route(
            "/email-login",
            get(account::email_login_form).post(account::email_login_submit),
        )
        .route("/login-by-email", get(account::login_by_email))
        .route(
            "/login",
            get(account::login_form).post(account::login_submit),
        )
        .route("/logout", post(account::logout))
        .route("/profile/:nickname", get(account::profile));

    let settings_routes = Router::new()
        .route(
            "/profile",
            get(settings::profile_form).post(settings::profile_submit),
        )
        .route(
            "/password",
            get(settings::password_form).post(settings::password_submit),
        )
        .route(
            "/notifications",
            get(settings::notifications_form).post(settings::notifications_submit),
        )
        .route(
            "/account",
            get(settings::account_form).post(settings::account_submit),
        )
        .route("/tags", get(settings::tags_form))
        .route("/tags/add", post(settings::add_tag))
        .route("/tags/remove", post(settings::remove_tag))
        .route("/zones", get(settings::zones_form))
        .route("/zones/add", post(settings::add_zone))
        .route("/zones/remove", post(settings::remove_zone));

    let study_routes = Router::new()
        .route("/:path", get(study::view_study))
        .route("/:path/settings/path", post(study::update_study_path))
        .route(
            "/:path/new-event",
            get(study::new_event_form).post(study::new_event_submit),
        )
        .route("/:path/events/:id", get(study::view_event))
        .route("/:path/events/:id/enroll", post(study::enroll))
        .route("/:path/events/:id/disenroll", post(study::disenroll))
        .route(
            "/:path/events/:id/enrollments/:eid/accept",
            post(study::accept_enrollment),
        )
        .route(
            "/:path/events/:id/enrollments/:eid/reject",
            post(study::reject_enrollment),
        );

    Router::new()
        .route("/", get(index::index))
        .route(
            "/new-study",
            get(study::new_study_form).post(study::new_study_submit),
        )
        .merge(account_routes)
        .nest("/settings", settings_routes)
        .nest("/study", study_routes)
        .merge(create_health_router::<Arc<AppState>>())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Health check, outside the application state.
pub fn create_health_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(index::health_check))
}
