//! Home page and health check.

use axum::response::IntoResponse;
use axum_extra::extract::cookie::CookieJar;

use crate::web::flash;
use crate::web::session::OptionalUser;
use crate::web::view::View;

/// GET / - the home page, with the member's account when logged in.
pub async fn index(OptionalUser(user): OptionalUser, jar: CookieJar) -> impl IntoResponse {
    let (jar, message) = flash::take(jar);
    let mut view = View::new("index").with_flash(message);
    if let Some(user) = user {
        view = view.with("account", &user.account);
    }
    (jar, view)
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
