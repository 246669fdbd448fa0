//! One-shot flash messages carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const FLASH_COOKIE: &str = "FLASH";

/// Store `message` for the next page.
pub fn set(jar: CookieJar, message: &str) -> CookieJar {
    let cookie = Cookie::build((FLASH_COOKIE, urlencoding::encode(message).into_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Read and clear the pending message.
pub fn take(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar
        .get(FLASH_COOKIE)
        .and_then(|c| urlencoding::decode(c.value()).ok())
        .map(|m| m.into_owned())
        .filter(|m| !m.is_empty());

    match message {
        Some(message) => (
            jar.remove(Cookie::build(FLASH_COOKIE).path("/")),
            Some(message),
        ),
        None => (jar, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_take() {
        let jar = set(CookieJar::new(), "프로필을 수정하였습니다.");
        let (jar, message) = take(jar);
        assert_eq!(message.as_deref(), Some("프로필을 수정하였습니다."));
        assert!(jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn test_take_without_flash() {
        let (_, message) = take(CookieJar::new());
        assert!(message.is_none());
    }
}
