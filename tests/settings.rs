//! Settings pages over HTTP.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use studyolle::account::verify_password;

use common::{assert_redirect, spawn_app, view, PASSWORD};

#[tokio::test]
async fn test_settings_require_login() {
    let app = spawn_app().await;

    for path in [
        "/settings/profile",
        "/settings/password",
        "/settings/notifications",
        "/settings/account",
        "/settings/tags",
        "/settings/zones",
    ] {
        let response = app.server.get(path).await;
        assert_redirect(&response, "/login");
    }
}

#[tokio::test]
async fn test_update_profile() {
    let app = spawn_app().await;
    app.member("youngbin").await;

    let body = view(&app.server.get("/settings/profile").await, "settings/profile");
    assert!(body["model"]["profile"].is_object());

    let response = app
        .server
        .post("/settings/profile")
        .form(&[("bio", "짧은 소개를 수정하는 경우"), ("url", "https://example.com")])
        .await;
    assert_redirect(&response, "/settings/profile");

    let body = view(&app.server.get("/settings/profile").await, "settings/profile");
    assert_eq!(body["model"]["message"], "프로필을 수정하였습니다.");

    let account = app.account("youngbin@email.com").await.unwrap();
    assert_eq!(account.bio.as_deref(), Some("짧은 소개를 수정하는 경우"));
    assert_eq!(account.url.as_deref(), Some("https://example.com"));
}

#[tokio::test]
async fn test_update_profile_too_long_bio() {
    let app = spawn_app().await;
    app.member("youngbin").await;

    let bio = "길게 소개를 수정하는 경우. ".repeat(5);
    let response = app
        .server
        .post("/settings/profile")
        .form(&[("bio", bio.as_str())])
        .await;
    let body = view(&response, "settings/profile");
    assert!(body["errors"]["bio"].is_array());

    let account = app.account("youngbin@email.com").await.unwrap();
    assert!(account.bio.is_none());
}

#[tokio::test]
async fn test_update_password() {
    let app = spawn_app().await;
    app.member("youngbin").await;

    let response = app
        .server
        .post("/settings/password")
        .form(&[
            ("new_password", "87654321"),
            ("new_password_confirm", "87654321"),
        ])
        .await;
    assert_redirect(&response, "/settings/password");

    let body = view(&app.server.get("/settings/password").await, "settings/password");
    assert_eq!(body["model"]["message"], "비밀번호를 변경했습니다.");

    let account = app.account("youngbin@email.com").await.unwrap();
    assert!(verify_password("87654321", &account.password).is_ok());
}

#[tokio::test]
async fn test_update_password_mismatch() {
    let app = spawn_app().await;
    app.member("youngbin").await;

    let response = app
        .server
        .post("/settings/password")
        .form(&[
            ("new_password", "87654321"),
            ("new_password_confirm", "11111111"),
        ])
        .await;
    let body = view(&response, "settings/password");
    assert_eq!(
        body["errors"]["new_password_confirm"][0],
        "비밀번호가 일치하지 않습니다."
    );

    let account = app.account("youngbin@email.com").await.unwrap();
    assert!(verify_password(PASSWORD, &account.password).is_ok());
}

#[tokio::test]
async fn test_update_password_same_as_current() {
    let app = spawn_app().await;
    app.member("youngbin").await;
    let before = app.account("youngbin@email.com").await.unwrap().password;

    let response = app
        .server
        .post("/settings/password")
        .form(&[("new_password", PASSWORD), ("new_password_confirm", PASSWORD)])
        .await;
    let body = view(&response, "settings/password");
    assert_eq!(
        body["model"]["message"],
        "기존 비밀번호와 동일하게 변경할 수 없습니다."
    );

    let after = app.account("youngbin@email.com").await.unwrap().password;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_update_notifications() {
    let app = spawn_app().await;
    app.member("youngbin").await;

    let body = view(
        &app.server.get("/settings/notifications").await,
        "settings/notifications",
    );
    assert_eq!(body["model"]["notifications"]["study_created_by_web"], true);

    let response = app
        .server
        .post("/settings/notifications")
        .form(&[
            ("study_created_by_email", "true"),
            ("study_updated_by_web", "true"),
        ])
        .await;
    assert_redirect(&response, "/settings/notifications");

    let account = app.account("youngbin@email.com").await.unwrap();
    assert!(account.study_created_by_email);
    assert!(!account.study_created_by_web);
    assert!(account.study_updated_by_web);
    assert!(!account.study_enrollment_result_by_web);
}

#[tokio::test]
async fn test_update_nickname() {
    let app = spawn_app().await;
    app.member("youngbin").await;

    let response = app
        .server
        .post("/settings/account")
        .form(&[("nickname", "새닉네임")])
        .await;
    assert_redirect(&response, "/settings/account");

    let body = view(&app.server.get("/settings/account").await, "settings/account");
    assert_eq!(body["model"]["message"], "닉네임이 수정되었습니다.");
    assert_eq!(body["model"]["account"]["nickname"], "새닉네임");

    let body = view(
        &app.server.get("/profile/%EC%83%88%EB%8B%89%EB%84%A4%EC%9E%84").await,
        "account/profile",
    );
    assert_eq!(body["model"]["is_owner"], true);
}

#[tokio::test]
async fn test_update_nickname_taken() {
    let app = spawn_app().await;
    app.member("keesun").await;
    app.member("youngbin").await;

    let response = app
        .server
        .post("/settings/account")
        .form(&[("nickname", "keesun")])
        .await;
    let body = view(&response, "settings/account");
    assert_eq!(
        body["errors"]["nickname"][0],
        "입력하신 닉네임을 사용할 수 없습니다."
    );

    let account = app.account("youngbin@email.com").await.unwrap();
    assert_eq!(account.nickname, "youngbin");
}

#[tokio::test]
async fn test_tags() {
    let app = spawn_app().await;
    app.member("youngbin").await;

    let response = app
        .server
        .post("/settings/tags/add")
        .json(&json!({"tag_title": "spring"}))
        .await;
    response.assert_status_ok();

    // Adding twice is harmless.
    app.server
        .post("/settings/tags/add")
        .json(&json!({"tag_title": "spring"}))
        .await
        .assert_status_ok();

    let body = view(&app.server.get("/settings/tags").await, "settings/tags");
    assert_eq!(body["model"]["tags"], json!(["spring"]));
    assert_eq!(body["model"]["whitelist"], json!(["spring"]));

    app.server
        .post("/settings/tags/remove")
        .json(&json!({"tag_title": "spring"}))
        .await
        .assert_status_ok();
    let body = view(&app.server.get("/settings/tags").await, "settings/tags");
    assert_eq!(body["model"]["tags"], json!([]));
    // The tag itself stays available.
    assert_eq!(body["model"]["whitelist"], json!(["spring"]));
}

#[tokio::test]
async fn test_tags_bad_requests() {
    let app = spawn_app().await;
    app.member("youngbin").await;

    app.server
        .post("/settings/tags/remove")
        .json(&json!({"tag_title": "never-created"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/settings/tags/add")
        .json(&json!({"tag_title": "   "}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_zones() {
    let app = spawn_app().await;
    app.member("youngbin").await;
    let andong = "Andong(안동시)/Gyeongsangbuk-do";

    let body = view(&app.server.get("/settings/zones").await, "settings/zones");
    let whitelist = body["model"]["whitelist"].as_array().unwrap();
    assert!(whitelist.iter().any(|z| z == andong));

    app.server
        .post("/settings/zones/add")
        .json(&json!({"zone_name": andong}))
        .await
        .assert_status_ok();
    let body = view(&app.server.get("/settings/zones").await, "settings/zones");
    assert_eq!(body["model"]["zones"], json!([andong]));

    app.server
        .post("/settings/zones/remove")
        .json(&json!({"zone_name": andong}))
        .await
        .assert_status_ok();
    let body = view(&app.server.get("/settings/zones").await, "settings/zones");
    assert_eq!(body["model"]["zones"], json!([]));
}

#[tokio::test]
async fn test_zones_bad_requests() {
    let app = spawn_app().await;
    app.member("youngbin").await;

    app.server
        .post("/settings/zones/add")
        .json(&json!({"zone_name": "Atlantis(아틀란티스)/none"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/settings/zones/add")
        .json(&json!({"zone_name": "no parentheses"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/settings/zones/remove")
        .json(&json!({"zone_name": "Atlantis(아틀란티스)/none"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
