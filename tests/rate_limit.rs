mod common;

use axum::http::{StatusCode, header};
use clickpath::prelude::*;
use serde_json::{Value, json};

fn limited_app() -> common::TestApp {
    common::spawn_app_with(StateOptions {
        rate_limit_max: 3,
        rate_limit_management_max: 2,
        ..StateOptions::default()
    })
}

async fn seed(app: &common::TestApp, code: &str) {
    app.state
        .link_service
        .create(
            "test",
            clickpath::application::services::CreateLink {
                target_url: "https://example.com".to_string(),
                custom_code: Some(code.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_redirects_limited_per_client() {
    let app = limited_app();
    seed(&app, "Rate01").await;

    for _ in 0..3 {
        app.server
            .get("/s/Rate01")
            .add_header("X-Forwarded-For", "203.0.113.7")
            .await
            .assert_status(StatusCode::TEMPORARY_REDIRECT);
    }

    let response = app
        .server
        .get("/s/Rate01")
        .add_header("X-Forwarded-For", "203.0.113.7")
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .header(header::RETRY_AFTER)
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1 && retry_after <= 60);
    assert_eq!(response.json::<Value>()["error"]["code"], "rate_limited");

    // Another client has its own window.
    app.server
        .get("/s/Rate01")
        .add_header("X-Forwarded-For", "198.51.100.2")
        .await
        .assert_status(StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_limited_requests_record_no_clicks() {
    let mut app = limited_app();
    seed(&app, "Rate02").await;

    for _ in 0..5 {
        app.server
            .get("/s/Rate02")
            .add_header("X-Forwarded-For", "203.0.113.9")
            .await;
    }

    assert_eq!(app.flush_clicks().await, 3);
}

#[tokio::test]
async fn test_scopes_have_separate_tables() {
    let app = limited_app();
    seed(&app, "Rate03").await;

    for _ in 0..2 {
        app.server
            .get("/urls")
            .add_header("X-Forwarded-For", "203.0.113.5")
            .await
            .assert_status_ok();
    }
    app.server
        .get("/urls")
        .add_header("X-Forwarded-For", "203.0.113.5")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    // The same client may still follow short links.
    app.server
        .get("/s/Rate03")
        .add_header("X-Forwarded-For", "203.0.113.5")
        .await
        .assert_status(StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_ad_events_share_redirect_scope() {
    let app = limited_app();
    seed(&app, "Rate04").await;

    for _ in 0..3 {
        app.server
            .post("/s/Rate04/ad")
            .add_header("X-Forwarded-For", "203.0.113.11")
            .json(&json!({ "kind": "view" }))
            .await
            .assert_status(StatusCode::ACCEPTED);
    }

    app.server
        .get("/s/Rate04")
        .add_header("X-Forwarded-For", "203.0.113.11")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forwarded_headers_ignored_when_not_behind_proxy() {
    let app = common::spawn_app_with(StateOptions {
        rate_limit_max: 1,
        behind_proxy: false,
        ..StateOptions::default()
    });
    seed(&app, "Rate05").await;

    app.server
        .get("/s/Rate05")
        .add_header("X-Forwarded-For", "203.0.113.1")
        .await
        .assert_status(StatusCode::TEMPORARY_REDIRECT);

    // A spoofed header does not buy a fresh window.
    app.server
        .get("/s/Rate05")
        .add_header("X-Forwarded-For", "203.0.113.2")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}
