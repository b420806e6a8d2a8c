mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_link_stats_daily_sums_to_total() {
    let mut app = common::spawn_app();
    let created = common::create_simple_link(&app.server, "Stats01").await;
    let id = created["id"].as_i64().unwrap();

    app.server.get("/s/Stats01").await;
    app.server.get("/s/Stats01").await;
    app.server.get("/s/Stats01").add_query_param("qr", 1).await;
    app.server
        .post("/s/Stats01/ad")
        .json(&json!({ "kind": "view" }))
        .await;
    assert_eq!(app.flush_clicks().await, 4);

    let response = app
        .server
        .get(&format!("/urls/{id}/stats"))
        .add_query_param("days", 7)
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();

    assert_eq!(body["code"], "Stats01");
    assert_eq!(body["totals"]["total"], 4);
    assert_eq!(body["totals"]["link_click"], 2);
    assert_eq!(body["totals"]["qr_scan"], 1);
    assert_eq!(body["totals"]["ad_view"], 1);
    assert!(body["totals"]["last_event_at"].is_string());

    let daily = body["daily"].as_array().unwrap();
    assert_eq!(daily.len(), 7);
    assert_eq!(body["days"], 7);

    let sum: i64 = daily.iter().map(|d| d["total"].as_i64().unwrap()).sum();
    assert_eq!(sum, 4);

    // Buckets are ascending and the last one is today.
    let today = chrono::Utc::now().date_naive().to_string();
    assert_eq!(daily.last().unwrap()["day"], today);
    assert_eq!(daily.last().unwrap()["total"], 4);
    assert_eq!(daily[0]["total"], 0);
}

#[tokio::test]
async fn test_link_stats_default_window() {
    let app = common::spawn_app();
    let created = common::create_simple_link(&app.server, "Stats02").await;
    let id = created["id"].as_i64().unwrap();

    let body = app
        .server
        .get(&format!("/urls/{id}/stats"))
        .await
        .json::<Value>();

    assert_eq!(body["days"], 30);
    assert_eq!(body["totals"]["total"], 0);
    assert!(body["totals"]["last_event_at"].is_null());
}

#[tokio::test]
async fn test_link_stats_days_out_of_range() {
    let app = common::spawn_app();
    let created = common::create_simple_link(&app.server, "Stats03").await;
    let id = created["id"].as_i64().unwrap();

    for days in [0, 366] {
        app.server
            .get(&format!("/urls/{id}/stats"))
            .add_query_param("days", days)
            .await
            .assert_status_bad_request();
    }
}

#[tokio::test]
async fn test_link_stats_unknown_link() {
    let app = common::spawn_app();

    app.server
        .get("/urls/77/stats")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_deleted_link_events_stay_in_summary() {
    let mut app = common::spawn_app();
    let created = common::create_simple_link(&app.server, "Stats04").await;
    let id = created["id"].as_i64().unwrap();

    app.server.get("/s/Stats04").await;
    app.flush_clicks().await;

    app.server
        .delete(&format!("/urls/{id}"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let summary = app
        .server
        .get("/urls/stats/summary")
        .await
        .json::<Value>();

    assert_eq!(summary["links_total"], 0);
    assert_eq!(summary["all_time"]["total"], 1);
}

#[tokio::test]
async fn test_summary_windows_are_nested() {
    let mut app = common::spawn_app();
    common::create_simple_link(&app.server, "SumA01").await;
    common::create_simple_link(&app.server, "SumB01").await;

    for _ in 0..3 {
        app.server.get("/s/SumA01").await;
    }
    app.server
        .post("/s/SumB01/ad")
        .json(&json!({ "kind": "click" }))
        .await;
    app.flush_clicks().await;

    let response = app.server.get("/urls/stats/summary").await;
    response.assert_status_ok();
    let body = response.json::<Value>();

    assert_eq!(body["links_total"], 2);

    let total = |window: &str| body[window]["total"].as_i64().unwrap();
    assert_eq!(total("today"), 4);
    assert!(total("today") <= total("week"));
    assert!(total("week") <= total("month"));
    assert!(total("month") <= total("all_time"));
    assert_eq!(body["all_time"]["ad_click"], 1);
    assert_eq!(body["all_time"]["link_click"], 3);
}
