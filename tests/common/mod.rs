#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;

use clickpath::domain::audit::TracingAuditSink;
use clickpath::domain::click_event::ClickEvent;
use clickpath::domain::click_worker::process_event;
use clickpath::prelude::*;
use clickpath::routes::api_router;

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clicks: mpsc::Receiver<ClickEvent>,
}

impl TestApp {
    /// Persists every queued click event, as the background worker would.
    pub async fn flush_clicks(&mut self) -> usize {
        let mut flushed = 0;
        while let Ok(event) = self.clicks.try_recv() {
            process_event(event, self.store.as_ref(), self.store.as_ref()).await;
            flushed += 1;
        }
        flushed
    }
}

pub fn create_test_state(
    options: StateOptions,
) -> (AppState, mpsc::Receiver<ClickEvent>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let (tx, rx) = mpsc::channel(100);

    let state = AppState::new(
        store.clone(),
        store.clone(),
        Arc::new(TracingAuditSink),
        tx,
        options,
    );

    (state, rx, store)
}

pub fn spawn_app_with(options: StateOptions) -> TestApp {
    let (state, clicks, store) = create_test_state(options);
    let server = TestServer::new(api_router(state.clone())).unwrap();

    TestApp {
        server,
        state,
        store,
        clicks,
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(StateOptions {
        base_url: "https://sho.rt".to_string(),
        ..StateOptions::default()
    })
}

/// Creates a link through the API and returns the response body.
pub async fn create_link(server: &TestServer, body: Value) -> Value {
    let response = server.post("/urls").json(&body).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

pub async fn create_simple_link(server: &TestServer, code: &str) -> Value {
    create_link(
        server,
        json!({ "target_url": "https://example.com/landing", "custom_code": code }),
    )
    .await
}
