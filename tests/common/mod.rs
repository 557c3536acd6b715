#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use item_service::settings::DatabaseSettings;
use item_service::{ensure_tables, AppState, Database, Environment, Settings};
use serde_json::Value;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

/// A database on a fresh file. Keep `dir` alive for the duration of the test.
pub struct TestDb {
    pub db: Database,
    pub settings: Settings,
    dir: TempDir,
}

pub async fn setup_db(max_connections: u32) -> TestDb {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("items.db").display());
    let settings = Settings {
        environment: Environment::Test,
        database: DatabaseSettings {
            url,
            max_connections,
            acquire_timeout_secs: 5,
            echo: false,
        },
        ..Settings::default()
    };
    let db = Database::connect(&settings.database).await.expect("connect");
    ensure_tables(db.pool()).await.expect("ensure tables");
    TestDb { db, settings, dir }
}

pub fn state(test_db: &TestDb) -> AppState {
    AppState::new(test_db.db.clone(), test_db.settings.clone())
}

pub async fn setup_app() -> (Router, TestDb) {
    setup_app_in(Environment::Test).await
}

pub async fn setup_app_in(environment: Environment) -> (Router, TestDb) {
    let mut test_db = setup_db(5).await;
    test_db.settings.environment = environment;
    let app = item_service::app(state(&test_db));
    (app, test_db)
}

/// Sends one request and returns the status and the JSON body (`Null` when empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// In-memory sink for formatted log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Captures every event emitted on the current thread until the guard drops.
/// Works with `#[tokio::test]`'s single-threaded runtime.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
