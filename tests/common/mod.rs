//! Helpers for integration tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};
use tower::ServiceExt;

use jewellery_catalogue::auth::ensure_admin;
use jewellery_catalogue::config::AppConfig;
use jewellery_catalogue::database::{init_db, AppState};
use jewellery_catalogue::route::create_app;

pub const ADMIN_USERNAME: &str = "owner";
pub const ADMIN_PASSWORD: &str = "gold-and-silver";

/// Router over a throwaway database and upload directory.
pub struct TestApp {
    pub router: Router,
    pub upload_dir: PathBuf,
    /// `session=<token>` for authenticated requests
    pub cookie: String,
    _db_file: NamedTempFile,
    _uploads: TempDir,
}

/// Builds the app, provisions the admin account and logs in.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Same as [`setup_test_app`] with config overrides applied on top of the test defaults.
pub async fn setup_test_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(db_file.path().to_str().unwrap()).expect("Failed to initialize test database");
    ensure_admin(&db, ADMIN_USERNAME, ADMIN_PASSWORD).expect("Failed to create admin");

    let uploads = TempDir::new().expect("Failed to create upload dir");
    let mut config = AppConfig {
        upload_dir: uploads.path().to_path_buf(),
        public_base_url: "http://shop.test".into(),
        ..AppConfig::default()
    };
    configure(&mut config);

    let mut app = TestApp {
        router: create_app(AppState::new(db, config)),
        upload_dir: uploads.path().to_path_buf(),
        cookie: String::new(),
        _db_file: db_file,
        _uploads: uploads,
    };
    app.cookie = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.expect("admin login failed");
    app
}

/// Helper function to parse response body as JSON (`Null` when empty)
pub async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

fn build_request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    /// Sends a raw request through the router.
    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Request carrying the admin session cookie.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(build_request(method, uri, Some(&self.cookie), body)).await;
        let status = response.status();
        (status, response_json(response.into_body()).await)
    }

    /// Request without any cookie.
    pub async fn anonymous(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(build_request(method, uri, None, body)).await;
        let status = response.status();
        (status, response_json(response.into_body()).await)
    }

    /// Logs in and returns the `session=<token>` cookie pair, or `None` on failure.
    pub async fn login(&self, username: &str, password: &str) -> Option<String> {
        let body = json!({ "username": username, "password": password });
        let response = self.send(build_request(Method::POST, "/api/login", None, Some(body))).await;
        if response.status() != StatusCode::OK {
            return None;
        }
        let set_cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
        set_cookie.split(';').next().map(str::to_string)
    }

    pub async fn create_category(&self, title: &str) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/catalogue",
                Some(json!({ "title": title, "subtitle": format!("{} collection", title) })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["item"].clone()
    }

    pub async fn create_item(&self, payload: Value) -> Value {
        let (status, body) = self.request(Method::POST, "/api/items", Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["item"].clone()
    }
}
