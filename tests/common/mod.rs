// Not every test binary uses every helper.
#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use serde_json::Value;
use std::sync::Arc;
use tienda_api::{
    AppConfig, AppState, MemoryRepository, MockStorageService, create_app,
    repository::RepositoryState,
    storage::StorageState,
};
use tower::util::ServiceExt;
use tower_http::normalize_path::NormalizePath;

pub type TestApp = NormalizePath<Router>;

/// In-process application over the in-memory repository and mock storage:
/// the full router stack with no database and no filesystem writes.
pub fn spawn_app() -> TestApp {
    spawn_app_with_config(AppConfig::default())
}

pub fn spawn_app_with_config(config: AppConfig) -> TestApp {
    let state = AppState {
        repo: Arc::new(MemoryRepository::new()) as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        config,
    };
    create_app(state)
}

pub fn spawn_app_with_state(state: AppState) -> TestApp {
    create_app(state)
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("request failed")
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn form_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read failed");
    serde_json::from_slice(&bytes).expect("body was not JSON")
}

/// Registers a user and logs in, returning the issued token.
pub async fn register_and_login(app: &TestApp, email: &str, rol: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/users/register",
            None,
            &serde_json::json!({
                "nombre": "Test",
                "email": email,
                "password": "p4ssword",
                "rol": rol,
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        app,
        json_request(
            "POST",
            "/users/login",
            None,
            &serde_json::json!({ "email": email, "password": "p4ssword" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["token"].as_str().expect("login without token").to_string()
}

/// Builds a multipart/form-data body by hand so the tests exercise the exact
/// wire format browsers send. Returns (content-type value, body bytes).
pub fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> (String, Vec<u8>) {
    let boundary = "test-boundary-7d83a2f1";
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some((file_name, data)) = file {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"imagen\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    (
        format!("multipart/form-data; boundary={boundary}"),
        body,
    )
}
