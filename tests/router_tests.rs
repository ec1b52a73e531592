mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{body_json, json_request, send, spawn_app, spawn_app_with_config};
use tienda_api::AppConfig;

#[tokio::test]
async fn health_check_responds_ok() {
    let app = spawn_app();
    let response = send(
        &app,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unmatched_route_echoes_the_path() {
    let app = spawn_app();
    let response = send(
        &app,
        Request::get("/no/existe").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["mensaje"], "Ruta no encontrada");
    assert_eq!(body["uri"], "/no/existe");
}

#[tokio::test]
async fn non_numeric_product_id_falls_through_to_not_found() {
    let app = spawn_app();
    for id in ["abc", "42abc", "-1"] {
        let response = send(
            &app,
            Request::get(format!("/products/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "id {id:?}");

        let body = body_json(response).await;
        assert_eq!(body["mensaje"], "Ruta no encontrada");
        assert_eq!(body["uri"], format!("/products/{id}"));
    }
}

#[tokio::test]
async fn trailing_slash_normalizes_before_matching() {
    let app = spawn_app();
    let response = send(
        &app,
        Request::get("/products/").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_method_on_known_path_answers_like_an_unmatched_route() {
    let app = spawn_app();
    // The route table draws no method-not-allowed distinction: PATCH has no
    // entry anywhere, and GET /users/register only exists as POST.
    for (method, uri) in [("PATCH", "/products"), ("GET", "/users/register")] {
        let response = send(&app, json_request(method, uri, None, &serde_json::json!({}))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");

        let body = body_json(response).await;
        assert_eq!(body["mensaje"], "Ruta no encontrada");
        assert_eq!(body["uri"], uri);
    }
}

#[tokio::test]
async fn non_numeric_id_on_gated_routes_is_not_found_before_auth() {
    let app = spawn_app();
    // No token at all: the id check comes before authorization, so these
    // answer 404 like an unmatched route, not 403.
    for method in ["PUT", "DELETE"] {
        let response = send(
            &app,
            Request::builder()
                .method(method)
                .uri("/products/abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");

        let body = body_json(response).await;
        assert_eq!(body["mensaje"], "Ruta no encontrada");
        assert_eq!(body["uri"], "/products/abc");
    }
}

#[tokio::test]
async fn base_path_prefix_is_stripped_before_matching() {
    let config = AppConfig {
        base_path: "/api_proyecto/public".to_string(),
        ..AppConfig::default()
    };
    let app = spawn_app_with_config(config);

    let response = send(
        &app,
        Request::get("/api_proyecto/public/products")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Without the prefix the route does not exist.
    let response = send(
        &app,
        Request::get("/products").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The 404 echoes the path with the prefix stripped.
    let response = send(
        &app,
        Request::get("/api_proyecto/public/no/existe")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["uri"], "/no/existe");
}

// --- CORS ---

#[tokio::test]
async fn preflight_is_answered_immediately_with_200() {
    let app = spawn_app();
    let response = send(
        &app,
        Request::options("/products")
            .header(header::ORIGIN, "http://127.0.0.1:4200")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://127.0.0.1:4200"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap(),
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn unknown_origin_receives_the_default_origin() {
    let app = spawn_app();
    let response = send(
        &app,
        Request::get("/products")
            .header(header::ORIGIN, "http://evil.example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:4200"
    );
}

#[tokio::test]
async fn allowed_origin_is_echoed_back() {
    let app = spawn_app();
    let response = send(
        &app,
        Request::get("/products")
            .header(header::ORIGIN, "http://127.0.0.1:4200")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://127.0.0.1:4200"
    );
}

#[tokio::test]
async fn cors_headers_are_present_even_on_404() {
    let app = spawn_app();
    let response = send(
        &app,
        Request::get("/no/existe")
            .header(header::ORIGIN, "http://localhost:4200")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:4200"
    );
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = spawn_app();
    let response = send(
        &app,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert!(response.headers().contains_key("x-request-id"));
}
