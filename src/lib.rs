use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{
        HeaderName, HeaderValue, Method, StatusCode,
        header::{self, ORIGIN},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::{Layer, ServiceBuilder};
use tower_http::{
    normalize_path::{NormalizePath, NormalizePathLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod security;
pub mod storage;

// Routing segregation (Public, Admin).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point
// (main.rs) and the integration tests.
pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{LocalStorageClient, MockStorageService, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) from every handler
/// decorated with `#[utoipa::path]` and every schema deriving `ToSchema`.
/// Served at `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::list_users,
        handlers::list_products, handlers::get_product, handlers::create_product,
        handlers::update_product, handlers::delete_product,
    ),
    components(
        schemas(
            models::User, models::Product, models::Role,
            models::RegisterRequest, models::LoginRequest, models::ProductForm,
        )
    ),
    tags(
        (name = "tienda-api", description = "User and product catalogue API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application
/// services and configuration, shared across every incoming request.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: abstracts the credential and product store.
    pub repo: RepositoryState,
    /// Storage layer: abstracts where product images are persisted.
    pub storage: StorageState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let handlers and extractors selectively pull components from the shared
// AppState instead of taking the whole thing.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// cors_middleware
///
/// Custom CORS handling with allow-list echo semantics: an Origin found in
/// the configured allow-list is echoed back verbatim, any other (or absent)
/// Origin receives the fixed default origin instead. Preflight OPTIONS
/// requests are answered immediately with 200 and no body. Methods and
/// headers are fixed; credentials are allowed.
///
/// `tower_http::cors::CorsLayer` cannot express the "mismatch emits a
/// different fixed origin" rule, hence the hand-rolled middleware.
async fn cors_middleware(State(config): State<AppConfig>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let allow_origin = if config.allowed_origins.iter().any(|o| o == &origin) {
        origin
    } else {
        config.default_origin.clone()
    };

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&allow_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );

    response
}

/// create_router
///
/// Assembles the full routing structure, applies global middleware, and
/// registers the application state. The API routes are nested under the
/// configured base prefix (if any); anything that matches nothing falls
/// through to the path-echoing 404.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // Public and admin route tables merge into one API router; same-path
    // entries with different methods (GET vs POST /products) combine.
    let api = Router::new()
        .merge(public::public_routes())
        .merge(admin::admin_routes());

    let base_router = if state.config.base_path.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&state.config.base_path, api)
    };

    let base_router = base_router
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // The route table draws no method-not-allowed distinction: a known
        // path with an unlisted method answers exactly like an unmatched
        // route, echoing the normalized path.
        .method_not_allowed_fallback(handlers::route_fallback)
        .fallback(handlers::route_fallback)
        // CORS runs outside routing so even the 404 fallback and preflights
        // for unknown paths carry the headers.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cors_middleware,
        ))
        .with_state(state);

    // Observability and correlation layers, applied outermost.
    base_router.layer(
        ServiceBuilder::new()
            // Unique UUID per incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // Wrap the request/response lifecycle in a tracing span carrying
            // the request id.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // Return the generated x-request-id header to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// create_app
///
/// Wraps the router in trailing-slash normalization. This has to sit outside
/// the router itself so `/products/` is rewritten to `/products` before any
/// route matching happens; serve it via
/// `ServiceExt::<Request>::into_make_service`.
pub fn create_app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(create_router(state))
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: includes the generated `x-request-id`
/// alongside method and URI so every log line of one request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
