use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable by any client, anonymous or logged-in: the account
/// gateway (register/login), the read side of the product catalogue, and a
/// liveness probe.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness check for monitoring.
        .route("/health", get(handlers::health))
        // POST /users/register
        // Account creation. Role may be supplied, defaults to cliente.
        .route("/users/register", post(handlers::register))
        // POST /users/login
        // Credential exchange; issues a fresh opaque token on success.
        .route("/users/login", post(handlers::login))
        // GET /products
        // Full catalogue listing, no auth required.
        .route("/products", get(handlers::list_products))
        // GET /products/{id}
        // Single product lookup. Non-numeric ids answer like unmatched routes.
        .route("/products/{id}", get(handlers::get_product))
}
