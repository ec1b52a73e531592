use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Endpoints restricted to the `admin` role: user listing and every product
/// mutation. Each handler takes the `AdminUser` extractor, which resolves
/// the bearer token and rejects with 403 before the request body is ever
/// read — a rejected request causes no side effects.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /users
        // Lists all registered users (no password hashes, no tokens).
        .route("/users", get(handlers::list_users))
        // POST /products
        // Creates a product from multipart form data with an optional image.
        .route("/products", post(handlers::create_product))
        // PUT /products/{id}
        // Full-field update; imagen is a stored filename, not a re-upload.
        .route("/products/{id}", put(handlers::update_product))
        // DELETE /products/{id}
        .route("/products/{id}", delete(handlers::delete_product))
}
