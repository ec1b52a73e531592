use crate::{
    auth::AdminUser,
    config::AppConfig,
    error::ApiError,
    extract::{Payload, ProductId, ProductUpload},
    models::{LoginRequest, Product, ProductForm, ProductRecord, RegisterRequest, User},
    repository::{NewUser, RegisterOutcome, RepositoryState},
    storage::StorageState,
};
use axum::{
    Json,
    extract::{OriginalUri, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::json;

// --- User Handlers ---

/// register
///
/// [Public Route] Creates a new user account. `nombre`, `email` and
/// `password` are all required and non-empty; `rol` defaults to `cliente`
/// when absent. The password is hashed before it reaches the store, and a
/// duplicate email is answered with 409 while leaving the original record
/// untouched.
#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Missing required fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(repository): State<RepositoryState>,
    Payload(payload): Payload<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let nombre = payload.nombre.unwrap_or_default();
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if nombre.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("Faltan datos obligatorios"));
    }

    let outcome = repository
        .register(NewUser {
            nombre,
            email,
            password,
            rol: payload.rol.unwrap_or_default(),
        })
        .await?;

    match outcome {
        RegisterOutcome::Created => Ok((StatusCode::CREATED, Json(json!({ "success": true })))),
        RegisterOutcome::EmailExists => Err(ApiError::Conflict("Email ya registrado")),
    }
}

/// login
///
/// [Public Route] Exchanges credentials for a fresh opaque token. On success
/// the token is overwritten on the user's record (one live token per user)
/// and returned alongside the public profile fields. Every failure mode —
/// unknown email, wrong password, token write failure — collapses to the
/// same 401.
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated, token issued"),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(repository): State<RepositoryState>,
    Payload(payload): Payload<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("Faltan credenciales"));
    }

    match repository.login(&email, &password).await {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::InvalidCredentials),
    }
}

/// list_users
///
/// [Admin Route] Lists every registered user. Password hashes and tokens are
/// never selected, so they cannot leak through this endpoint.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    _admin: AdminUser,
    State(repository): State<RepositoryState>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = repository.list_users().await?;
    Ok(Json(users))
}

// --- Product Handlers ---

/// list_products
///
/// [Public Route] Lists the full product catalogue.
#[utoipa::path(
    get,
    path = "/products",
    responses((status = 200, description = "All products", body = [Product]))
)]
pub async fn list_products(
    State(repository): State<RepositoryState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = repository.list_products().await?;
    Ok(Json(products))
}

/// get_product
///
/// [Public Route] Retrieves a single product. The `{id}` segment only
/// matches digit runs (`ProductId`): anything else is answered exactly like
/// an unmatched route, echoing the requested path.
#[utoipa::path(
    get,
    path = "/products/{id}",
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Unknown id or non-numeric segment")
    )
)]
pub async fn get_product(
    ProductId(id): ProductId,
    State(repository): State<RepositoryState>,
) -> Result<Json<Product>, ApiError> {
    match repository.get_product(id).await? {
        Some(product) => Ok(Json(product)),
        None => Err(ApiError::NotFound("No encontrado")),
    }
}

/// create_product
///
/// [Admin Route] Creates a product from a multipart form. Missing text
/// fields default to empty/zero rather than rejecting. An `imagen` file
/// part, when present, is persisted through the storage service first and
/// its stored filename recorded on the product; a storage failure aborts the
/// request before any insert happens.
#[utoipa::path(
    post,
    path = "/products",
    responses(
        (status = 201, description = "Product created"),
        (status = 403, description = "Not an admin"),
        (status = 500, description = "Image store or insert failure")
    )
)]
pub async fn create_product(
    _admin: AdminUser,
    State(repository): State<RepositoryState>,
    State(storage): State<StorageState>,
    upload: ProductUpload,
) -> Result<impl IntoResponse, ApiError> {
    let imagen = match upload.image {
        Some(image) => Some(
            storage
                .save_image(&image.file_name, image.data)
                .await
                .map_err(|e| {
                    tracing::error!("image save failed: {e}");
                    ApiError::Internal("Error al guardar la imagen")
                })?,
        ),
        None => None,
    };

    let created = repository
        .create_product(ProductRecord {
            nombre: upload.form.nombre.unwrap_or_default(),
            descripcion: upload.form.descripcion.unwrap_or_default(),
            precio: upload.form.precio.unwrap_or_default(),
            imagen,
            stock: upload.form.stock.unwrap_or_default(),
        })
        .await;

    if created {
        Ok((
            StatusCode::CREATED,
            Json(json!({ "mensaje": "Producto creado correctamente" })),
        ))
    } else {
        Err(ApiError::Internal("Error al crear el producto"))
    }
}

/// update_product
///
/// [Admin Route] Replaces every field of an existing product. `imagen` here
/// is the already-stored filename, not a re-upload; missing fields default
/// like creation does. The id check runs before authorization: a
/// non-numeric segment is an unmatched route, token or no token.
#[utoipa::path(
    put,
    path = "/products/{id}",
    responses(
        (status = 200, description = "Product updated"),
        (status = 403, description = "Not an admin"),
        (status = 500, description = "Update failure")
    )
)]
pub async fn update_product(
    ProductId(id): ProductId,
    _admin: AdminUser,
    State(repository): State<RepositoryState>,
    Payload(form): Payload<ProductForm>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = repository
        .update_product(
            id,
            ProductRecord {
                nombre: form.nombre.unwrap_or_default(),
                descripcion: form.descripcion.unwrap_or_default(),
                precio: form.precio.unwrap_or_default(),
                imagen: form.imagen,
                stock: form.stock.unwrap_or_default(),
            },
        )
        .await;

    if updated {
        Ok(Json(json!({ "mensaje": "Producto actualizado correctamente" })).into_response())
    } else {
        Err(ApiError::Internal("Error al actualizar el producto"))
    }
}

/// delete_product
///
/// [Admin Route] Deletes a product by id. Like update, the id check runs
/// before authorization.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    responses(
        (status = 200, description = "Product deleted"),
        (status = 403, description = "Not an admin"),
        (status = 500, description = "Delete failure")
    )
)]
pub async fn delete_product(
    ProductId(id): ProductId,
    _admin: AdminUser,
    State(repository): State<RepositoryState>,
) -> Result<impl IntoResponse, ApiError> {
    if repository.delete_product(id).await {
        Ok(Json(json!({ "mensaje": "Producto eliminado correctamente" })))
    } else {
        Err(ApiError::Internal("Error al eliminar el producto"))
    }
}

// --- Routing Helpers ---

/// health
///
/// [Public Route] Liveness probe for monitoring and load balancer checks.
pub async fn health() -> &'static str {
    "ok"
}

/// route_fallback
///
/// Catch-all for unmatched method+path combinations. Echoes the normalized
/// path (base prefix stripped) so clients see the route as the API matched
/// it.
pub async fn route_fallback(
    State(config): State<AppConfig>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    ruta_no_encontrada(&config, &uri)
}

pub(crate) fn ruta_no_encontrada(config: &AppConfig, uri: &Uri) -> Response {
    let path = uri.path();
    let stripped = if !config.base_path.is_empty() && path.starts_with(config.base_path.as_str()) {
        &path[config.base_path.len()..]
    } else {
        path
    };
    let echoed = if stripped.is_empty() { "/" } else { stripped };

    (
        StatusCode::NOT_FOUND,
        Json(json!({ "mensaje": "Ruta no encontrada", "uri": echoed })),
    )
        .into_response()
}

/// Id segments are digit runs only. `42abc` or `-1` never reach a product
/// lookup; they fall through to the unmatched-route response.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_digit_runs_only() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("007"), Some(7));
        assert_eq!(parse_id("42abc"), None);
        assert_eq!(parse_id("-1"), None);
        assert_eq!(parse_id(""), None);
    }

    #[test]
    fn fallback_echoes_the_stripped_path() {
        let config = AppConfig {
            base_path: "/api_proyecto/public".to_string(),
            ..AppConfig::default()
        };
        let uri: Uri = "/api_proyecto/public/no/existe".parse().unwrap();
        let response = ruta_no_encontrada(&config, &uri);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let uri: Uri = "/api_proyecto/public".parse().unwrap();
        let response = ruta_no_encontrada(&config, &uri);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
