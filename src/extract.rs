use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::{parse_id, ruta_no_encontrada};
use crate::models::ProductForm;
use axum::{
    Form,
    body::Bytes,
    extract::{FromRef, FromRequest, FromRequestParts, Multipart, OriginalUri, Path, Request},
    http::{header::CONTENT_TYPE, request::Parts},
    response::Response,
};
use serde::de::DeserializeOwned;

/// Payload
///
/// Lenient body extractor for the JSON/form endpoints. The decoder is picked
/// by Content-Type substring match: `application/json` bodies are parsed as
/// JSON, `application/x-www-form-urlencoded` bodies as form data, and
/// anything else (including an unparseable body) decodes as an empty field
/// set. Field-presence validation is the handler's job, which is why every
/// payload type is all-optional.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = content_type_of(&req);

        let parsed = if content_type.contains("application/json") {
            match Bytes::from_request(req, state).await {
                Ok(bytes) => serde_json::from_slice(&bytes).ok(),
                Err(_) => None,
            }
        } else if content_type.contains("application/x-www-form-urlencoded") {
            match Form::<T>::from_request(req, state).await {
                Ok(Form(value)) => Some(value),
                Err(_) => None,
            }
        } else {
            None
        };

        match parsed {
            Some(value) => Ok(Payload(value)),
            None => empty_payload().map(Payload),
        }
    }
}

/// ProductId
///
/// Digits-only `{id}` segment. Listed as the first extractor on every
/// product id route so a non-numeric segment answers like an unmatched
/// route — before authorization runs and before any body is read, exactly
/// as if the route had never matched.
pub struct ProductId(pub i64);

impl<S> FromRequestParts<S> for ProductId
where
    AppConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        // The nesting layer stores the original URI as an extension; outside
        // a nest the request URI is already the original one.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());

        let raw = match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(raw)) => raw,
            Err(_) => return Err(ruta_no_encontrada(&config, &uri)),
        };

        match parse_id(&raw) {
            Some(id) => Ok(ProductId(id)),
            None => Err(ruta_no_encontrada(&config, &uri)),
        }
    }
}

/// ImageUpload
///
/// A file part received for the `imagen` field: the client-supplied filename
/// plus the raw bytes, handed to the storage service as-is.
pub struct ImageUpload {
    pub file_name: String,
    pub data: Bytes,
}

/// ProductUpload
///
/// Body extractor for product creation. Multipart requests are walked field
/// by field (text fields into the form, an `imagen` file part captured
/// separately); any other Content-Type falls back to the lenient
/// [`Payload`] decoding so JSON clients can create image-less products.
pub struct ProductUpload {
    pub form: ProductForm,
    pub image: Option<ImageUpload>,
}

impl<S> FromRequest<S> for ProductUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !content_type_of(&req).contains("multipart/form-data") {
            let Payload(form) = Payload::<ProductForm>::from_request(req, state).await?;
            return Ok(ProductUpload { form, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|_| ApiError::Validation("Faltan datos obligatorios"))?;

        let mut form = ProductForm::default();
        let mut image = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| ApiError::Validation("Faltan datos obligatorios"))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "imagen" if field.file_name().is_some() => {
                    let file_name = field
                        .file_name()
                        .map(str::to_string)
                        .unwrap_or_default();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|_| ApiError::Validation("Faltan datos obligatorios"))?;
                    if !data.is_empty() {
                        image = Some(ImageUpload { file_name, data });
                    }
                }
                "nombre" => form.nombre = field.text().await.ok(),
                "descripcion" => form.descripcion = field.text().await.ok(),
                "precio" => form.precio = field.text().await.ok().and_then(|t| t.parse().ok()),
                "stock" => form.stock = field.text().await.ok().and_then(|t| t.parse().ok()),
                "imagen" => form.imagen = field.text().await.ok(),
                _ => {}
            }
        }

        Ok(ProductUpload { form, image })
    }
}

fn content_type_of(req: &Request) -> String {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// An all-optional payload type deserializes from `{}` with every field
/// `None`; that is the fallback for undecodable bodies.
fn empty_payload<T: DeserializeOwned>() -> Result<T, ApiError> {
    serde_json::from_value(serde_json::Value::Object(serde_json::Map::new()))
        .map_err(|_| ApiError::Internal("Error interno del servidor"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegisterRequest;

    #[test]
    fn empty_payload_yields_all_none_fields() {
        let req: RegisterRequest = empty_payload().unwrap();
        assert!(req.nombre.is_none());
        assert!(req.email.is_none());
        assert!(req.password.is_none());
        assert!(req.rol.is_none());
    }
}
