use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---
//
// Wire and column names keep the original Spanish spelling (`nombre`, `rol`,
// `descripcion`, `precio`, `imagen`): they are the API contract existing
// clients depend on.

/// Role
///
/// The closed set of user roles. Keeping this an enum (rather than a free
/// string) makes an invalid role unrepresentable past the deserialization and
/// store boundaries; handlers gate on `Role::Admin` by equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unlocks product mutation and the user listing.
    Admin,
    /// The default role assigned at registration.
    #[default]
    Cliente,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cliente => "cliente",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "cliente" => Ok(Role::Cliente),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

// The `rol` column is plain TEXT; these impls move the string<->enum
// conversion to the store boundary so repository code only ever sees `Role`.

impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        raw.parse().map_err(Into::into)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Role {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

/// User
///
/// The public projection of a user record: what the user listing and the
/// token lookup return. The password hash and the live token never leave the
/// repository through this type.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct User {
    /// Store-assigned primary key.
    pub id: i64,
    pub nombre: String,
    /// Unique; enforced at registration.
    pub email: String,
    pub rol: Role,
}

/// AuthenticatedUser
///
/// The login response: the user projection plus the freshly issued opaque
/// token. The password field is stripped before this struct is built.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub nombre: String,
    pub email: String,
    pub rol: Role,
    /// 32 hex chars (16 bytes of CSPRNG output). Overwritten on each login.
    pub token: String,
}

/// UserRecord
///
/// Full credential row, repository-internal. Carries the Argon2 password
/// hash and the current token; intentionally not `Serialize`.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub nombre: String,
    pub email: String,
    /// Argon2 PHC string, never plaintext.
    pub password: String,
    pub rol: Role,
    pub token: Option<String>,
}

/// Product
///
/// A product row as served by the catalog endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Product {
    /// Store-assigned primary key; the only path-addressable id in the API.
    pub id: i64,
    pub nombre: String,
    pub descripcion: String,
    pub precio: f64,
    /// Stored filename under the uploads dir, if an image was attached.
    pub imagen: Option<String>,
    pub stock: i32,
}

/// ProductRecord
///
/// Column values for an insert or a full-row update (id is store-assigned).
#[derive(Debug, Clone, Default)]
pub struct ProductRecord {
    pub nombre: String,
    pub descripcion: String,
    pub precio: f64,
    pub imagen: Option<String>,
    pub stock: i32,
}

// --- Request Payloads (Input Schemas) ---
//
// All fields are `Option` on purpose: bodies arrive as JSON, urlencoded form,
// or (for unsupported content types) an empty field set, and the handlers own
// the presence checks so the fixed 400 messages are emitted before any store
// call.

/// RegisterRequest
///
/// Input for POST /users/register. `rol` defaults to `cliente` when absent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterRequest {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub rol: Option<Role>,
}

/// LoginRequest
///
/// Input for POST /users/login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// ProductForm
///
/// Input fields for product create/update. Missing fields fall back to
/// `''`/`0` like the reference behavior; the product endpoints define no 400
/// outcome. On create, `imagen` arrives as a file part (see `ProductUpload`);
/// on update it is the already-stored filename.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ProductForm {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub precio: Option<f64>,
    pub imagen: Option<String>,
    pub stock: Option<i32>,
}
