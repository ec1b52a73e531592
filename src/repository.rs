use crate::error::StoreError;
use crate::models::{AuthenticatedUser, Product, ProductRecord, Role, User, UserRecord};
use crate::security;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::{Arc, Mutex, MutexGuard};

/// RegisterOutcome
///
/// Distinguishable result of a registration attempt. A duplicate email is a
/// normal outcome the caller maps to 409, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    EmailExists,
}

/// NewUser
///
/// Validated registration input as the store receives it; the password is
/// still plaintext here and is hashed inside `register`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nombre: String,
    pub email: String,
    pub password: String,
    pub rol: Role,
}

/// Repository Trait
///
/// Abstract contract for all persistence operations, shared across the
/// application as `Arc<dyn Repository>` so handlers never know the concrete
/// backend (Postgres in production, in-memory for tests).
///
/// Error surface follows the API contract:
/// - lookups and listings return `StoreError` so the handlers can answer 500,
/// - `login` and `find_by_token` collapse every failure to `None` — the
///   client is never told *why* authentication failed,
/// - product mutations report plain success/failure (`rows_affected > 0`),
///   which the handlers map to 201/200 vs 500.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users / Auth ---
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Checks email uniqueness first, hashes the password, then inserts.
    async fn register(&self, user: NewUser) -> Result<RegisterOutcome, StoreError>;
    /// Verifies credentials and, on success, persists a freshly generated
    /// token onto the user row before returning it. Concurrent logins for
    /// the same account race on that write: last one wins, and the loser's
    /// returned token is silently stale.
    async fn login(&self, email: &str, password: &str) -> Option<AuthenticatedUser>;
    /// Resolves an opaque bearer token by equality. Empty tokens short-
    /// circuit to `None` without touching the store.
    async fn find_by_token(&self, token: &str) -> Option<User>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    // --- Products ---
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    async fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError>;
    async fn create_product(&self, record: ProductRecord) -> bool;
    async fn update_product(&self, id: i64, record: ProductRecord) -> bool;
    async fn delete_product(&self, id: i64) -> bool;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// Production implementation backed by a PgPool. All queries are
/// parameterized binds; connections are acquired from the pool per query and
/// released at scope end.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, nombre, email, rol FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// register
    ///
    /// Uniqueness is probed before the insert so a duplicate email comes back
    /// as a distinguishable outcome (409 upstream) instead of a constraint
    /// error, and the original record is left untouched.
    async fn register(&self, user: NewUser) -> Result<RegisterOutcome, StoreError> {
        if self.find_by_email(&user.email).await?.is_some() {
            return Ok(RegisterOutcome::EmailExists);
        }

        let hash = security::hash_password(&user.password).map_err(|_| StoreError::Hash)?;

        sqlx::query("INSERT INTO users (nombre, email, password, rol) VALUES ($1, $2, $3, $4)")
            .bind(&user.nombre)
            .bind(&user.email)
            .bind(&hash)
            .bind(user.rol)
            .execute(&self.pool)
            .await?;

        Ok(RegisterOutcome::Created)
    }

    /// login
    ///
    /// Lookup by email, verify the Argon2 hash, then overwrite the user's
    /// token column with a fresh value. A token write that affects zero rows
    /// counts as a failed login; the password field never leaves this method.
    async fn login(&self, email: &str, password: &str) -> Option<AuthenticatedUser> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, nombre, email, password, rol, token FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("login lookup error: {e:?}");
            None
        })?;

        if !security::verify_password(password, &record.password) {
            return None;
        }

        let token = security::generate_token();
        let result = sqlx::query("UPDATE users SET token = $1 WHERE id = $2")
            .bind(&token)
            .bind(record.id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(res) if res.rows_affected() > 0 => Some(AuthenticatedUser {
                id: record.id,
                nombre: record.nombre,
                email: record.email,
                rol: record.rol,
                token,
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::error!("login token write error: {e:?}");
                None
            }
        }
    }

    async fn find_by_token(&self, token: &str) -> Option<User> {
        if token.is_empty() {
            return None;
        }
        sqlx::query_as::<_, User>("SELECT id, nombre, email, rol FROM users WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("find_by_token error: {e:?}");
                None
            })
    }

    /// list_users
    ///
    /// Admin listing. Password hash and token are not selected.
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>("SELECT id, nombre, email, rol FROM users")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, nombre, descripcion, precio, imagen, stock FROM products",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, nombre, descripcion, precio, imagen, stock FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn create_product(&self, record: ProductRecord) -> bool {
        let result = sqlx::query(
            "INSERT INTO products (nombre, descripcion, precio, imagen, stock) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&record.nombre)
        .bind(&record.descripcion)
        .bind(record.precio)
        .bind(&record.imagen)
        .bind(record.stock)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("create_product error: {e:?}");
                false
            }
        }
    }

    async fn update_product(&self, id: i64, record: ProductRecord) -> bool {
        let result = sqlx::query(
            "UPDATE products SET nombre = $1, descripcion = $2, precio = $3, imagen = $4, \
             stock = $5 WHERE id = $6",
        )
        .bind(&record.nombre)
        .bind(&record.descripcion)
        .bind(record.precio)
        .bind(&record.imagen)
        .bind(record.stock)
        .bind(id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("update_product error: {e:?}");
                false
            }
        }
    }

    async fn delete_product(&self, id: i64) -> bool {
        match sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_product error: {e:?}");
                false
            }
        }
    }
}

// --- In-Memory Implementation ---

#[derive(Default)]
struct MemoryState {
    users: Vec<UserRecord>,
    products: Vec<Product>,
    next_user_id: i64,
    next_product_id: i64,
}

/// MemoryRepository
///
/// In-process implementation used by tests and database-free local runs. It
/// shares the hashing and token-generation code with the Postgres backend so
/// credential semantics (uniqueness conflict, token rotation, entropy) are
/// identical — the same role MockStorageService plays for the storage layer.
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_user_id: 1,
                next_product_id: 1,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-mutation.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn project(record: &UserRecord) -> User {
    User {
        id: record.id,
        nombre: record.nombre.clone(),
        email: record.email.clone(),
        rol: record.rol,
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.email == email)
            .map(project))
    }

    async fn register(&self, user: NewUser) -> Result<RegisterOutcome, StoreError> {
        let hash = security::hash_password(&user.password).map_err(|_| StoreError::Hash)?;
        let mut state = self.state();
        if state.users.iter().any(|u| u.email == user.email) {
            return Ok(RegisterOutcome::EmailExists);
        }
        let id = state.next_user_id;
        state.next_user_id += 1;
        state.users.push(UserRecord {
            id,
            nombre: user.nombre,
            email: user.email,
            password: hash,
            rol: user.rol,
            token: None,
        });
        Ok(RegisterOutcome::Created)
    }

    async fn login(&self, email: &str, password: &str) -> Option<AuthenticatedUser> {
        let mut state = self.state();
        let record = state.users.iter_mut().find(|u| u.email == email)?;
        if !security::verify_password(password, &record.password) {
            return None;
        }
        let token = security::generate_token();
        record.token = Some(token.clone());
        Some(AuthenticatedUser {
            id: record.id,
            nombre: record.nombre.clone(),
            email: record.email.clone(),
            rol: record.rol,
            token,
        })
    }

    async fn find_by_token(&self, token: &str) -> Option<User> {
        if token.is_empty() {
            return None;
        }
        self.state()
            .users
            .iter()
            .find(|u| u.token.as_deref() == Some(token))
            .map(project)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.state().users.iter().map(project).collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.state().products.clone())
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        Ok(self
            .state()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn create_product(&self, record: ProductRecord) -> bool {
        let mut state = self.state();
        let id = state.next_product_id;
        state.next_product_id += 1;
        state.products.push(Product {
            id,
            nombre: record.nombre,
            descripcion: record.descripcion,
            precio: record.precio,
            imagen: record.imagen,
            stock: record.stock,
        });
        true
    }

    async fn update_product(&self, id: i64, record: ProductRecord) -> bool {
        let mut state = self.state();
        match state.products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.nombre = record.nombre;
                product.descripcion = record.descripcion;
                product.precio = record.precio;
                product.imagen = record.imagen;
                product.stock = record.stock;
                true
            }
            None => false,
        }
    }

    async fn delete_product(&self, id: i64) -> bool {
        let mut state = self.state();
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        state.products.len() < before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, rol: Role) -> NewUser {
        NewUser {
            nombre: "Test".to_string(),
            email: email.to_string(),
            password: "p4ssword".to_string(),
            rol,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_not_a_second_row() {
        let repo = MemoryRepository::new();
        assert_eq!(
            repo.register(new_user("a@x.com", Role::Cliente)).await.unwrap(),
            RegisterOutcome::Created
        );
        assert_eq!(
            repo.register(new_user("a@x.com", Role::Admin)).await.unwrap(),
            RegisterOutcome::EmailExists
        );
        let users = repo.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        // The original record is untouched.
        assert_eq!(users[0].rol, Role::Cliente);
    }

    #[tokio::test]
    async fn login_rotates_the_token_and_invalidates_the_old_one() {
        let repo = MemoryRepository::new();
        repo.register(new_user("a@x.com", Role::Cliente)).await.unwrap();

        let first = repo.login("a@x.com", "p4ssword").await.unwrap();
        let second = repo.login("a@x.com", "p4ssword").await.unwrap();
        assert_ne!(first.token, second.token);

        assert!(repo.find_by_token(&first.token).await.is_none());
        assert!(repo.find_by_token(&second.token).await.is_some());
    }

    #[tokio::test]
    async fn login_fails_closed() {
        let repo = MemoryRepository::new();
        repo.register(new_user("a@x.com", Role::Cliente)).await.unwrap();

        assert!(repo.login("a@x.com", "wrong").await.is_none());
        assert!(repo.login("nobody@x.com", "p4ssword").await.is_none());
    }

    #[tokio::test]
    async fn empty_token_never_resolves() {
        let repo = MemoryRepository::new();
        repo.register(new_user("a@x.com", Role::Cliente)).await.unwrap();
        assert!(repo.find_by_token("").await.is_none());
        assert!(repo.find_by_token("deadbeef").await.is_none());
    }

    #[tokio::test]
    async fn product_crud_roundtrip() {
        let repo = MemoryRepository::new();
        assert!(
            repo.create_product(ProductRecord {
                nombre: "Widget".into(),
                descripcion: "d".into(),
                precio: 9.99,
                imagen: None,
                stock: 5,
            })
            .await
        );

        let listed = repo.list_products().await.unwrap();
        assert_eq!(listed.len(), 1);
        let id = listed[0].id;

        assert!(
            repo.update_product(
                id,
                ProductRecord {
                    nombre: "Widget 2".into(),
                    descripcion: "d2".into(),
                    precio: 19.99,
                    imagen: Some("foto.png".into()),
                    stock: 3,
                },
            )
            .await
        );
        let updated = repo.get_product(id).await.unwrap().unwrap();
        assert_eq!(updated.nombre, "Widget 2");
        assert_eq!(updated.imagen.as_deref(), Some("foto.png"));

        assert!(repo.delete_product(id).await);
        assert!(!repo.delete_product(id).await);
        assert!(repo.get_product(id).await.unwrap().is_none());
    }
}
