use async_trait::async_trait;
use axum::body::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for persisting uploaded product images. The trait lets
/// the handlers stay agnostic of where files land — local disk in production
/// (LocalStorageClient) or nowhere at all during tests (MockStorageService).
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the uploads directory exists. Called once at startup; a no-op
    /// when it is already there.
    async fn ensure_uploads_dir(&self);

    /// Persists an uploaded image and returns the stored filename, which the
    /// caller records as the product's `imagen` reference.
    ///
    /// # Arguments
    /// * `original_name`: the client-provided filename; only its sanitized
    ///   basename survives into the stored name.
    /// * `data`: the raw file bytes.
    async fn save_image(&self, original_name: &str, data: Bytes) -> Result<String, String>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the
/// application state.
pub type StorageState = Arc<dyn StorageService>;

// 2. The Real Implementation (local disk)
/// LocalStorageClient
///
/// Writes images under the configured uploads directory via tokio's async
/// filesystem API. Stored names are `<uuid>_<basename>`: collision-resistant
/// and traversal-safe regardless of what the client named the file.
pub struct LocalStorageClient {
    uploads_dir: PathBuf,
}

impl LocalStorageClient {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
        }
    }
}

#[async_trait]
impl StorageService for LocalStorageClient {
    async fn ensure_uploads_dir(&self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.uploads_dir).await {
            tracing::warn!("could not create uploads dir {:?}: {e}", self.uploads_dir);
        }
    }

    async fn save_image(&self, original_name: &str, data: Bytes) -> Result<String, String> {
        let filename = unique_image_name(original_name);
        let destination = self.uploads_dir.join(&filename);

        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|e| e.to_string())?;
        tokio::fs::write(&destination, &data)
            .await
            .map_err(|e| e.to_string())?;

        Ok(filename)
    }
}

/// unique_image_name
///
/// `<uuid-simple>_<sanitized basename>`. The random prefix makes two uploads
/// of the same filename distinct; the sanitized basename keeps the stored
/// name recognizable.
fn unique_image_name(original: &str) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), sanitize_file_name(original))
}

/// sanitize_file_name
///
/// Reduces a client-provided filename to its basename, discarding directory
/// components (`..`, `/`, `\`) to prevent path traversal. An empty or
/// dot-only result falls back to a fixed placeholder.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "archivo".to_string()
    } else {
        base.to_string()
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// Test double: writes nothing, returns a deterministic stored name so
/// handler assertions stay stable, and can simulate a storage failure.
#[derive(Clone)]
pub struct MockStorageService {
    /// When true, every save returns a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_uploads_dir(&self) {
        // No-op in the mock environment.
    }

    async fn save_image(&self, original_name: &str, _data: Bytes) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock storage error: simulation requested".to_string());
        }
        Ok(format!("mock_{}", sanitize_file_name(original_name)))
    }
}
