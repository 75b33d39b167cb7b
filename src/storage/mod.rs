//! Object storage capability
//!
//! The engine only lists, reads and writes small objects (manifests and
//! folder listings). Bulk data never passes through this process; the
//! warehouse reads and writes files directly. [`CloudStorage`] is the seam a
//! caller implements on top of their S3, Azure Blob or GCS client.

mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ImportExportError};

pub use memory::MemoryStorage;

/// Object store provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    S3,
    Azure,
    Gcs,
}

impl fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageProvider::S3 => write!(f, "s3"),
            StorageProvider::Azure => write!(f, "azure"),
            StorageProvider::Gcs => write!(f, "gcs"),
        }
    }
}

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for ImportExportError {
    fn from(err: StorageError) -> Self {
        let kind = match &err {
            StorageError::NotFound(_) => ErrorKind::MandatoryFileNotFound,
            StorageError::AccessDenied(_) => ErrorKind::Auth,
            StorageError::Backend(_) => ErrorKind::Unknown,
        };
        ImportExportError::new(kind, err.to_string())
    }
}

/// Access to one provider's object store
#[async_trait]
pub trait CloudStorage: Send + Sync {
    fn provider(&self) -> StorageProvider;

    /// List objects whose key starts with `prefix`, ordered by key
    ///
    /// # Arguments
    /// * `container` - Bucket or Azure container
    /// * `prefix` - Key prefix, may be empty
    async fn list_objects(&self, container: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Read a whole object
    async fn get_object(&self, container: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Create or replace an object
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> StorageResult<()>;
}
