//! Blob storage backends for the sink.
//!
//! Every backend implements [`BlobStore::put`] with an explicit overwrite
//! flag. With overwrite disabled an existing object at the key is reported as
//! [`BlobError::AlreadyExists`] and left untouched.
//!
//! - [`memory`] — in-process map, for dry runs and tests.
//! - [`fs`] — local directory, one sub-directory per container.
//! - [`azure`] — Azure Blob REST `Put Blob` authorized with a SAS token.

pub mod azure;
pub mod fs;
pub mod memory;

use thiserror::Error;

use crate::config::ConfigError;

pub use azure::AzureBlobStore;
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Errors from blob backends.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob '{key}' already exists in container '{container}'")]
    AlreadyExists { container: String, key: String },

    #[error("{0}")]
    Unavailable(String),
}

/// Hierarchical key-value object store.
pub trait BlobStore: Send + Sync {
    fn put(
        &self,
        container: &str,
        key: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> impl std::future::Future<Output = Result<(), BlobError>> + Send;
}

/// Backend selected by the blob connection identifier.
#[derive(Debug)]
pub enum AnyBlobStore {
    Memory(MemoryBlobStore),
    Fs(FsBlobStore),
    Azure(AzureBlobStore),
}

impl AnyBlobStore {
    /// Build a backend from a connection identifier.
    ///
    /// Accepted forms:
    /// - `memory:`
    /// - `file:///some/dir` or a bare filesystem path
    /// - an Azure connection string carrying `SharedAccessSignature` and
    ///   either `BlobEndpoint` or `AccountName`
    pub fn from_connection(connection: &str) -> Result<Self, ConfigError> {
        let connection = connection.trim();
        if connection == "memory:" {
            return Ok(Self::Memory(MemoryBlobStore::new()));
        }
        if let Some(path) = connection.strip_prefix("file://") {
            return Ok(Self::Fs(FsBlobStore::new(path)));
        }
        if connection.contains('=') {
            return Ok(Self::Azure(AzureBlobStore::from_connection_string(
                connection,
            )?));
        }
        if connection.is_empty() || connection.contains("://") {
            return Err(ConfigError::UnsupportedConnection(
                "expected memory:, file://<dir>, a path or an Azure connection string".into(),
            ));
        }
        Ok(Self::Fs(FsBlobStore::new(connection)))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            AnyBlobStore::Memory(_) => "memory",
            AnyBlobStore::Fs(_) => "filesystem",
            AnyBlobStore::Azure(_) => "azure",
        }
    }
}

impl BlobStore for AnyBlobStore {
    async fn put(
        &self,
        container: &str,
        key: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> Result<(), BlobError> {
        match self {
            AnyBlobStore::Memory(s) => s.put(container, key, bytes, overwrite).await,
            AnyBlobStore::Fs(s) => s.put(container, key, bytes, overwrite).await,
            AnyBlobStore::Azure(s) => s.put(container, key, bytes, overwrite).await,
        }
    }
}
