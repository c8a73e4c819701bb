//! Sink stage: publish the staged record under its deterministic key.

use crate::blob::{BlobError, BlobStore};
use crate::context::{BlobKey, RunContext};
use crate::error::{PipelineError, Result};
use crate::staging::read_staged;

/// Writes staged records into one blob container, never overwriting.
#[derive(Debug)]
pub struct Sink<B> {
    store: B,
    container: String,
}

impl<B: BlobStore> Sink<B> {
    pub fn new(store: B, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Upload the artifact referenced by `ctx` and return the key it went to.
    ///
    /// A second upload for the same (country, city, trigger) fails with
    /// [`PipelineError::DuplicateArtifact`] and leaves the first object as is.
    pub async fn upload(&self, ctx: &RunContext) -> Result<BlobKey> {
        let bytes = read_staged(&ctx.staging_handle).await?;
        let key = ctx.blob_key();

        self.store
            .put(&self.container, key.as_str(), bytes, false)
            .await
            .map_err(|e| match e {
                BlobError::AlreadyExists { container, key } => {
                    PipelineError::DuplicateArtifact { container, key }
                }
                BlobError::Unavailable(msg) => PipelineError::StorageUnavailable(msg),
            })?;

        log::info!("Stored {}/{}", self.container, key);
        Ok(key)
    }
}
