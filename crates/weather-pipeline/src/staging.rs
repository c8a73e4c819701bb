//! Local staging area between the transform stage and the sink.

use std::path::{Path, PathBuf};

use crate::context::StagedArtifact;
use crate::error::{PipelineError, Result};
use crate::record::NormalizedRecord;

/// A single JSON file holding the latest run's normalized record.
///
/// Only one staged artifact has to exist at a time, so every run writes the
/// same path. Nothing is cleaned up after the sink reads it.
#[derive(Debug, Clone)]
pub struct Staging {
    path: PathBuf,
}

impl Staging {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `record` to the staging path.
    pub async fn write(&self, record: &NormalizedRecord) -> Result<StagedArtifact> {
        let bytes = record.to_json()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PipelineError::StagingWrite(format!("{}: {}", parent.display(), e))
            })?;
        }
        tokio::fs::write(&self.path, &bytes)
            .await
            .map_err(|e| PipelineError::StagingWrite(format!("{}: {}", self.path.display(), e)))?;

        log::debug!("Staged {} bytes at {}", bytes.len(), self.path.display());

        Ok(StagedArtifact {
            country: record.country.clone(),
            city: record.city.clone(),
            handle: self.path.clone(),
        })
    }
}

/// Read a staged artifact back.
pub async fn read_staged(handle: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(handle)
        .await
        .map_err(|e| PipelineError::StagingRead(format!("{}: {}", handle.display(), e)))
}
