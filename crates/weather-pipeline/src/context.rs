//! Per-run metadata handed from the transform stage to the sink.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Logical run time supplied by the scheduler.
///
/// Used verbatim in blob keys. It is the scheduled slot of the run, not the
/// wall-clock time at which the run happened to execute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerTimestamp(String);

impl TriggerTimestamp {
    pub fn new(ts: impl Into<String>) -> Self {
        Self(ts.into())
    }

    /// Format a scheduled slot as `YYYY-MM-DDTHH:MM:SS+00:00`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the transform stage left the serialized record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub country: String,
    pub city: String,
    pub handle: PathBuf,
}

/// Everything the sink needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub country: String,
    pub city: String,
    pub staging_handle: PathBuf,
    pub trigger: TriggerTimestamp,
}

impl RunContext {
    pub fn new(staged: StagedArtifact, trigger: TriggerTimestamp) -> Self {
        Self {
            country: staged.country,
            city: staged.city,
            staging_handle: staged.handle,
            trigger,
        }
    }

    pub fn blob_key(&self) -> BlobKey {
        BlobKey::new(&self.country, &self.city, &self.trigger)
    }
}

/// Deterministic object key for a (country, city, trigger) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    pub fn new(country: &str, city: &str, trigger: &TriggerTimestamp) -> Self {
        Self(format!(
            "{country}_{city}_weather_data/{trigger}_{country}_{city}_processed_weather_data.json"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
