//! Transform stage: raw body to staged normalized record.

use crate::context::StagedArtifact;
use crate::error::Result;
use crate::record::{NormalizedRecord, RawObservation};
use crate::staging::Staging;

/// Parse `raw`, stage the normalized record and report where it went.
///
/// Parsing happens before any filesystem access, so a malformed body never
/// leaves a staged artifact behind.
pub async fn transform(raw: &RawObservation, staging: &Staging) -> Result<StagedArtifact> {
    let record = NormalizedRecord::from_raw(raw)?;
    log::info!(
        "Observation for {}/{} at {}: temp={} humidity={}",
        record.country,
        record.city,
        record.observation_timestamp,
        record.temperature,
        record.humidity
    );
    staging.write(&record).await
}
