//! Hourly weather ingestion pipeline.
//!
//! Fetches current observations for a fixed coordinate from the OpenWeather
//! API, normalizes them into a fixed-shape record and stores one JSON object
//! per run in blob storage, keyed by country, city and the run's logical
//! trigger time.
//!
//! # Architecture
//!
//! ```text
//! scheduler ──trigger──► Pipeline
//!                          │
//!        WeatherSource ──► transform ──► Staging ──► Sink ──► BlobStore
//!        (HTTP GET)        (parse)       (JSON file)  (no overwrite)
//! ```
//!
//! # Modules
//!
//! - [`config`] — YAML configuration and credentials from the environment.
//! - [`error`] — Errors that abort a run.
//! - [`record`] — Raw API body and the normalized record.
//! - [`context`] — Trigger timestamp, run context and blob keys.
//! - [`weather`] — Fetch stage (OpenWeather client).
//! - [`transform`] — Transform stage.
//! - [`staging`] — Local staging file between transform and sink.
//! - [`blob`] — Blob storage backends (memory, filesystem, Azure).
//! - [`sink`] — Sink stage.
//! - [`pipeline`] — State machine tying the stages together.
//! - [`scheduler`] — Cron-driven trigger loop.

pub mod blob;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod scheduler;
pub mod sink;
pub mod staging;
pub mod transform;
pub mod weather;

pub use config::{ConfigError, Credentials, PipelineConfig};
pub use context::{BlobKey, RunContext, TriggerTimestamp};
pub use error::PipelineError;
pub use pipeline::{Pipeline, RunFailure, RunSummary, Stage};
