//! Fetch → transform → sink, driven as an explicit state machine.
//!
//! Each state owns exactly the data the next stage needs, so handoff between
//! stages is a typed value rather than a shared result store:
//!
//! ```text
//! Fetching ──RawObservation──► Transforming ──RunContext──► Sinking ──► Done
//!     │                            │                          │
//!     └────────────────────────────┴──────────────────────────┴──────► Failed
//! ```

use std::fmt;

use thiserror::Error;

use crate::blob::{AnyBlobStore, BlobStore};
use crate::config::{ConfigError, Credentials, PipelineConfig};
use crate::context::{BlobKey, RunContext, TriggerTimestamp};
use crate::error::PipelineError;
use crate::record::RawObservation;
use crate::sink::Sink;
use crate::staging::Staging;
use crate::transform::transform;
use crate::weather::{OpenWeatherClient, WeatherSource};

/// Stage a run was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Transform,
    Sink,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Transform => "transform",
            Stage::Sink => "sink",
        };
        f.write_str(name)
    }
}

/// State of one pipeline run.
#[derive(Debug)]
pub enum RunState {
    Fetching,
    Transforming(RawObservation),
    Sinking(RunContext),
    Done(RunSummary),
    Failed(RunFailure),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done(_) | RunState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunState::Fetching => "Fetching",
            RunState::Transforming(_) => "Transforming",
            RunState::Sinking(_) => "Sinking",
            RunState::Done(_) => "Done",
            RunState::Failed(_) => "Failed",
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub trigger: TriggerTimestamp,
    pub container: String,
    pub key: BlobKey,
}

/// A run that aborted, with the stage it aborted in.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {error}")]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

/// The three stages wired together for repeated runs.
pub struct Pipeline<W, B> {
    source: W,
    staging: Staging,
    sink: Sink<B>,
}

impl Pipeline<OpenWeatherClient, AnyBlobStore> {
    /// Build the production pipeline from configuration and credentials.
    pub fn from_config(
        config: &PipelineConfig,
        credentials: &Credentials,
    ) -> Result<Self, ConfigError> {
        let source =
            OpenWeatherClient::new(&config.api, &config.location, &credentials.api_key)?;
        let store = AnyBlobStore::from_connection(&credentials.blob_connection)?;
        log::info!(
            "Blob backend: {}, container '{}'",
            store.backend_name(),
            config.storage.container
        );
        Ok(Self::new(
            source,
            Staging::new(&config.staging.path),
            Sink::new(store, &config.storage.container),
        ))
    }
}

impl<W: WeatherSource, B: BlobStore> Pipeline<W, B> {
    pub fn new(source: W, staging: Staging, sink: Sink<B>) -> Self {
        Self {
            source,
            staging,
            sink,
        }
    }

    pub fn sink(&self) -> &Sink<B> {
        &self.sink
    }

    /// Execute one run for `trigger` from `Fetching` to a terminal state.
    pub async fn run(&self, trigger: &TriggerTimestamp) -> Result<RunSummary, RunFailure> {
        let mut state = RunState::Fetching;
        loop {
            state = match state {
                RunState::Done(summary) => {
                    log::info!("[{}] Done: {}/{}", trigger, summary.container, summary.key);
                    return Ok(summary);
                }
                RunState::Failed(failure) => {
                    log::error!(
                        "[{}] Failed in {} stage ({}): {}",
                        trigger,
                        failure.stage,
                        failure.error.kind(),
                        failure.error
                    );
                    return Err(failure);
                }
                active => {
                    log::info!("[{}] {}", trigger, active.name());
                    self.step(active, trigger).await
                }
            };
        }
    }

    /// Advance a non-terminal state by one stage.
    pub async fn step(&self, state: RunState, trigger: &TriggerTimestamp) -> RunState {
        match state {
            RunState::Fetching => match self.source.fetch().await {
                Ok(raw) => RunState::Transforming(raw),
                Err(error) => failed(Stage::Fetch, error),
            },
            RunState::Transforming(raw) => match transform(&raw, &self.staging).await {
                Ok(staged) => RunState::Sinking(RunContext::new(staged, trigger.clone())),
                Err(error) => failed(Stage::Transform, error),
            },
            RunState::Sinking(ctx) => match self.sink.upload(&ctx).await {
                Ok(key) => RunState::Done(RunSummary {
                    trigger: ctx.trigger,
                    container: self.sink.container().to_string(),
                    key,
                }),
                Err(error) => failed(Stage::Sink, error),
            },
            terminal => terminal,
        }
    }
}

fn failed(stage: Stage, error: PipelineError) -> RunState {
    RunState::Failed(RunFailure { stage, error })
}
