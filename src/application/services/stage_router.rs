use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::ports::TaskDispatcher;
use crate::domain::{PipelineTask, Stage, StorageEvent, StorageKey};

pub const DEFAULT_RAW_MAX_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_NORMALIZED_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Size-based admission limits per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterLimits {
    pub raw_max_bytes: u64,
    pub normalized_max_bytes: u64,
}

impl Default for RouterLimits {
    fn default() -> Self {
        Self {
            raw_max_bytes: DEFAULT_RAW_MAX_BYTES,
            normalized_max_bytes: DEFAULT_NORMALIZED_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InvalidKey(String),
    NotData,
    TooLarge { size: u64, limit: u64 },
    ReservedKey,
    NoDownstream(Stage),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidKey(reason) => write!(f, "invalid key: {reason}"),
            SkipReason::NotData => f.write_str("not a data object"),
            SkipReason::TooLarge { size, limit } => {
                write!(f, "too large: {size} bytes exceeds {limit}")
            }
            SkipReason::ReservedKey => f.write_str("reserved key"),
            SkipReason::NoDownstream(stage) => write!(f, "no processor for stage {stage}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Dispatch(PipelineTask),
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteStatus {
    Dispatched(&'static str),
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    pub key: String,
    pub status: RouteStatus,
}

/// Maps storage-change notifications to downstream processors. Pure dispatch.
pub struct StageRouter {
    dispatcher: Arc<dyn TaskDispatcher>,
    limits: RouterLimits,
}

impl StageRouter {
    pub fn new(dispatcher: Arc<dyn TaskDispatcher>, limits: RouterLimits) -> Self {
        Self { dispatcher, limits }
    }

    pub fn decide(&self, event: &StorageEvent) -> RouteDecision {
        let key = match StorageKey::parse(&event.key) {
            Ok(key) => key,
            Err(e) => return RouteDecision::Skip(SkipReason::InvalidKey(e.to_string())),
        };

        if !key.is_data_object() {
            return RouteDecision::Skip(SkipReason::NotData);
        }

        match key.stage() {
            Stage::Raw if event.size_bytes > self.limits.raw_max_bytes => {
                RouteDecision::Skip(SkipReason::TooLarge {
                    size: event.size_bytes,
                    limit: self.limits.raw_max_bytes,
                })
            }
            Stage::Raw => RouteDecision::Dispatch(PipelineTask::Normalize(key)),
            Stage::Normalized if event.size_bytes > self.limits.normalized_max_bytes => {
                RouteDecision::Skip(SkipReason::TooLarge {
                    size: event.size_bytes,
                    limit: self.limits.normalized_max_bytes,
                })
            }
            Stage::Normalized => RouteDecision::Dispatch(PipelineTask::Categorize(key)),
            Stage::Categorized if key.is_master_profile() => {
                RouteDecision::Skip(SkipReason::ReservedKey)
            }
            Stage::Categorized => RouteDecision::Dispatch(PipelineTask::BuildPersonas(key)),
            Stage::Personas => RouteDecision::Skip(SkipReason::NoDownstream(Stage::Personas)),
        }
    }

    /// Routes one notification. Dispatch failures are reported, never raised.
    pub fn route(&self, event: &StorageEvent) -> RouteOutcome {
        let status = match self.decide(event) {
            RouteDecision::Dispatch(task) => {
                let kind = task.as_str();
                match self.dispatcher.dispatch(task) {
                    Ok(()) => {
                        tracing::info!(key = %event.key, task = kind, "Dispatched");
                        RouteStatus::Dispatched(kind)
                    }
                    Err(e) => {
                        tracing::error!(key = %event.key, task = kind, error = %e, "Dispatch failed");
                        RouteStatus::Failed(e.to_string())
                    }
                }
            }
            RouteDecision::Skip(reason) => {
                tracing::debug!(key = %event.key, reason = %reason, "Skipped notification");
                RouteStatus::Skipped(reason)
            }
        };

        RouteOutcome {
            key: event.key.clone(),
            status,
        }
    }

    /// Routes a batch in arrival order; one failure never stops the rest.
    pub fn route_batch(&self, events: &[StorageEvent]) -> Vec<RouteOutcome> {
        events.iter().map(|event| self.route(event)).collect()
    }

    /// Consumes notifications emitted by the storage layer until the channel closes.
    pub async fn run(self: Arc<Self>, mut receiver: mpsc::Receiver<StorageEvent>) {
        tracing::info!("Stage router started");
        while let Some(event) = receiver.recv().await {
            self.route(&event);
        }
        tracing::info!("Stage router stopped: channel closed");
    }
}
