use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::Instrument;

use crate::application::ports::{DispatchError, TaskDispatcher};
use crate::domain::PipelineTask;

use super::categorizer::{CategorizeError, CategorizerService};
use super::persona_builder::{PersonaBuildError, PersonaBuilderService};
use super::text_normalizer::{NormalizeError, TextNormalizer};

/// Sending half of the pipeline queue.
#[derive(Clone)]
pub struct ChannelTaskDispatcher {
    sender: mpsc::Sender<PipelineTask>,
}

impl ChannelTaskDispatcher {
    pub fn new(sender: mpsc::Sender<PipelineTask>) -> Self {
        Self { sender }
    }

    /// Bounded queue pair; the receiver goes to a [`PipelineWorker`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PipelineTask>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }
}

impl TaskDispatcher for ChannelTaskDispatcher {
    fn dispatch(&self, task: PipelineTask) -> Result<(), DispatchError> {
        self.sender.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}

/// The three downstream processors a task can land on. The categorizer and
/// the persona builder serialize work per user on their own.
#[derive(Clone)]
pub struct PipelineProcessors {
    pub normalizer: Arc<TextNormalizer>,
    pub categorizer: Arc<CategorizerService>,
    pub persona_builder: Arc<PersonaBuilderService>,
}

impl PipelineProcessors {
    pub async fn execute(&self, task: &PipelineTask) -> Result<(), PipelineTaskError> {
        match task {
            PipelineTask::Normalize(key) => {
                let report = self.normalizer.normalize(key, None).await?;
                if let Some((_, reason)) = report.dispatch_failures.first() {
                    return Err(PipelineTaskError::HandOff {
                        outputs: report.dispatch_failures.len(),
                        reason: reason.clone(),
                    });
                }
            }
            PipelineTask::Categorize(key) => {
                self.categorizer.categorize(key, None).await?;
            }
            PipelineTask::CategorizeSeries { keys, .. } => {
                let report = self.categorizer.categorize_series(keys).await;
                if !report.failed.is_empty() {
                    return Err(PipelineTaskError::SeriesIncomplete {
                        failed: report.failed.len(),
                        total: keys.len(),
                    });
                }
            }
            PipelineTask::BuildPersonas(key) => {
                self.persona_builder.build(key).await?;
            }
        }
        Ok(())
    }
}

/// Drains the pipeline queue, running each task on its own tokio task.
pub struct PipelineWorker {
    receiver: mpsc::Receiver<PipelineTask>,
    processors: PipelineProcessors,
    limiter: Arc<Semaphore>,
}

impl PipelineWorker {
    pub fn new(
        receiver: mpsc::Receiver<PipelineTask>,
        processors: PipelineProcessors,
        max_concurrent_tasks: usize,
    ) -> Self {
        Self {
            receiver,
            processors,
            limiter: Arc::new(Semaphore::new(max_concurrent_tasks.max(1))),
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Pipeline worker started");
        while let Some(task) = self.receiver.recv().await {
            let Ok(permit) = Arc::clone(&self.limiter).acquire_owned().await else {
                break;
            };
            let processors = self.processors.clone();
            let span = tracing::info_span!(
                "pipeline_task",
                task = task.as_str(),
                user_id = %task.key().user_id(),
                key = %task.key(),
            );

            tokio::spawn(
                async move {
                    let _permit = permit;
                    match processors.execute(&task).await {
                        Ok(()) => tracing::debug!("Pipeline task completed"),
                        Err(e) => tracing::error!(error = %e, "Pipeline task failed"),
                    }
                }
                .instrument(span),
            );
        }
        tracing::info!("Pipeline worker stopped: channel closed");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineTaskError {
    #[error("normalize: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("categorize: {0}")]
    Categorize(#[from] CategorizeError),
    #[error("personas: {0}")]
    Personas(#[from] PersonaBuildError),
    #[error("{outputs} normalized outputs not handed off: {reason}")]
    HandOff { outputs: usize, reason: String },
    #[error("{failed} of {total} normalized outputs failed to categorize")]
    SeriesIncomplete { failed: usize, total: usize },
}
