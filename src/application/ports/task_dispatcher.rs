use crate::domain::PipelineTask;

/// Fire-and-forget hand-off to a downstream processor. Never waits for the task.
pub trait TaskDispatcher: Send + Sync {
    fn dispatch(&self, task: PipelineTask) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatch queue full")]
    QueueFull,
    #[error("dispatch queue closed")]
    Closed,
}
