#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use dossier::application::ports::{
    BlobStore, CompletionOptions, DispatchError, LlmClient, LlmClientError, TaskDispatcher,
};
use dossier::domain::PipelineTask;
use dossier::infrastructure::storage::ObjectBlobStore;

pub const USER: &str = "ada@example.com";

pub fn memory_store() -> Arc<dyn BlobStore> {
    Arc::new(ObjectBlobStore::in_memory())
}

pub async fn put_text(store: &Arc<dyn BlobStore>, key: &str, text: &str) {
    store
        .put(key, Bytes::from(text.to_string()), "text/plain")
        .await
        .expect("put should succeed");
}

pub async fn get_json(store: &Arc<dyn BlobStore>, key: &str) -> serde_json::Value {
    let bytes = store.get(key).await.expect("object should exist");
    serde_json::from_slice(&bytes).expect("object should be JSON")
}

/// Replies from a queue in call order; an empty queue answers with an upstream error.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmClientError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, LlmClientError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Holds every reply back for `delay`, like a slow upstream.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn replying(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        _system_message: &str,
        prompt: &str,
        _options: CompletionOptions,
    ) -> Result<String, LlmClientError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.replies.lock().unwrap().pop_front();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        reply.unwrap_or_else(|| Err(LlmClientError::UpstreamError("no scripted reply".into())))
    }
}

/// Records dispatched tasks; optionally refuses them.
#[derive(Default)]
pub struct RecordingDispatcher {
    tasks: Mutex<Vec<PipelineTask>>,
    refuse: bool,
}

impl RecordingDispatcher {
    pub fn refusing() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            refuse: true,
        }
    }

    pub fn tasks(&self) -> Vec<PipelineTask> {
        self.tasks.lock().unwrap().clone()
    }
}

impl TaskDispatcher for RecordingDispatcher {
    fn dispatch(&self, task: PipelineTask) -> Result<(), DispatchError> {
        if self.refuse {
            return Err(DispatchError::QueueFull);
        }
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}
