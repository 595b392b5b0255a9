//! Offline generators: a deterministic note writer for scheduled runs without
//! a provider, and a scripted generator that replays canned replies.

use crate::protocol::task_cycle;
use crate::provider::{Availability, Generator, LlmError, LlmResult};
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Emits one note file per call, named after the cycle tag found in the prompt.
pub struct DeterministicGenerator {
    notes_dir: String,
}

impl DeterministicGenerator {
    pub fn new(notes_dir: impl Into<String>) -> Self {
        Self {
            notes_dir: notes_dir.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for DeterministicGenerator {
    fn default() -> Self {
        Self::new("weaver/notes")
    }
}

#[async_trait::async_trait]
impl Generator for DeterministicGenerator {
    fn name(&self) -> &str {
        "deterministic"
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let step = task_cycle(prompt).unwrap_or(0);
        let target = format!(
            "{}/autonomy_step_{}_{}.txt",
            self.notes_dir,
            chrono::Utc::now().timestamp(),
            step
        );
        Ok(format!(
            "--- FILE: {} ---\nScheduled autonomous patch (step {})\n",
            target, step
        ))
    }
}

/// Replays queued replies in order. Once the queue is empty every call
/// returns an empty reply, which parses to no file blocks.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<LlmResult<String>>>,
    prompts: Mutex<Vec<String>>,
    availability: Availability,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            availability: Availability::Available,
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Err(LlmError::RequestFailed(message.into())))
    }

    pub fn rate_limited(self, retry_after_ms: u64) -> Self {
        self.push(Err(LlmError::RateLimited { retry_after_ms }))
    }

    pub fn degraded(mut self, reason: impl Into<String>) -> Self {
        self.availability = Availability::Degraded(reason.into());
        self
    }

    fn push(mut self, reply: LlmResult<String>) -> Self {
        self.replies.get_mut().push_back(reply);
        self
    }

    /// Prompts received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        self.prompts.lock().await.push(prompt.to_string());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }

    async fn probe(&self) -> Availability {
        self.availability.clone()
    }
}
