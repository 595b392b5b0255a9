//! Generator trait

pub use weaver_core::Availability;

/// Result type for generation calls
pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
}

/// Text generation service. Retry and backoff belong to implementations;
/// callers make one attempt per cycle.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> LlmResult<String>;

    async fn probe(&self) -> Availability {
        Availability::Available
    }
}
