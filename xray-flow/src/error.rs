use thiserror::Error;

/// Errors raised while driving a pipeline.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("step not found: {0}")]
    StepNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("context error: {0}")]
    ContextError(String),

    #[error("step {step_id} failed: {source}")]
    StepFailed {
        step_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("session {0} already finished")]
    SessionFinished(String),

    #[error("pipeline {pipeline_id} exceeded {limit} steps")]
    StepLimitExceeded { pipeline_id: String, limit: usize },

    #[error("storage error: {0}")]
    StorageError(String),
}

impl FlowError {
    /// Wrap a step's own error type so callers can downcast it later.
    pub fn step_failed(
        step_id: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StepFailed {
            step_id: step_id.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
