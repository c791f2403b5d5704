use thiserror::Error;
use xray_flow::FlowError;

use crate::prompts::TemplateError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Non-success HTTP status from the vision endpoint, body kept verbatim.
    #[error("API call failed: {status} - {body}")]
    Transport { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The endpoint answered but the candidate text path was missing.
    #[error("Invalid response from API: {0}")]
    ResponseShape(String),

    #[error("an analysis is already running for {0}")]
    Busy(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<AnalysisError>,
    },

    #[error("workflow error: {0}")]
    Workflow(#[from] FlowError),

    #[error("unknown model: {0}")]
    UnknownModel(String),
}

/// Coarse grouping used by outer surfaces to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Upstream,
    Busy,
    Internal,
}

impl AnalysisError {
    pub fn stage(stage: &'static str, source: AnalysisError) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::UnknownModel(_) => ErrorKind::InvalidInput,
            Self::Transport { .. } | Self::Network(_) | Self::ResponseShape(_) => {
                ErrorKind::Upstream
            }
            Self::Busy(_) => ErrorKind::Busy,
            Self::Stage { source, .. } => source.kind(),
            Self::Template(_) | Self::Config(_) | Self::Workflow(_) => ErrorKind::Internal,
        }
    }

    /// Recover a typed error that travelled through the workflow engine.
    pub fn from_flow(err: FlowError) -> Self {
        match err {
            FlowError::StepFailed { step_id, source } => {
                match source.downcast::<AnalysisError>() {
                    Ok(inner) => *inner,
                    Err(source) => Self::Workflow(FlowError::StepFailed { step_id, source }),
                }
            }
            other => Self::Workflow(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wrapping_keeps_message_and_kind() {
        let err = AnalysisError::stage(
            "Initial assessment",
            AnalysisError::Transport {
                status: 429,
                body: "quota".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "Initial assessment failed: API call failed: 429 - quota"
        );
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[test]
    fn flow_errors_are_unwrapped() {
        let flow = FlowError::step_failed(
            "follow_up",
            AnalysisError::ResponseShape("no candidates".to_string()),
        );
        let err = AnalysisError::from_flow(flow);
        assert!(matches!(err, AnalysisError::ResponseShape(_)));
    }
}
