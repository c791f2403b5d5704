use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{context::Context, error::Result};

/// Outcome of running a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Human-readable progress note, surfaced on the session
    pub status_message: Option<String>,
    /// Where to go next
    pub next_action: NextAction,
    /// ID of the step that produced this outcome, filled in by the pipeline
    #[serde(default)]
    pub step_id: String,
}

impl StepOutcome {
    pub fn new(next_action: NextAction) -> Self {
        Self {
            status_message: None,
            next_action,
            step_id: String::new(),
        }
    }

    pub fn with_status(next_action: NextAction, status_message: impl Into<String>) -> Self {
        Self {
            status_message: Some(status_message.into()),
            next_action,
            step_id: String::new(),
        }
    }
}

/// What the pipeline does after a step returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextAction {
    /// Follow the first matching outgoing edge
    Continue,
    /// Jump to a specific step by ID
    GoTo(String),
    /// Finish the session
    End,
}

/// A unit of work in a pipeline.
#[async_trait]
pub trait Step: Send + Sync {
    /// Unique identifier for this step within its pipeline
    fn id(&self) -> &str;

    async fn run(&self, context: Context) -> Result<StepOutcome>;
}
