//! In-process vision model used by unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{AnalysisError, Result};
use crate::gemini::{GenerationRequest, VisionModel};
use crate::models::{ImagePayload, MediaType, RawModelResponse};

pub(crate) const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

pub(crate) fn png_payload() -> ImagePayload {
    ImagePayload::new(PNG_MAGIC.to_vec(), MediaType::Png).unwrap()
}

pub(crate) enum Reply {
    Text(&'static str, u32),
    Status(u16),
}

/// Answers calls from a fixed script and records every prompt it saw.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    pub(crate) requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn generate(&self, request: GenerationRequest) -> Result<RawModelResponse> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(text, tokens_used)) => Ok(RawModelResponse {
                text: text.to_string(),
                tokens_used,
            }),
            Some(Reply::Status(status)) => Err(AnalysisError::Transport {
                status,
                body: "scripted failure".to_string(),
            }),
            None => Err(AnalysisError::ResponseShape("script exhausted".to_string())),
        }
    }
}
