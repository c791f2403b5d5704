use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::{GenerationConfig, Settings};
use crate::error::{AnalysisError, Result};
use crate::models::{InlineImage, RawModelResponse};

/// One outbound call: prompt text plus the image it refers to.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: InlineImage,
    pub config: GenerationConfig,
}

/// The external generative endpoint. Implemented by [`GeminiClient`] and by
/// in-process fakes in tests.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<RawModelResponse>;
}

pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_api_key()?.to_string();
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

pub fn request_body(request: &GenerationRequest) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "text": request.prompt },
                {
                    "inline_data": {
                        "mime_type": request.image.mime_type,
                        "data": request.image.data
                    }
                }
            ]
        }],
        "generationConfig": request.config
    })
}

/// Pull the candidate text and token usage out of a response body.
pub fn parse_response_body(body: &Value) -> Result<RawModelResponse> {
    let text = body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| {
            AnalysisError::ResponseShape("missing candidates[0].content.parts[0].text".to_string())
        })?;
    let tokens_used = body["usageMetadata"]["totalTokenCount"]
        .as_u64()
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX));

    Ok(RawModelResponse {
        text: text.to_string(),
        tokens_used,
    })
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<RawModelResponse> {
        info!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            max_output_tokens = request.config.max_output_tokens,
            "Calling vision model"
        );

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Vision model call failed");
            return Err(AnalysisError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let raw = parse_response_body(&body)?;
        debug!(tokens_used = raw.tokens_used, chars = raw.text.len(), "Vision model responded");
        Ok(raw)
    }
}
