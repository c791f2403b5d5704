use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{AnalysisError, Result};
use crate::models::PromptVariant;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the vision endpoint, read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let timeout_secs = match env::var("GEMINI_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AnalysisError::Config(format!("GEMINI_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AnalysisError::Config("GEMINI_API_KEY must be set".to_string()))
    }
}

/// Sampling parameters sent with every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    pub const fn new(temperature: f32, top_p: f32, max_output_tokens: u32) -> Self {
        Self {
            temperature,
            top_k: 40,
            top_p,
            max_output_tokens,
        }
    }

    pub fn for_variant(variant: PromptVariant) -> Self {
        match variant {
            PromptVariant::ZeroShot => Self::new(0.3, 0.9, 1200),
            PromptVariant::OneShot => Self::new(0.2, 0.8, 2000),
            PromptVariant::MultiShot => Self::new(0.3, 0.9, 2500),
            PromptVariant::ChainOfThought => Self::new(0.3, 0.9, 3000),
            PromptVariant::Dynamic => Self::general(None),
        }
    }

    /// The single-call general analysis; temperature is caller-tunable.
    pub fn general(temperature: Option<f32>) -> Self {
        Self::new(temperature.unwrap_or(0.3), 0.9, 2000)
    }

    /// Both calls of an adaptive session.
    pub fn adaptive() -> Self {
        Self::new(0.4, 0.9, 2000)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }
}
