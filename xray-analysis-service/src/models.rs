use serde::{Deserialize, Serialize};
use xray_prompting::tokens::Strategy;
use xray_prompting::{AnalysisOutcome, MediaType, PatientContext, PromptVariant};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub variant: PromptVariant,
    pub media_type: MediaType,
    pub image_base64: String,
    #[serde(default)]
    pub file_name: Option<String>,
    /// Overrides the variant's sampling temperature, clamped to 0..=2.
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: AnalysisOutcome,
    pub report: String,
}

#[derive(Debug, Deserialize)]
pub struct AdaptiveRequest {
    pub media_type: MediaType,
    pub image_base64: String,
    #[serde(default)]
    pub patient_context: PatientContext,
}

#[derive(Debug, Deserialize)]
pub struct TokenEstimateRequest {
    pub text: String,
    #[serde(default)]
    pub strategy: Option<Strategy>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BenchmarkQuery {
    pub seed: Option<u64>,
    pub cases: Option<usize>,
    pub iterations: Option<usize>,
}
