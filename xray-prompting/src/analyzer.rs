use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::GenerationConfig;
use crate::error::Result;
use crate::gemini::{GenerationRequest, VisionModel};
use crate::models::{AnalysisRequest, ParsedFinding, PromptVariant};
use crate::parser::{self, ParserProfile};
use crate::prompts::prompt_for;
use crate::quality::VariantExtras;

/// Result of one single-call analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub variant: PromptVariant,
    pub finding: ParsedFinding,
    pub tokens_used: u32,
    pub elapsed_ms: u64,
    pub temperature: f32,
    pub extras: Option<VariantExtras>,
}

/// Runs the non-adaptive prompt variants: one call, one parse.
#[derive(Clone)]
pub struct Analyzer {
    model: Arc<dyn VisionModel>,
}

impl Analyzer {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome> {
        let variant = request.variant;
        let mut config = GenerationConfig::for_variant(variant);
        if let Some(temperature) = request.temperature {
            config = config.with_temperature(temperature);
        }

        info!(variant = %variant, image_bytes = request.image.len(), "Starting analysis");
        let started = Instant::now();
        let raw = self
            .model
            .generate(GenerationRequest {
                prompt: prompt_for(variant),
                image: request.image.to_inline(),
                config,
            })
            .await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let finding = parser::parse(ParserProfile::for_variant(variant), &raw.text);
        let extras = VariantExtras::for_variant(variant, &raw.text);
        info!(
            variant = %variant,
            diagnosis = ?finding.diagnosis,
            confidence = finding.confidence_percent,
            tokens = raw.tokens_used,
            elapsed_ms,
            "Analysis complete"
        );

        Ok(AnalysisOutcome {
            variant,
            finding,
            tokens_used: raw.tokens_used,
            elapsed_ms,
            temperature: config.temperature,
            extras,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, ErrorKind};
    use crate::models::Diagnosis;
    use crate::parser::steps::FULL_CHAIN;
    use crate::testing::{Reply, ScriptedModel, png_payload};

    #[tokio::test]
    async fn zero_shot_round_trip() {
        let model = Arc::new(ScriptedModel::new(vec![Reply::Text(
            "DIAGNOSIS: No pneumonia detected\nCONFIDENCE: 88%\nREASONING: Clear lungs.\nKEY_FINDINGS: None\nRECOMMENDATIONS: None",
            640,
        )]));
        let analyzer = Analyzer::new(model.clone());

        let outcome = analyzer
            .analyze(AnalysisRequest::new(png_payload(), PromptVariant::ZeroShot))
            .await
            .unwrap();

        assert_eq!(outcome.finding.diagnosis, Diagnosis::NegativeFinding);
        assert_eq!(outcome.finding.confidence_percent, 88);
        assert_eq!(outcome.tokens_used, 640);
        assert_eq!(outcome.temperature, 0.3);
        assert!(outcome.extras.is_none());

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].config.max_output_tokens, 1200);
        assert_eq!(requests[0].image.mime_type, "image/png");
    }

    #[tokio::test]
    async fn chain_of_thought_carries_reasoning_quality() {
        let model = Arc::new(ScriptedModel::new(vec![Reply::Text(FULL_CHAIN, 2100)]));
        let outcome = Analyzer::new(model)
            .analyze(AnalysisRequest::new(png_payload(), PromptVariant::ChainOfThought))
            .await
            .unwrap();

        assert_eq!(outcome.finding.steps.len(), 8);
        assert_eq!(outcome.finding.confidence_percent, 87);
        assert!(matches!(
            outcome.extras,
            Some(VariantExtras::ReasoningQuality(_))
        ));
    }

    #[tokio::test]
    async fn temperature_override_is_clamped() {
        let model = Arc::new(ScriptedModel::new(vec![Reply::Text("Looks normal.", 10)]));
        let mut request = AnalysisRequest::new(png_payload(), PromptVariant::Dynamic);
        request.temperature = Some(3.5);

        let outcome = Analyzer::new(model.clone()).analyze(request).await.unwrap();
        assert_eq!(outcome.temperature, 2.0);
        // Dynamic uses the general profile: no confidence in text gives 75.
        assert_eq!(outcome.finding.confidence_percent, 75);
        assert!(model.prompts()[0].starts_with("# ROLE (R)"));
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Reply::Status(503)]));
        let err = Analyzer::new(model)
            .analyze(AnalysisRequest::new(png_payload(), PromptVariant::OneShot))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Transport { status: 503, .. }));
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }
}
