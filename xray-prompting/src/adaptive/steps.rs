//! The workflow steps of an adaptive session.
//!
//! Each step reads what it needs from the session [`Context`] and writes its
//! results back under the keys in [`keys`]. The image is encoded once when the
//! session opens and reused by both model calls.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use xray_flow::{Context, FlowError, NextAction, Step, StepOutcome};

use super::complexity::classify_complexity;
use super::routing::select_follow_up;
use crate::config::GenerationConfig;
use crate::error::AnalysisError;
use crate::gemini::{GenerationRequest, VisionModel};
use crate::models::{
    AdaptiveState, FollowUpCategory, InlineImage, ParsedFinding, PatientContext,
    StepRecord,
};
use crate::parser::{self, ParserProfile, profile::ADAPTIVE_INITIAL};
use crate::prompts::{
    PromptTemplate, Slot, TemplateValues, adaptive::INITIAL, follow_up_template,
    format_patient_context, format_previous_findings,
};

pub mod keys {
    pub const IMAGE: &str = "image";
    pub const PATIENT: &str = "patient_context";
    pub const STATE: &str = "state";
    pub const INITIAL_FINDING: &str = "initial_finding";
    pub const COMPLEXITY: &str = "complexity";
    pub const FOLLOW_UP: &str = "follow_up";
    pub const STEPS: &str = "steps";
    pub const ERROR: &str = "error";
}

pub const INITIAL_STEP_ID: &str = "initial_assessment";
pub const TRIAGE_STEP_ID: &str = "complexity_triage";

const INITIAL_STAGE: &str = "Initial assessment";
const FOLLOW_UP_STAGE: &str = "Adaptive follow-up";

/// Record the failure on the session and hand the error to the pipeline.
async fn fail(
    context: &Context,
    step_id: &str,
    stage: &'static str,
    err: AnalysisError,
) -> FlowError {
    let err = AnalysisError::stage(stage, err);
    warn!(step_id, error = %err, "Adaptive step failed");
    if let Err(e) = context.set(keys::STATE, AdaptiveState::Failed).await {
        return e;
    }
    if let Err(e) = context.set(keys::ERROR, err.to_string()).await {
        return e;
    }
    FlowError::step_failed(step_id, err)
}

/// Render, call and parse. Shared by both model-calling steps.
async fn call_model(
    model: &dyn VisionModel,
    template: &PromptTemplate,
    values: &TemplateValues,
    image: InlineImage,
    profile: &ParserProfile,
    label: String,
) -> Result<StepRecord, AnalysisError> {
    let prompt = template.render(values)?;
    let started = Instant::now();
    let raw = model
        .generate(GenerationRequest {
            prompt,
            image,
            config: GenerationConfig::adaptive(),
        })
        .await?;
    Ok(StepRecord {
        label,
        finding: parser::parse(profile, &raw.text),
        elapsed_ms: started.elapsed().as_millis() as u64,
        tokens_used: raw.tokens_used,
    })
}

pub struct InitialAssessmentStep {
    model: Arc<dyn VisionModel>,
}

impl InitialAssessmentStep {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Step for InitialAssessmentStep {
    fn id(&self) -> &str {
        INITIAL_STEP_ID
    }

    async fn run(&self, context: Context) -> xray_flow::Result<StepOutcome> {
        let image: InlineImage = context.require(keys::IMAGE).await?;
        let patient: PatientContext = context.get(keys::PATIENT).await.unwrap_or_default();
        context.set(keys::STATE, AdaptiveState::InitialInFlight).await?;

        let values =
            TemplateValues::new().with(Slot::PatientContext, format_patient_context(&patient));
        let record = match call_model(
            self.model.as_ref(),
            &INITIAL,
            &values,
            image,
            &ADAPTIVE_INITIAL,
            "Initial Assessment".to_string(),
        )
        .await
        {
            Ok(record) => record,
            Err(e) => return Err(fail(&context, INITIAL_STEP_ID, INITIAL_STAGE, e).await),
        };

        info!(
            diagnosis = %record.finding.diagnosis_text,
            confidence = record.finding.confidence_percent,
            tokens = record.tokens_used,
            "Initial assessment complete"
        );
        context.set(keys::INITIAL_FINDING, &record.finding).await?;
        context.push(keys::STEPS, &record).await?;
        context
            .set(keys::STATE, AdaptiveState::ClassifyingComplexity)
            .await?;

        Ok(StepOutcome::with_status(
            NextAction::Continue,
            "Initial assessment complete",
        ))
    }
}

/// Scores the initial response and picks the follow-up. Makes no model call.
pub struct ComplexityTriageStep;

#[async_trait]
impl Step for ComplexityTriageStep {
    fn id(&self) -> &str {
        TRIAGE_STEP_ID
    }

    async fn run(&self, context: Context) -> xray_flow::Result<StepOutcome> {
        let initial: ParsedFinding = context.require(keys::INITIAL_FINDING).await?;
        let patient: PatientContext = context.get(keys::PATIENT).await.unwrap_or_default();

        let complexity = classify_complexity(&initial.raw_text);
        let follow_up = select_follow_up(&initial.diagnosis_text, complexity, &patient);
        info!(%complexity, %follow_up, "Follow-up selected");

        context.set(keys::COMPLEXITY, complexity).await?;
        context.set(keys::FOLLOW_UP, follow_up).await?;

        Ok(StepOutcome::with_status(
            NextAction::Continue,
            format!("Complexity {complexity}, continuing with {follow_up}"),
        ))
    }
}

/// The second model call, specialised for one follow-up category.
pub struct FollowUpStep {
    category: FollowUpCategory,
    model: Arc<dyn VisionModel>,
}

impl FollowUpStep {
    pub fn new(category: FollowUpCategory, model: Arc<dyn VisionModel>) -> Self {
        Self { category, model }
    }
}

#[async_trait]
impl Step for FollowUpStep {
    fn id(&self) -> &str {
        self.category.as_str()
    }

    async fn run(&self, context: Context) -> xray_flow::Result<StepOutcome> {
        let image: InlineImage = context.require(keys::IMAGE).await?;
        let initial: ParsedFinding = context.require(keys::INITIAL_FINDING).await?;
        let patient: PatientContext = context.get(keys::PATIENT).await.unwrap_or_default();
        context.set(keys::STATE, AdaptiveState::FollowUpInFlight).await?;

        let values = TemplateValues::new()
            .with(Slot::PatientContext, format_patient_context(&patient))
            .with(Slot::PreviousFindings, format_previous_findings(&initial));
        let record = match call_model(
            self.model.as_ref(),
            follow_up_template(self.category),
            &values,
            image,
            ParserProfile::for_follow_up(self.category),
            format!("Follow-up: {}", self.category),
        )
        .await
        {
            Ok(record) => record,
            Err(e) => return Err(fail(&context, self.id(), FOLLOW_UP_STAGE, e).await),
        };

        info!(
            category = %self.category,
            diagnosis = %record.finding.diagnosis_text,
            tokens = record.tokens_used,
            "Follow-up complete"
        );
        context.push(keys::STEPS, &record).await?;
        context.set(keys::STATE, AdaptiveState::Complete).await?;

        Ok(StepOutcome::with_status(NextAction::End, "Adaptive analysis complete"))
    }
}

/// Edge condition: the triage step chose `category`.
pub fn routed_to(category: FollowUpCategory) -> impl Fn(&Context) -> bool + Send + Sync + 'static {
    move |context| context.get_sync::<FollowUpCategory>(keys::FOLLOW_UP) == Some(category)
}
