use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use xray_flow::{
    FlowRunner, InMemorySessionStorage, Pipeline, PipelineBuilder, Session, SessionStatus,
    SessionStorage,
};

use super::steps::{
    ComplexityTriageStep, FollowUpStep, INITIAL_STEP_ID, InitialAssessmentStep, TRIAGE_STEP_ID,
    keys, routed_to,
};
use crate::busy::BusyRegistry;
use crate::error::{AnalysisError, Result};
use crate::gemini::VisionModel;
use crate::models::{
    AdaptiveState, AnalysisSession, FollowUpCategory, ImagePayload, PatientContext,
};

pub const PIPELINE_ID: &str = "adaptive_analysis";

/// Initial assessment, then triage, then exactly one follow-up.
pub fn build_pipeline(model: Arc<dyn VisionModel>) -> Pipeline {
    let mut builder = PipelineBuilder::new(PIPELINE_ID)
        .add_step(Arc::new(InitialAssessmentStep::new(model.clone())))
        .add_step(Arc::new(ComplexityTriageStep))
        .add_edge(INITIAL_STEP_ID, TRIAGE_STEP_ID);

    for category in FollowUpCategory::ALL {
        builder = builder
            .add_step(Arc::new(FollowUpStep::new(category, model.clone())))
            .add_conditional_edge(TRIAGE_STEP_ID, category.as_str(), routed_to(category));
    }

    builder.build()
}

/// Drives the two-call adaptive protocol and keeps the latest session of
/// each owner.
#[derive(Clone)]
pub struct AdaptiveController {
    runner: FlowRunner,
    busy: BusyRegistry,
    latest: Arc<DashMap<String, String>>,
}

impl AdaptiveController {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self::with_storage(model, Arc::new(InMemorySessionStorage::new()))
    }

    pub fn with_storage(model: Arc<dyn VisionModel>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            runner: FlowRunner::new(Arc::new(build_pipeline(model)), storage),
            busy: BusyRegistry::new(),
            latest: Arc::new(DashMap::new()),
        }
    }

    /// Share the busy registry with other entry points, so one owner cannot
    /// run a single-call and an adaptive analysis at the same time.
    pub fn with_busy_registry(mut self, busy: BusyRegistry) -> Self {
        self.busy = busy;
        self
    }

    /// Run a complete adaptive analysis for `owner`. Fails with
    /// [`AnalysisError::Busy`] if that owner already has one running.
    pub async fn start(
        &self,
        owner: &str,
        image: &ImagePayload,
        patient: PatientContext,
    ) -> Result<AnalysisSession> {
        let session_id = self.open(image, patient).await?;
        self.run(owner, &session_id).await
    }

    /// Create a session in `AwaitingInitial` without calling the model.
    pub async fn open(&self, image: &ImagePayload, patient: PatientContext) -> Result<String> {
        let session = self.runner.pipeline().new_session()?;
        let context = &session.context;
        context.set(keys::IMAGE, image.to_inline()).await?;
        context.set(keys::PATIENT, &patient).await?;
        context.set(keys::STATE, AdaptiveState::AwaitingInitial).await?;

        let session_id = session.id.clone();
        self.runner.storage().save(session).await?;
        info!(
            session_id = %session_id,
            provided_fields = patient.provided_fields(),
            "Adaptive session opened"
        );
        Ok(session_id)
    }

    /// Run an opened session to the end. Either model call failing leaves the
    /// session `Failed` and returns that call's error.
    ///
    /// Starting a run discards the owner's previous session. Once the run
    /// ends the image is dropped from the stored context.
    pub async fn run(&self, owner: &str, session_id: &str) -> Result<AnalysisSession> {
        let _guard = self.busy.try_acquire(owner)?;
        self.replace_latest(owner, session_id).await?;

        let result = self.runner.run_to_completion(session_id).await;
        if let Err(e) = self.release_image(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to drop session image");
        }

        match result {
            Ok(session) => {
                let analysis = to_analysis_session(&session);
                info!(
                    session_id = %session_id,
                    follow_up = ?analysis.follow_up,
                    total_tokens = analysis.total_tokens(),
                    "Adaptive analysis complete"
                );
                Ok(analysis)
            }
            Err(e) => {
                let err = AnalysisError::from_flow(e);
                warn!(session_id = %session_id, error = %err, "Adaptive analysis failed");
                Err(err)
            }
        }
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<AnalysisSession>> {
        let session = self.runner.storage().get(session_id).await?;
        Ok(session.as_ref().map(to_analysis_session))
    }

    /// Discard a session. Does not interrupt a call already in flight.
    pub async fn clear(&self, session_id: &str) -> Result<()> {
        self.runner.storage().delete(session_id).await?;
        info!(session_id = %session_id, "Adaptive session cleared");
        Ok(())
    }

    pub fn is_busy(&self, owner: &str) -> bool {
        self.busy.is_busy(owner)
    }

    async fn replace_latest(&self, owner: &str, session_id: &str) -> Result<()> {
        let previous = self
            .latest
            .insert(owner.to_string(), session_id.to_string());
        if let Some(previous) = previous.filter(|id| id != session_id) {
            self.runner.storage().delete(&previous).await?;
            debug!(owner = %owner, session_id = %previous, "Previous adaptive session discarded");
        }
        Ok(())
    }

    async fn release_image(&self, session_id: &str) -> Result<()> {
        let storage = self.runner.storage();
        if let Some(session) = storage.get(session_id).await? {
            session.context.remove(keys::IMAGE).await;
            storage.save(session).await?;
        }
        Ok(())
    }
}

fn to_analysis_session(session: &Session) -> AnalysisSession {
    let context = &session.context;
    let mut state = context
        .get_sync(keys::STATE)
        .unwrap_or(AdaptiveState::AwaitingInitial);
    let mut error: Option<String> = context.get_sync(keys::ERROR);

    if let SessionStatus::Failed(message) = &session.status {
        state = AdaptiveState::Failed;
        error.get_or_insert_with(|| message.clone());
    }

    AnalysisSession {
        session_id: session.id.clone(),
        state,
        patient_context: context.get_sync(keys::PATIENT).unwrap_or_default(),
        complexity: context.get_sync(keys::COMPLEXITY),
        follow_up: context.get_sync(keys::FOLLOW_UP),
        steps: context.get_sync(keys::STEPS).unwrap_or_default(),
        error,
        created_at: session.created_at,
    }
}
