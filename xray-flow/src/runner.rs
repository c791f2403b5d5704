//! `FlowRunner` wraps the load → execute → save cycle around a shared [`Pipeline`].
//!
//! Use [`FlowRunner::step`] when a caller wants to observe every transition, and
//! [`FlowRunner::run_to_completion`] when the whole pipeline should finish inside one
//! request. Either way the session is written back to storage, including when a
//! step fails, so a failed session can still be inspected afterwards.

use std::sync::Arc;

use crate::{
    error::{FlowError, Result},
    pipeline::Pipeline,
    session::{Session, SessionStorage},
    step::StepOutcome,
};

#[derive(Clone)]
pub struct FlowRunner {
    pipeline: Arc<Pipeline>,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(pipeline: Arc<Pipeline>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { pipeline, storage }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Execute exactly one step for `session_id` and persist the result.
    pub async fn step(&self, session_id: &str) -> Result<StepOutcome> {
        let mut session = self.load(session_id).await?;
        let result = self.pipeline.execute_step(&mut session).await;
        self.storage.save(session).await?;
        result
    }

    /// Execute every remaining step for `session_id` and persist the final state.
    pub async fn run_to_completion(&self, session_id: &str) -> Result<Session> {
        let mut session = self.load(session_id).await?;
        let result = self.pipeline.run_to_completion(&mut session).await;
        self.storage.save(session.clone()).await?;
        result.map(|_| session)
    }

    async fn load(&self, session_id: &str) -> Result<Session> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Context, InMemorySessionStorage, NextAction, PipelineBuilder, SessionStatus, Step,
    };
    use async_trait::async_trait;

    struct Note(&'static str, NextAction);

    #[async_trait]
    impl Step for Note {
        fn id(&self) -> &str {
            self.0
        }

        async fn run(&self, context: Context) -> Result<StepOutcome> {
            context.push("notes", self.0).await?;
            Ok(StepOutcome::new(self.1.clone()))
        }
    }

    fn runner() -> FlowRunner {
        let pipeline = PipelineBuilder::new("notes")
            .add_step(Arc::new(Note("a", NextAction::Continue)))
            .add_step(Arc::new(Note("b", NextAction::End)))
            .add_edge("a", "b")
            .build();
        FlowRunner::new(Arc::new(pipeline), Arc::new(InMemorySessionStorage::new()))
    }

    #[tokio::test]
    async fn step_persists_progress() {
        let runner = runner();
        let session = runner.pipeline().new_session().unwrap();
        let id = session.id.clone();
        runner.storage().save(session).await.unwrap();

        runner.step(&id).await.unwrap();
        let saved = runner.storage().get(&id).await.unwrap().unwrap();
        assert_eq!(saved.current_step_id, "b");
        assert_eq!(saved.status, SessionStatus::Running);

        runner.step(&id).await.unwrap();
        let saved = runner.storage().get(&id).await.unwrap().unwrap();
        assert_eq!(saved.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn run_to_completion_returns_final_session() {
        let runner = runner();
        let session = runner.pipeline().new_session().unwrap();
        let id = session.id.clone();
        runner.storage().save(session).await.unwrap();

        let done = runner.run_to_completion(&id).await.unwrap();
        let notes: Vec<String> = done.context.get("notes").await.unwrap();
        assert_eq!(notes, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let err = runner().step("nope").await.unwrap_err();
        assert!(matches!(err, FlowError::SessionNotFound(_)));
    }
}
