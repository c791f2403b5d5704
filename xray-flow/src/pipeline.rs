use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    context::Context,
    error::{FlowError, Result},
    session::{Session, SessionStatus, StepTrace},
    step::{NextAction, Step, StepOutcome},
};

/// Upper bound on steps executed by [`Pipeline::run_to_completion`].
pub const DEFAULT_STEP_LIMIT: usize = 32;

pub type EdgeCondition = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub condition: Option<EdgeCondition>,
}

/// An immutable graph of steps. Built once with [`PipelineBuilder`] and shared.
pub struct Pipeline {
    pub id: String,
    steps: HashMap<String, Arc<dyn Step>>,
    edges: Vec<Edge>,
    start_step_id: Option<String>,
    step_limit: usize,
}

impl Pipeline {
    pub fn start_step_id(&self) -> Option<&str> {
        self.start_step_id.as_deref()
    }

    pub fn get_step(&self, step_id: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(step_id).cloned()
    }

    /// Open a fresh session positioned at the start step.
    pub fn new_session(&self) -> Result<Session> {
        let start = self
            .start_step_id
            .as_ref()
            .ok_or_else(|| FlowError::StepNotFound(format!("{} has no start step", self.id)))?;
        Ok(Session::new(self.id.clone(), start.clone()))
    }

    /// First edge out of `current` whose condition holds, in insertion order.
    pub fn find_next_step(&self, current: &str, context: &Context) -> Option<String> {
        self.edges
            .iter()
            .filter(|edge| edge.from == current)
            .find(|edge| edge.condition.as_ref().is_none_or(|cond| cond(context)))
            .map(|edge| edge.to.clone())
    }

    /// Run the session's current step and advance it by one edge.
    pub async fn execute_step(&self, session: &mut Session) -> Result<StepOutcome> {
        if session.status.is_finished() {
            return Err(FlowError::SessionFinished(session.id.clone()));
        }

        let step_id = session.current_step_id.clone();
        let step = self
            .get_step(&step_id)
            .ok_or_else(|| FlowError::StepNotFound(step_id.clone()))?;

        debug!(session_id = %session.id, step_id = %step_id, "Running step");
        let started = Instant::now();
        let mut outcome = match step.run(session.context.clone()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(session_id = %session.id, step_id = %step_id, error = %e, "Step failed");
                session.status = SessionStatus::Failed(e.to_string());
                return Err(e);
            }
        };
        outcome.step_id = step_id.clone();

        session.trace.push(StepTrace {
            step_id: step_id.clone(),
            status_message: outcome.status_message.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
        });
        session.status_message = outcome.status_message.clone();

        match &outcome.next_action {
            NextAction::Continue => match self.find_next_step(&step_id, &session.context) {
                Some(next) => session.current_step_id = next,
                None => session.status = SessionStatus::Completed,
            },
            NextAction::GoTo(target) => {
                if !self.steps.contains_key(target) {
                    session.status = SessionStatus::Failed(format!("unknown step {target}"));
                    return Err(FlowError::StepNotFound(target.clone()));
                }
                session.current_step_id = target.clone();
            }
            NextAction::End => session.status = SessionStatus::Completed,
        }

        Ok(outcome)
    }

    /// Execute steps until the session completes or a step fails.
    pub async fn run_to_completion(&self, session: &mut Session) -> Result<()> {
        let mut executed = 0;
        while !session.status.is_finished() {
            if executed == self.step_limit {
                let err = FlowError::StepLimitExceeded {
                    pipeline_id: self.id.clone(),
                    limit: self.step_limit,
                };
                session.status = SessionStatus::Failed(err.to_string());
                return Err(err);
            }
            self.execute_step(session).await?;
            executed += 1;
        }

        info!(
            session_id = %session.id,
            pipeline_id = %self.id,
            steps = executed,
            "Pipeline finished"
        );
        Ok(())
    }
}

pub struct PipelineBuilder {
    id: String,
    steps: HashMap<String, Arc<dyn Step>>,
    edges: Vec<Edge>,
    start_step_id: Option<String>,
    step_limit: usize,
}

impl PipelineBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: HashMap::new(),
            edges: Vec::new(),
            start_step_id: None,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Register a step. The first one added becomes the start step.
    pub fn add_step(mut self, step: Arc<dyn Step>) -> Self {
        let step_id = step.id().to_string();
        if self.start_step_id.is_none() {
            self.start_step_id = Some(step_id.clone());
        }
        self.steps.insert(step_id, step);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            condition: None,
        });
        self
    }

    pub fn add_conditional_edge<F>(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: F,
    ) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            condition: Some(Arc::new(condition)),
        });
        self
    }

    pub fn set_start_step(mut self, step_id: impl Into<String>) -> Self {
        let step_id = step_id.into();
        if self.steps.contains_key(&step_id) {
            self.start_step_id = Some(step_id);
        }
        self
    }

    pub fn step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            id: self.id,
            steps: self.steps,
            edges: self.edges,
            start_step_id: self.start_step_id,
            step_limit: self.step_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Counter {
        id: String,
        next: NextAction,
    }

    #[async_trait]
    impl Step for Counter {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run(&self, context: Context) -> Result<StepOutcome> {
            context.push("visited", &self.id).await?;
            Ok(StepOutcome::with_status(
                self.next.clone(),
                format!("{} done", self.id),
            ))
        }
    }

    struct Broken;

    #[async_trait]
    impl Step for Broken {
        fn id(&self) -> &str {
            "broken"
        }

        async fn run(&self, _context: Context) -> Result<StepOutcome> {
            Err(FlowError::ContextError("no image".to_string()))
        }
    }

    fn counter(id: &str, next: NextAction) -> Arc<dyn Step> {
        Arc::new(Counter {
            id: id.to_string(),
            next,
        })
    }

    #[tokio::test]
    async fn conditional_edges_pick_first_match() {
        let pipeline = PipelineBuilder::new("routing")
            .add_step(counter("triage", NextAction::Continue))
            .add_step(counter("left", NextAction::End))
            .add_step(counter("right", NextAction::End))
            .add_conditional_edge("triage", "left", |ctx| {
                ctx.get_sync::<bool>("go_left").unwrap_or(false)
            })
            .add_edge("triage", "right")
            .build();

        let mut session = pipeline.new_session().unwrap();
        session.context.set("go_left", true).await.unwrap();
        pipeline.run_to_completion(&mut session).await.unwrap();

        let visited: Vec<String> = session.context.get("visited").await.unwrap();
        assert_eq!(visited, vec!["triage", "left"]);
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.trace.len(), 2);
        assert_eq!(session.status_message.as_deref(), Some("left done"));
    }

    #[tokio::test]
    async fn unconditional_edge_is_fallback() {
        let pipeline = PipelineBuilder::new("routing")
            .add_step(counter("triage", NextAction::Continue))
            .add_step(counter("left", NextAction::End))
            .add_step(counter("right", NextAction::End))
            .add_conditional_edge("triage", "left", |_| false)
            .add_edge("triage", "right")
            .build();

        let mut session = pipeline.new_session().unwrap();
        pipeline.run_to_completion(&mut session).await.unwrap();
        assert_eq!(session.current_step_id, "right");
    }

    #[tokio::test]
    async fn failure_marks_session_failed() {
        let pipeline = PipelineBuilder::new("failing")
            .add_step(counter("first", NextAction::Continue))
            .add_step(Arc::new(Broken))
            .add_edge("first", "broken")
            .build();

        let mut session = pipeline.new_session().unwrap();
        let err = pipeline.run_to_completion(&mut session).await.unwrap_err();
        assert!(matches!(err, FlowError::ContextError(_)));
        assert!(matches!(session.status, SessionStatus::Failed(_)));
        assert_eq!(session.trace.len(), 1);

        let again = pipeline.execute_step(&mut session).await.unwrap_err();
        assert!(matches!(again, FlowError::SessionFinished(_)));
    }

    #[tokio::test]
    async fn goto_unknown_step_is_an_error() {
        let pipeline = PipelineBuilder::new("jump")
            .add_step(counter("start", NextAction::GoTo("missing".to_string())))
            .build();

        let mut session = pipeline.new_session().unwrap();
        let err = pipeline.execute_step(&mut session).await.unwrap_err();
        assert!(matches!(err, FlowError::StepNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn step_limit_stops_cycles() {
        let pipeline = PipelineBuilder::new("loop")
            .add_step(counter("spin", NextAction::GoTo("spin".to_string())))
            .step_limit(3)
            .build();

        let mut session = pipeline.new_session().unwrap();
        let err = pipeline.run_to_completion(&mut session).await.unwrap_err();
        assert!(matches!(err, FlowError::StepLimitExceeded { limit: 3, .. }));
    }
}
