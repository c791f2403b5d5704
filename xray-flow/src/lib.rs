pub mod context;
pub mod error;
pub mod pipeline;
pub mod runner;
pub mod session;
pub mod step;

pub use context::Context;
pub use error::{FlowError, Result};
pub use pipeline::{DEFAULT_STEP_LIMIT, Edge, EdgeCondition, Pipeline, PipelineBuilder};
pub use runner::FlowRunner;
pub use session::{InMemorySessionStorage, Session, SessionStatus, SessionStorage, StepTrace};
pub use step::{NextAction, Step, StepOutcome};
