pub mod adaptive;
pub mod analyzer;
pub mod benchmark;
pub mod busy;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod parser;
pub mod prompts;
pub mod quality;
pub mod report;
pub mod tokens;

#[cfg(test)]
mod testing;

pub use adaptive::AdaptiveController;
pub use analyzer::{AnalysisOutcome, Analyzer};
pub use benchmark::{BenchmarkConfig, BenchmarkReport, run_benchmark};
pub use busy::{BusyGuard, BusyRegistry};
pub use config::{GenerationConfig, Settings};
pub use error::{AnalysisError, ErrorKind, Result};
pub use gemini::{GeminiClient, GenerationRequest, VisionModel};
pub use models::{
    AdaptiveState, AnalysisRequest, AnalysisSession, ComplexityClass, Diagnosis,
    FollowUpCategory, ImagePayload, MediaType, ParsedFinding, PatientContext, PromptVariant,
    StepRecord,
};
pub use report::{ImageSummary, render_adaptive_report, render_report};
